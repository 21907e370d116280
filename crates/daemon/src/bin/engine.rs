// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduling-engine process: binds the per-directory endpoint and
//! supervises the execution subprocess.

use std::process::ExitCode;

use retest_daemon::address::Endpoint;
use retest_daemon::scheduler::EngineService;
use retest_daemon::server::{ControlChannel, Server, ServerError};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    retest_daemon::logging::init();
    if let Err(error) = run().await {
        tracing::error!(%error, "retest-engine failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run() -> Result<(), ServerError> {
    let endpoint = Endpoint::bind("retest-engine")?;
    let server = Server::new("retest-engine", endpoint, ControlChannel::stdio());
    server.run(EngineService::new()).await
}
