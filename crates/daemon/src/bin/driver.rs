// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Driver process: binds the per-directory endpoint and supervises
//! the watcher and scheduling-engine subprocesses.

use std::process::ExitCode;

use retest_core::{ConfigFile, DriverConfig};
use retest_daemon::address::Endpoint;
use retest_daemon::driver::DriverService;
use retest_daemon::env;
use retest_daemon::server::{ControlChannel, Server};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    retest_daemon::logging::init();
    if let Err(error) = run().await {
        tracing::error!(%error, "retest-driver failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let endpoint = Endpoint::bind("retest-driver")?;
    let server = Server::new("retest-driver", endpoint, ControlChannel::stdio());
    server.run(DriverService::new(config)).await?;
    Ok(())
}

fn load_config() -> Result<DriverConfig, Box<dyn std::error::Error>> {
    let path = env::config_path();
    if !path.exists() {
        return Ok(DriverConfig::default());
    }
    Ok(ConfigFile::load(&path)?.into_config()?)
}
