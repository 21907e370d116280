// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;

/// Execution subprocess spawned by the engine.
pub fn master_program() -> String {
    program("RETEST_MASTER", "retest-master")
}

/// File-system watcher subprocess spawned by the driver.
pub fn herald_program() -> String {
    program("RETEST_HERALD", "retest-herald")
}

/// Scheduling-engine subprocess spawned by the driver.
pub fn engine_program() -> String {
    program("RETEST_ENGINE", "retest-engine")
}

/// Driver configuration file, when present.
pub fn config_path() -> PathBuf {
    std::env::var("RETEST_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(".retest.json"))
}

fn program(var: &str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.to_string())
}
