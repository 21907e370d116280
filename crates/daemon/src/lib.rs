// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! retest-daemon: the IPC server, the scheduling engine, and the
//! driver that together orchestrate continuous test runs.
//!
//! Each of the driver and the engine runs as its own OS process with a
//! single event-loop task; concurrency comes from cooperating
//! processes (watcher, driver, engine, execution master) connected by
//! line-framed duplex channels.

pub mod address;
pub mod deps;
pub mod driver;
pub mod env;
pub mod logging;
pub mod scheduler;
pub mod server;
pub mod supervisor;
