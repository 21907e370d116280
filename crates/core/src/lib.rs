// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! retest-core: domain logic for the retest continuous test
//! orchestrator — the wire message type, per-test-file scheduling
//! state, incremental line diffing, and driver configuration.

pub mod config;
pub mod diff;
pub mod message;
pub mod suite;

pub use config::{ConfigError, ConfigFile, DependencyRule, DriverConfig, OverheadPattern};
pub use message::{Message, MessageError};
pub use suite::{Outcome, SuiteState, Transition};
