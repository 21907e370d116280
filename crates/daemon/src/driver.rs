// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Driver: consumes watcher notifications, classifies each changed
//! path, and either triggers a full reabsorption or resolves and
//! dispatches the dependent test files.
//!
//! The driver supervises two subprocesses: the watcher ("herald"),
//! whose batches are bare arrays of changed paths, and the scheduling
//! engine, whose event output is propagated to every driver client.

use retest_core::{DriverConfig, Message};
use serde_json::json;

use crate::deps;
use crate::env;
use crate::scheduler;
use crate::server::{CommandError, CommandTable, Effects, Service};

/// Tag for the supervised watcher subprocess.
pub const HERALD: &str = "herald";
/// Tag for the supervised scheduling-engine subprocess.
pub const ENGINE: &str = "engine";

pub struct DriverService {
    config: DriverConfig,
}

impl DriverService {
    pub fn new(config: DriverConfig) -> Self {
        Self { config }
    }

    /// Classify one changed path. Overhead files short-circuit: they
    /// announce a `reabsorb` and respawn the execution subprocess,
    /// never dependency resolution.
    fn absorb_change(&self, changed_file: &str, out: &mut Effects) {
        let overhead_changed = self
            .config
            .overhead_patterns
            .iter()
            .any(|pattern| pattern.is_match(changed_file));
        if overhead_changed {
            out.broadcast(Message::command("reabsorb", [json!(changed_file)]));
            out.to_child(ENGINE, Message::command("reabsorb_overhead", []));
        } else {
            for file in deps::dependent_test_files(&self.config, changed_file) {
                out.to_child(ENGINE, Message::command("run_test_file", [json!(file)]));
            }
        }
    }
}

impl Service for DriverService {
    fn children(&self) -> Vec<(&'static str, String)> {
        vec![
            (HERALD, env::herald_program()),
            (ENGINE, env::engine_program()),
        ]
    }

    fn commands() -> CommandTable<Self> {
        let mut table = CommandTable::new().register("run_all_test_files", run_all_test_files);
        // engine commands are reachable here too, forwarded verbatim,
        // unless the driver defines its own handler of the same name
        for name in scheduler::PUBLIC_COMMANDS {
            if !table.contains(name) {
                table = table.register(name, forward_to_engine);
            }
        }
        table
    }

    fn on_child_message(&mut self, tag: &'static str, message: Message, out: &mut Effects) {
        match tag {
            ENGINE => out.broadcast(message),
            HERALD => {
                for part in message.parts() {
                    if let Some(changed_file) = part.as_str() {
                        self.absorb_change(changed_file, out);
                    }
                }
            }
            _ => {}
        }
    }
}

fn run_all_test_files(
    service: &mut DriverService,
    _message: &Message,
    out: &mut Effects,
) -> Result<(), CommandError> {
    let all_test_files = deps::expand_globs(&service.config.all_test_globs);
    if all_test_files.is_empty() {
        out.reply("There are no test files to run.");
        return Ok(());
    }
    for file in all_test_files {
        out.to_child(ENGINE, Message::command("run_test_file", [json!(file)]));
    }
    Ok(())
}

fn forward_to_engine(
    _service: &mut DriverService,
    message: &Message,
    out: &mut Effects,
) -> Result<(), CommandError> {
    out.to_child(ENGINE, message.clone());
    Ok(())
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
