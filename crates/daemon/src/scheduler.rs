// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduling engine: supervises the execution subprocess ("master")
//! and tracks per-test-file queued/outcome state.
//!
//! Dispatch is idempotent per file — a file stays queued until the
//! master reports a `test`/`pass`/`fail` event for it, and a queued
//! file is never dispatched twice. Line numbers omitted from a run
//! command are computed by diffing the file's content against the
//! copy seen on its previous dispatch.

use std::path::Path;

use retest_core::{Message, SuiteState, Transition};
use serde_json::json;
use tracing::warn;

use crate::env;
use crate::server::{CommandError, CommandTable, Effects, Service};

/// Tag for the supervised execution subprocess.
pub const MASTER: &str = "master";

/// Engine commands the driver forwards verbatim. Enumerated here so
/// the driver's table is built without runtime introspection.
pub const PUBLIC_COMMANDS: &[&str] = &[
    "run_test_file",
    "stop_running_test_files",
    "rerun_passed_test_files",
    "rerun_failed_test_files",
    "reabsorb_overhead",
];

#[derive(Default)]
pub struct EngineService {
    suite: SuiteState,
}

impl EngineService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one test file and send the master a `test` command.
    ///
    /// No-ops: the path is missing on disk (a stale notification, not
    /// an error), unreadable, or already queued. An explicit zero line
    /// number clears the whole list — zero means "run everything".
    fn run_test_file(&mut self, path: &str, explicit: &[i64], out: &mut Effects) {
        if !Path::new(path).exists() || self.suite.is_queued(path) {
            return;
        }
        let line_numbers: Vec<i64> = if !explicit.is_empty() {
            if explicit.contains(&0) {
                Vec::new()
            } else {
                explicit.to_vec()
            }
        } else {
            let content = match std::fs::read_to_string(path) {
                Ok(content) => content,
                Err(error) => {
                    warn!(path, %error, "unreadable test file");
                    return;
                }
            };
            self.suite
                .changed_lines(path, &content)
                .into_iter()
                .map(i64::from)
                .collect()
        };
        self.suite.enqueue(path);
        out.to_child(
            MASTER,
            Message::command("test", [json!(path), json!(line_numbers)]),
        );
    }

    fn run_test_files(&mut self, files: impl IntoIterator<Item = String>, out: &mut Effects) {
        for file in files {
            self.run_test_file(&file, &[], out);
        }
    }
}

impl Service for EngineService {
    fn children(&self) -> Vec<(&'static str, String)> {
        vec![(MASTER, env::master_program())]
    }

    fn commands() -> CommandTable<Self> {
        CommandTable::new()
            .register("run_test_file", run_test_file)
            .register("stop_running_test_files", stop_running_test_files)
            .register("rerun_passed_test_files", rerun_passed_test_files)
            .register("rerun_failed_test_files", rerun_failed_test_files)
            .register("reabsorb_overhead", reabsorb_overhead)
    }

    /// State machine over the master's `test`/`pass`/`fail` events.
    /// Every event propagates to all clients; transitions additionally
    /// emit a synthesized notification carrying the original event.
    fn on_child_message(&mut self, tag: &'static str, message: Message, out: &mut Effects) {
        if tag != MASTER {
            return;
        }
        out.broadcast(message.clone());

        let (Some(event), Some(path)) = (message.name(), message.str_arg(0)) else {
            return;
        };
        match event {
            "test" => self.suite.resolve(path),
            "pass" => {
                self.suite.resolve(path);
                // only whole test file runs qualify as a pass
                let whole_file = message.array_arg(1).map_or(true, Vec::is_empty);
                if self.suite.record_pass(path, whole_file) == Some(Transition::FailNowPass) {
                    out.broadcast(Message::command(
                        "fail_now_pass",
                        [json!(path), message.to_value()],
                    ));
                }
            }
            "fail" => {
                self.suite.resolve(path);
                if self.suite.record_fail(path) == Some(Transition::PassNowFail) {
                    out.broadcast(Message::command(
                        "pass_now_fail",
                        [json!(path), message.to_value()],
                    ));
                }
            }
            _ => {}
        }
    }
}

fn run_test_file(
    service: &mut EngineService,
    message: &Message,
    out: &mut Effects,
) -> Result<(), CommandError> {
    let path = require_path(message)?;
    let explicit = message.int_args(1);
    service.run_test_file(path, &explicit, out);
    Ok(())
}

fn stop_running_test_files(
    service: &mut EngineService,
    message: &Message,
    out: &mut Effects,
) -> Result<(), CommandError> {
    if service.suite.queued_is_empty() {
        out.reply("There are no running test files to stop.");
        return Ok(());
    }
    let mut parts = vec![json!("stop")];
    if let Some(signal) = message.str_arg(0) {
        parts.push(json!(signal));
    }
    out.to_child(MASTER, Message::new(parts));
    // fire-and-forget: forget the queued set without waiting for the
    // master to confirm anything actually stopped
    service.suite.clear_queued();
    Ok(())
}

fn rerun_passed_test_files(
    service: &mut EngineService,
    _message: &Message,
    out: &mut Effects,
) -> Result<(), CommandError> {
    let passed = service.suite.passed();
    if passed.is_empty() {
        out.reply("There are no passed test files to re-run.");
    } else {
        service.run_test_files(passed, out);
    }
    Ok(())
}

fn rerun_failed_test_files(
    service: &mut EngineService,
    _message: &Message,
    out: &mut Effects,
) -> Result<(), CommandError> {
    let failed = service.suite.failed();
    if failed.is_empty() {
        out.reply("There are no failed test files to re-run.");
    } else {
        service.run_test_files(failed, out);
    }
    Ok(())
}

/// Destroy and recreate the master, then re-dispatch everything that
/// was queued at the moment of destruction. Re-dispatch goes back
/// through the diff computation, so line numbers are recomputed rather
/// than reused.
fn reabsorb_overhead(
    service: &mut EngineService,
    _message: &Message,
    out: &mut Effects,
) -> Result<(), CommandError> {
    let previous = service.suite.take_queued();
    out.respawn_child(MASTER);
    service.run_test_files(previous, out);
    Ok(())
}

fn require_path(message: &Message) -> Result<&str, CommandError> {
    message
        .str_arg(0)
        .ok_or_else(|| CommandError::failed("missing test file path"))
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
