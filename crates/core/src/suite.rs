// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-test-file scheduling state.
//!
//! Owned exclusively by the scheduling engine's event loop: the queued
//! set (files dispatched to the execution subprocess and not yet
//! resolved), the last known outcome per file, and the cached content
//! used for incremental diffing. Entries persist for the lifetime of
//! the process so rerun-by-outcome commands keep working.

use std::collections::{BTreeMap, BTreeSet};

use crate::diff;

/// Last known aggregate outcome for a test file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed,
}

/// A change in a file's outcome relative to its previous full-run
/// outcome, worth announcing to every observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    FailNowPass,
    PassNowFail,
}

#[derive(Debug, Default)]
pub struct SuiteState {
    queued: BTreeSet<String>,
    outcomes: BTreeMap<String, Outcome>,
    contents: BTreeMap<String, String>,
}

impl SuiteState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `path` queued. Returns false when it already was — the
    /// double-queue guard.
    pub fn enqueue(&mut self, path: &str) -> bool {
        self.queued.insert(path.to_string())
    }

    /// Clear the queued flag; any `test`/`pass`/`fail` event naming
    /// the file resolves its dispatch.
    pub fn resolve(&mut self, path: &str) {
        self.queued.remove(path);
    }

    pub fn is_queued(&self, path: &str) -> bool {
        self.queued.contains(path)
    }

    pub fn queued_is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    pub fn clear_queued(&mut self) {
        self.queued.clear();
    }

    /// Drain the queued set for re-dispatch after a respawn.
    pub fn take_queued(&mut self) -> Vec<String> {
        std::mem::take(&mut self.queued).into_iter().collect()
    }

    pub fn outcome(&self, path: &str) -> Option<Outcome> {
        self.outcomes.get(path).copied()
    }

    pub fn passed(&self) -> Vec<String> {
        self.with_outcome(Outcome::Passed)
    }

    pub fn failed(&self) -> Vec<String> {
        self.with_outcome(Outcome::Failed)
    }

    fn with_outcome(&self, wanted: Outcome) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| **outcome == wanted)
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Record a pass event. Only a whole-file run qualifies as a
    /// state-affecting pass; a line-scoped pass never clears a prior
    /// failure and leaves the outcome untouched.
    pub fn record_pass(&mut self, path: &str, whole_file: bool) -> Option<Transition> {
        if !whole_file {
            return None;
        }
        let previous = self.outcomes.insert(path.to_string(), Outcome::Passed);
        (previous == Some(Outcome::Failed)).then_some(Transition::FailNowPass)
    }

    /// Record a fail event, partial or whole.
    pub fn record_fail(&mut self, path: &str) -> Option<Transition> {
        let previous = self.outcomes.insert(path.to_string(), Outcome::Failed);
        (previous == Some(Outcome::Passed)).then_some(Transition::PassNowFail)
    }

    /// Diff `content` against the cached copy for `path` and update
    /// the cache. First observation seeds the cache from `content`
    /// itself and so yields an empty list, which downstream means
    /// "run the whole file" — the intended behavior for a file seen
    /// for the first time. Byte-identical content also yields empty.
    pub fn changed_lines(&mut self, path: &str, content: &str) -> Vec<u32> {
        let old = self.contents.insert(path.to_string(), content.to_string());
        diff::changed_line_numbers(old.as_deref().unwrap_or(content), content)
    }
}

#[cfg(test)]
#[path = "suite_tests.rs"]
mod tests;
