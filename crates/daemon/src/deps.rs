// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency resolution over user-supplied glob rules.

use std::collections::BTreeSet;

use retest_core::DriverConfig;
use tracing::warn;

/// The transitive set of test files depending on `changed_file`.
///
/// Depth-first: every rule matching the path contributes its expanded
/// globs, and each newly seen candidate is resolved again as if it had
/// changed itself, so test files can depend on intermediate files.
/// Marking a path seen before recursing into it terminates rule
/// cycles; the changed file itself is seen from the start and so never
/// ends up in its own result set.
pub fn dependent_test_files(config: &DriverConfig, changed_file: &str) -> BTreeSet<String> {
    let mut seen = BTreeSet::from([changed_file.to_string()]);
    resolve_into(config, changed_file, &mut seen);
    seen.remove(changed_file);
    seen
}

fn resolve_into(config: &DriverConfig, source_file: &str, seen: &mut BTreeSet<String>) {
    for rule in &config.dependency_rules {
        let Some(globs) = rule.globs_for(source_file) else {
            continue;
        };
        for dependent_file in expand_globs(&globs) {
            if seen.insert(dependent_file.clone()) {
                resolve_into(config, &dependent_file, seen);
            }
        }
    }
}

/// Expand glob patterns into the paths that currently exist. Bad
/// patterns and unreadable directories are logged and skipped.
pub fn expand_globs<S: AsRef<str>>(patterns: &[S]) -> Vec<String> {
    let mut files = Vec::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        match glob::glob(pattern) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    files.push(entry.to_string_lossy().into_owned());
                }
            }
            Err(error) => warn!(pattern, %error, "bad glob pattern"),
        }
    }
    files
}

#[cfg(test)]
#[path = "deps_tests.rs"]
mod tests;
