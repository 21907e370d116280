// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Changed-line computation between two versions of a file's content.

use std::collections::BTreeSet;

use similar::{ChangeTag, TextDiff};

/// 1-indexed positions of lines that differ between `old` and `new`,
/// sorted and deduplicated. Deletions report their position in the old
/// content, insertions in the new, matching LCS diff semantics.
pub fn changed_line_numbers(old: &str, new: &str) -> Vec<u32> {
    let diff = TextDiff::from_lines(old, new);
    let mut positions = BTreeSet::new();
    for change in diff.iter_all_changes() {
        let index = match change.tag() {
            ChangeTag::Delete => change.old_index(),
            ChangeTag::Insert => change.new_index(),
            ChangeTag::Equal => None,
        };
        if let Some(index) = index {
            positions.insert(index as u32 + 1);
        }
    }
    positions.into_iter().collect()
}

#[cfg(test)]
#[path = "diff_tests.rs"]
mod tests;
