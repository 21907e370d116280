// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Driver configuration: overhead patterns, the all-test-files globs,
//! and dependency rules. Supplied explicitly at construction; the
//! driver never consults shared mutable tables.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use regex::{Captures, Regex};
use serde::Deserialize;
use thiserror::Error;

/// A changed path matching an overhead pattern invalidates the
/// execution subprocess's cached state and forces a full respawn
/// instead of a selective re-run.
#[derive(Debug, Clone)]
pub enum OverheadPattern {
    Exact(String),
    Matches(Regex),
}

impl OverheadPattern {
    pub fn is_match(&self, path: &str) -> bool {
        match self {
            OverheadPattern::Exact(exact) => exact == path,
            OverheadPattern::Matches(regex) => regex.is_match(path),
        }
    }
}

type GlobResolver = Box<dyn Fn(&Captures<'_>) -> Vec<String> + Send + Sync>;

/// Pairs a source-path pattern with a resolver that, given the match,
/// yields glob patterns identifying the files depending on it.
pub struct DependencyRule {
    pattern: Regex,
    resolver: GlobResolver,
}

impl DependencyRule {
    pub fn new(
        pattern: Regex,
        resolver: impl Fn(&Captures<'_>) -> Vec<String> + Send + Sync + 'static,
    ) -> Self {
        Self { pattern, resolver: Box::new(resolver) }
    }

    /// A rule whose globs are capture templates: `$1`-style references
    /// are expanded with the match, per [`Captures::expand`].
    pub fn from_templates(pattern: Regex, templates: Vec<String>) -> Self {
        Self::new(pattern, move |caps| {
            templates
                .iter()
                .map(|template| {
                    let mut expanded = String::new();
                    caps.expand(template, &mut expanded);
                    expanded
                })
                .collect()
        })
    }

    /// Glob patterns for the files depending on `source`, when the
    /// rule's pattern matches it.
    pub fn globs_for(&self, source: &str) -> Option<Vec<String>> {
        self.pattern.captures(source).map(|caps| (self.resolver)(&caps))
    }
}

impl fmt::Debug for DependencyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyRule")
            .field("pattern", &self.pattern.as_str())
            .finish_non_exhaustive()
    }
}

/// Static driver configuration.
#[derive(Debug, Default)]
pub struct DriverConfig {
    pub overhead_patterns: Vec<OverheadPattern>,
    pub all_test_globs: Vec<String>,
    pub dependency_rules: Vec<DependencyRule>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid pattern {pattern:?}: {source}")]
    BadPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("unreadable config: {0}")]
    Unreadable(#[from] std::io::Error),

    #[error("unparsable config: {0}")]
    Unparsable(#[from] serde_json::Error),
}

/// On-disk JSON form of [`DriverConfig`]. `test_file_globbers` maps a
/// source-path regex to glob templates parameterized by its captures.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub overhead_patterns: Vec<String>,
    pub all_test_globs: Vec<String>,
    pub test_file_globbers: BTreeMap<String, Vec<String>>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn into_config(self) -> Result<DriverConfig, ConfigError> {
        let overhead_patterns = self
            .overhead_patterns
            .into_iter()
            .map(|pattern| compile(&pattern).map(OverheadPattern::Matches))
            .collect::<Result<_, _>>()?;
        let dependency_rules = self
            .test_file_globbers
            .into_iter()
            .map(|(pattern, templates)| {
                compile(&pattern).map(|regex| DependencyRule::from_templates(regex, templates))
            })
            .collect::<Result<_, _>>()?;
        Ok(DriverConfig {
            overhead_patterns,
            all_test_globs: self.all_test_globs,
            dependency_rules,
        })
    }
}

fn compile(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::BadPattern {
        pattern: pattern.to_string(),
        source,
    })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
