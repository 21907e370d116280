// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use regex::Regex;
use retest_core::DependencyRule;
use std::collections::BTreeSet;
use tempfile::TempDir;

fn exact_rule(source: &str, dependent: &str) -> DependencyRule {
    let globs = vec![dependent.to_string()];
    DependencyRule::new(
        Regex::new(&format!("^{}$", regex::escape(source))).unwrap(),
        move |_| globs.clone(),
    )
}

struct Chain {
    _dir: TempDir,
    a: String,
    b: String,
    c: String,
}

fn chain() -> Chain {
    let dir = tempfile::tempdir().unwrap();
    let path = |name: &str| {
        let path = dir.path().join(name);
        std::fs::write(&path, "x\n").unwrap();
        path.to_string_lossy().into_owned()
    };
    let (a, b, c) = (path("a.rb"), path("b.rb"), path("c.rb"));
    Chain { _dir: dir, a, b, c }
}

#[test]
fn resolution_is_transitive() {
    let chain = chain();
    let config = DriverConfig {
        dependency_rules: vec![
            exact_rule(&chain.a, &chain.b),
            exact_rule(&chain.b, &chain.c),
        ],
        ..DriverConfig::default()
    };
    let expected: BTreeSet<String> = [chain.b.clone(), chain.c.clone()].into();
    assert_eq!(dependent_test_files(&config, &chain.a), expected);
}

#[test]
fn rule_cycles_terminate_without_redispatching_the_origin() {
    let chain = chain();
    let config = DriverConfig {
        dependency_rules: vec![
            exact_rule(&chain.a, &chain.b),
            exact_rule(&chain.b, &chain.c),
            exact_rule(&chain.c, &chain.a),
        ],
        ..DriverConfig::default()
    };
    let expected: BTreeSet<String> = [chain.b.clone(), chain.c.clone()].into();
    assert_eq!(dependent_test_files(&config, &chain.a), expected);
}

#[test]
fn globs_only_yield_existing_files() {
    let chain = chain();
    let config = DriverConfig {
        dependency_rules: vec![exact_rule(&chain.a, "/nonexistent/b.rb")],
        ..DriverConfig::default()
    };
    assert!(dependent_test_files(&config, &chain.a).is_empty());
}

#[test]
fn unmatched_paths_resolve_to_nothing() {
    let config = DriverConfig::default();
    assert!(dependent_test_files(&config, "whatever.rb").is_empty());
}

#[test]
fn one_rule_can_yield_many_dependents() {
    let chain = chain();
    let pattern = Regex::new(&format!("^{}$", regex::escape(&chain.a))).unwrap();
    let glob = format!("{}/*.rb", chain._dir.path().display());
    let config = DriverConfig {
        dependency_rules: vec![DependencyRule::new(pattern, move |_| vec![glob.clone()])],
        ..DriverConfig::default()
    };
    // the glob matches a.rb too, but the origin never re-enters its
    // own result set
    let expected: BTreeSet<String> = [chain.b.clone(), chain.c.clone()].into();
    assert_eq!(dependent_test_files(&config, &chain.a), expected);
}

#[test]
fn expand_globs_skips_bad_patterns() {
    let chain = chain();
    let good = format!("{}/a.rb", chain._dir.path().display());
    let files = expand_globs(&["a**b***".to_string(), good.clone()]);
    assert_eq!(files, vec![good]);
}
