// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::server::Effect;
use regex::Regex;
use retest_core::{DependencyRule, OverheadPattern};
use serde_json::Value;
use tempfile::TempDir;

fn notify(service: &mut DriverService, changed: &[&str]) -> Effects {
    let parts = changed.iter().map(|path| json!(path)).collect();
    let mut out = Effects::new();
    service.on_child_message(HERALD, Message::new(parts), &mut out);
    out
}

fn workspace() -> (TempDir, String) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_string_lossy().into_owned();
    (dir, root)
}

#[test]
fn overhead_changes_short_circuit_to_reabsorption() {
    let config = DriverConfig {
        overhead_patterns: vec![
            OverheadPattern::Exact("config/boot.rb".to_string()),
            OverheadPattern::Matches(Regex::new(r"^lib/support/").unwrap()),
        ],
        // a rule that would match anything, to prove it is never consulted
        dependency_rules: vec![DependencyRule::new(Regex::new(".").unwrap(), |_| {
            vec!["/nonexistent/*".to_string()]
        })],
        ..DriverConfig::default()
    };
    let mut service = DriverService::new(config);

    let out = notify(&mut service, &["lib/support/helpers.rb"]);
    assert_eq!(
        out.as_slice(),
        &[
            Effect::Broadcast(Message::command(
                "reabsorb",
                [json!("lib/support/helpers.rb")]
            )),
            Effect::ToChild(ENGINE, Message::command("reabsorb_overhead", [])),
        ]
    );
}

#[test]
fn source_changes_dispatch_their_dependent_test_files() {
    let (dir, root) = workspace();
    let test_file = dir.path().join("widget_test.rb");
    std::fs::write(&test_file, "x\n").unwrap();
    let test_file = test_file.to_string_lossy().into_owned();

    let glob = format!("{root}/${{1}}_test.rb");
    let config = DriverConfig {
        dependency_rules: vec![DependencyRule::from_templates(
            Regex::new(r"src/(\w+)\.rb$").unwrap(),
            vec![glob],
        )],
        ..DriverConfig::default()
    };
    let mut service = DriverService::new(config);

    let out = notify(&mut service, &["src/widget.rb"]);
    assert_eq!(
        out.as_slice(),
        &[Effect::ToChild(
            ENGINE,
            Message::command("run_test_file", [json!(test_file)])
        )]
    );
}

#[test]
fn unresolvable_changes_dispatch_nothing() {
    let mut service = DriverService::new(DriverConfig::default());
    let out = notify(&mut service, &["src/widget.rb"]);
    assert!(out.as_slice().is_empty());
}

#[test]
fn engine_output_propagates_to_all_clients() {
    let mut service = DriverService::new(DriverConfig::default());
    let mut out = Effects::new();
    let event = Message::command("pass", [json!("a_test.rb"), json!([])]);
    service.on_child_message(ENGINE, event.clone(), &mut out);
    assert_eq!(out.as_slice(), &[Effect::Broadcast(event)]);
}

#[test]
fn run_all_test_files_expands_the_configured_globs() {
    let (dir, root) = workspace();
    std::fs::write(dir.path().join("a_test.rb"), "x\n").unwrap();
    std::fs::write(dir.path().join("b_test.rb"), "x\n").unwrap();

    let config = DriverConfig {
        all_test_globs: vec![format!("{root}/*_test.rb")],
        ..DriverConfig::default()
    };
    let mut service = DriverService::new(config);

    let table = DriverService::commands();
    let handler = table.get("run_all_test_files").unwrap();
    let mut out = Effects::new();
    handler(&mut service, &Message::command("run_all_test_files", []), &mut out).unwrap();

    let dispatched: Vec<&Value> = out
        .as_slice()
        .iter()
        .map(|effect| match effect {
            Effect::ToChild(ENGINE, message) => &message.parts()[1],
            other => panic!("unexpected effect: {other:?}"),
        })
        .collect();
    assert_eq!(
        dispatched,
        vec![
            &json!(format!("{root}/a_test.rb")),
            &json!(format!("{root}/b_test.rb")),
        ]
    );
}

#[test]
fn run_all_with_no_matches_is_informational() {
    let mut service = DriverService::new(DriverConfig::default());
    let table = DriverService::commands();
    let handler = table.get("run_all_test_files").unwrap();
    let mut out = Effects::new();
    handler(&mut service, &Message::command("run_all_test_files", []), &mut out).unwrap();
    assert_eq!(
        out.as_slice(),
        &[Effect::Reply("There are no test files to run.".to_string())]
    );
}

#[test]
fn engine_commands_forward_verbatim() {
    let table = DriverService::commands();
    for name in scheduler::PUBLIC_COMMANDS {
        assert!(table.contains(name), "missing forwarded command {name}");
    }

    let mut service = DriverService::new(DriverConfig::default());
    let handler = table.get("rerun_failed_test_files").unwrap();
    let command = Message::command("rerun_failed_test_files", []);
    let mut out = Effects::new();
    handler(&mut service, &command, &mut out).unwrap();
    assert_eq!(out.as_slice(), &[Effect::ToChild(ENGINE, command)]);
}

#[test]
fn herald_batches_may_mix_overhead_and_source_paths() {
    let config = DriverConfig {
        overhead_patterns: vec![OverheadPattern::Exact("Gemfile.lock".to_string())],
        ..DriverConfig::default()
    };
    let mut service = DriverService::new(config);

    let out = notify(&mut service, &["src/widget.rb", "Gemfile.lock"]);
    // the unresolvable source change contributes nothing; the overhead
    // change still reabsorbs
    assert_eq!(
        out.as_slice(),
        &[
            Effect::Broadcast(Message::command("reabsorb", [json!("Gemfile.lock")])),
            Effect::ToChild(ENGINE, Message::command("reabsorb_overhead", [])),
        ]
    );
}
