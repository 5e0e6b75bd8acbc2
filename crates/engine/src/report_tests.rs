// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rig_core::GuestIdentity;

fn results() -> Vec<TestResult> {
    let mut pass = TestResult::pending("/a", 1, GuestIdentity::default());
    pass.result = Outcome::Pass;
    let mut fail = TestResult::pending("/b", 2, GuestIdentity::default());
    fail.result = Outcome::Fail;
    vec![pass, fail]
}

#[test]
fn builtin_sinks_resolve_by_how() {
    assert!(sink_for("display").is_some());
    assert!(sink_for("yaml").is_some());
    assert!(sink_for("polarion").is_none());
}

#[test]
fn yaml_sink_writes_the_result_list() {
    let dir = tempfile::tempdir().unwrap();
    let sink = YamlSink;
    sink.report(&NodeId::new("/plans/x"), &results(), dir.path())
        .unwrap();

    let written: Vec<TestResult> =
        serde_yaml::from_str(&std::fs::read_to_string(dir.path().join("results.yaml")).unwrap())
            .unwrap();
    assert_eq!(written.len(), 2);
    assert_eq!(written[1].result, Outcome::Fail);
}

#[test]
fn display_sink_never_mutates() {
    let dir = tempfile::tempdir().unwrap();
    let before = results();
    DisplaySink
        .report(&NodeId::new("/plans/x"), &before, dir.path())
        .unwrap();
    assert_eq!(before, results());
}
