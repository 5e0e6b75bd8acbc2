// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::metadata::Node;

fn node(id: &str, yaml: &str) -> Node {
    Node::new(id, serde_yaml::from_str(yaml).unwrap())
}

#[test]
fn defaults_are_filled_in() {
    let spec = TestSpec::from_node(&node("/tests/basic", "test: echo ok")).unwrap();
    assert_eq!(spec.name, "/tests/basic");
    assert_eq!(spec.test, "echo ok");
    assert_eq!(spec.framework, Framework::Shell);
    assert_eq!(spec.duration, "5m");
    assert_eq!(spec.restart_max_count, 1);
    assert!(!spec.tty);
    assert!(spec.check.is_empty());
}

#[test]
fn full_spec_parses() {
    let spec = TestSpec::from_node(&node(
        "/tests/full",
        concat!(
            "test: ./runtest.sh\n",
            "framework: beakerlib\n",
            "duration: 1h\n",
            "require: [wget, curl]\n",
            "result: xfail\n",
            "restart-on-exit-code: [79]\n",
            "restart-max-count: 3\n",
            "tty: true\n",
            "where: server\n",
            "check:\n",
            "  - dmesg\n",
            "  - how: avc\n",
            "    result: info\n",
        ),
    ))
    .unwrap();

    assert_eq!(spec.framework, Framework::Beakerlib);
    assert_eq!(spec.result, ResultInterpret::Xfail);
    assert_eq!(spec.restart_on_exit_code, vec![79]);
    assert_eq!(spec.restart_max_count, 3);
    assert!(spec.tty);
    assert_eq!(spec.where_, vec!["server"]);
    assert_eq!(spec.check.len(), 2);
    assert_eq!(spec.check[0].how, "dmesg");
    assert_eq!(spec.check[1].how, "avc");
    assert_eq!(spec.check[1].result, CheckInterpret::Info);
}

#[test]
fn require_accepts_single_string() {
    let spec = TestSpec::from_node(&node("/tests/one", "test: 'true'\nrequire: wget")).unwrap();
    assert_eq!(spec.require, vec!["wget"]);
}

#[test]
fn safe_name_flattens_slashes() {
    let spec = TestSpec::from_node(&node("/tests/core/smoke", "test: 'true'")).unwrap();
    assert_eq!(spec.pathless_safe_name(), "tests-core-smoke");
}

#[test]
fn iteration_id_is_stable() {
    let spec = TestSpec::from_node(&node("/tests/basic", "test: 'true'")).unwrap();
    let invocation = TestInvocation::new(spec, GuestIdentity::default(), 3);
    let run = RunId::new("deadbeef");
    assert_eq!(invocation.iteration_id(&run), "deadbeef-3");
    assert_eq!(invocation.iteration_id(&run), "deadbeef-3");
}

#[test]
fn data_dir_name_includes_serial() {
    let spec = TestSpec::from_node(&node("/tests/basic", "test: 'true'")).unwrap();
    let invocation = TestInvocation::new(spec, GuestIdentity::default(), 7);
    assert_eq!(invocation.data_dir_name(), "tests-basic-7");
}
