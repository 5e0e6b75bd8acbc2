// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rig_core::{GuestIdentity, Node, TestInvocation, TestSpec};
use std::path::Path;

fn invocation(yaml: &str, serial: u64) -> TestInvocation {
    let node = Node::new("/tests/demo", serde_yaml::from_str(yaml).unwrap());
    let spec = TestSpec::from_node(&node).unwrap();
    TestInvocation::new(spec, GuestIdentity::default(), serial)
}

#[test]
fn wrappers_are_unique_per_serial() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_wrappers(dir.path(), &invocation("test: exit 0", 1), Path::new("/sd"))
        .unwrap();
    let second = write_wrappers(dir.path(), &invocation("test: exit 0", 2), Path::new("/sd"))
        .unwrap();
    assert_ne!(first.outer, second.outer);
    assert!(first.outer.exists());
    assert!(second.inner.exists());
}

#[test]
fn outer_wrapper_maintains_the_pidfile() {
    let dir = tempfile::tempdir().unwrap();
    let wrappers = write_wrappers(
        dir.path(),
        &invocation("test: exit 0", 1),
        Path::new("/usr/local/bin"),
    )
    .unwrap();

    let outer = std::fs::read_to_string(&wrappers.outer).unwrap();
    assert!(outer.contains("flock \"$TMT_TEST_PIDFILE_LOCK\""));
    assert!(outer.contains("exit 122"));
    assert!(outer.contains("exit 123"));
    assert!(outer.contains("/usr/local/bin"));
    // No tty: stdin closed, output piped through cat
    assert!(outer.contains("</dev/null 2>&1 | cat"));
}

#[test]
fn tty_wrapper_keeps_stdin() {
    let dir = tempfile::tempdir().unwrap();
    let wrappers = write_wrappers(
        dir.path(),
        &invocation("test: exit 0\ntty: true", 1),
        Path::new("/sd"),
    )
    .unwrap();

    let outer = std::fs::read_to_string(&wrappers.outer).unwrap();
    assert!(!outer.contains("</dev/null"));
}

#[test]
fn beakerlib_inner_sets_journal_dir() {
    let dir = tempfile::tempdir().unwrap();
    let wrappers = write_wrappers(
        dir.path(),
        &invocation("test: ./runtest.sh\nframework: beakerlib", 1),
        Path::new("/sd"),
    )
    .unwrap();

    let inner = std::fs::read_to_string(&wrappers.inner).unwrap();
    assert!(inner.contains("BEAKERLIB_DIR"));
    assert!(inner.contains("./runtest.sh"));
}

#[test]
fn command_is_relative_to_the_invocation_dir() {
    let dir = tempfile::tempdir().unwrap();
    let wrappers =
        write_wrappers(dir.path(), &invocation("test: exit 0", 9), Path::new("/sd")).unwrap();
    assert_eq!(
        wrappers.command(),
        "./test-wrapper-outer.sh-tests-demo-9"
    );
}
