// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI integration tests for `rig run`.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

/// Lay out a tree root with a metadata file
fn setup_tree(metadata: &str) -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join("rig.yaml"), metadata).expect("write metadata");
    std::fs::create_dir_all(dir.path().join("scripts")).expect("scripts dir");
    dir
}

fn rig(tree: &Path) -> Command {
    let mut command = Command::cargo_bin("rig").expect("binary builds");
    command
        .arg("run")
        .arg("--root")
        .arg(tree)
        .arg("--workdir-root")
        .arg(tree.join("runs"))
        .env("TMT_SCRIPTS_DIR", tree.join("scripts"))
        .env("TMT_TEST_PIDFILE_ROOT", tree.join("pid"));
    command
}

const PASSING_PLAN: &str = concat!(
    "/plans/smoke:\n",
    "  discover:\n",
    "    how: shell\n",
    "    tests:\n",
    "      - name: /t\n",
    "        test: exit 0\n",
    "  provision:\n",
    "    how: local\n",
    "  execute:\n",
    "    how: tmt\n",
);

#[test]
fn passing_plan_exits_zero() {
    let tree = setup_tree(PASSING_PLAN);
    rig(tree.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("pass  /t"));
}

#[test]
fn failing_test_exits_one() {
    let tree = setup_tree(concat!(
        "/plans/smoke:\n",
        "  discover:\n",
        "    how: shell\n",
        "    tests:\n",
        "      - name: /t\n",
        "        test: exit 1\n",
        "  provision:\n",
        "    how: local\n",
        "  execute:\n",
        "    how: tmt\n",
    ));
    rig(tree.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("fail  /t"));
}

#[test]
fn erroring_test_exits_two() {
    let tree = setup_tree(concat!(
        "/plans/smoke:\n",
        "  discover:\n",
        "    how: shell\n",
        "    tests:\n",
        "      - name: /t\n",
        "        test: sleep 10\n",
        "        duration: 1s\n",
        "  provision:\n",
        "    how: local\n",
        "  execute:\n",
        "    how: tmt\n",
    ));
    rig(tree.path()).assert().code(2);
}

#[test]
fn missing_metadata_is_an_internal_error() {
    let dir = TempDir::new().expect("temp dir");
    let mut command = Command::cargo_bin("rig").expect("binary builds");
    command
        .arg("run")
        .arg("--root")
        .arg(dir.path())
        .arg("--workdir-root")
        .arg(dir.path().join("runs"));
    command
        .assert()
        .code(3)
        .stderr(predicate::str::contains("cannot read metadata"));
}

#[test]
fn last_reuses_the_previous_run() {
    let tree = setup_tree(PASSING_PLAN);

    let output = rig(tree.path()).output().expect("first run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let run_line = stdout
        .lines()
        .find(|l| l.starts_with("run: "))
        .expect("run line");
    let run_root = run_line.trim_start_matches("run: ").to_string();

    rig(tree.path())
        .arg("--last")
        .assert()
        .success()
        .stdout(predicate::str::contains(&run_root));
}

#[test]
fn unknown_step_is_rejected() {
    let tree = setup_tree(PASSING_PLAN);
    rig(tree.path())
        .arg("--again")
        .arg("compile")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown step"));
}

#[test]
fn plan_name_filter_selects_nothing() {
    let tree = setup_tree(PASSING_PLAN);
    rig(tree.path())
        .arg("--name")
        .arg("/plans/other$")
        .assert()
        .success();
}
