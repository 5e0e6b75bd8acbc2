// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn layout_is_deterministic() {
    let root = tempfile::tempdir().unwrap();
    let run_id = RunId::new("run-1");
    let workdir = Workdir::create(root.path(), &run_id).unwrap();
    let plan = NodeId::new("/plans/smoke");

    assert_eq!(workdir.run_file(), workdir.root().join("run.yaml"));
    assert_eq!(
        workdir.plan_file(&plan),
        workdir.root().join("plans.smoke/plan.yaml")
    );
    assert_eq!(
        workdir.results_file(&plan),
        workdir.root().join("plans.smoke/execute/results.yaml")
    );
    assert_eq!(
        workdir.test_data_dir(&plan, "default-0", "tests-smoke-1"),
        workdir
            .root()
            .join("plans.smoke/execute/data/guest/default-0/tests-smoke-1/data")
    );
}

#[test]
fn last_marker_points_at_the_newest_run() {
    let root = tempfile::tempdir().unwrap();
    let first = Workdir::create(root.path(), &RunId::new("run-1")).unwrap();
    assert_eq!(Workdir::last(root.path()), Some(first.root().to_path_buf()));

    let second = Workdir::create(root.path(), &RunId::new("run-2")).unwrap();
    assert_eq!(Workdir::last(root.path()), Some(second.root().to_path_buf()));
}

#[test]
fn last_is_none_without_marker() {
    let root = tempfile::tempdir().unwrap();
    assert_eq!(Workdir::last(root.path()), None);
}

#[test]
fn scratch_empties_the_run() {
    let root = tempfile::tempdir().unwrap();
    let workdir = Workdir::create(root.path(), &RunId::new("run-1")).unwrap();
    std::fs::write(workdir.run_file(), "run: data").unwrap();
    std::fs::create_dir_all(workdir.plan_dir(&NodeId::new("/plans/smoke"))).unwrap();

    workdir.scratch().unwrap();
    assert!(workdir.root().exists());
    assert_eq!(std::fs::read_dir(workdir.root()).unwrap().count(), 0);
}
