// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rig_core::{Node, TestSpec};
use rig_guest::FakeGuest;
use tempfile::TempDir;

struct Fixture {
    _root: TempDir,
    invoker: Invoker,
    guest: Arc<FakeGuest>,
}

fn fixture() -> Fixture {
    let root = tempfile::tempdir().unwrap();
    let run_id = RunId::new("test-run");
    let workdir = Workdir::create(root.path(), &run_id).unwrap();
    let plan_id = NodeId::new("/plans/unit");
    let store = Arc::new(
        ResultStore::open(
            workdir.results_file(&plan_id),
            workdir.failures_file(&plan_id),
        )
        .unwrap(),
    );
    let guest = Arc::new(FakeGuest::new("default-0", None));
    let scripts_dir = root.path().join("scripts");
    std::fs::create_dir_all(&scripts_dir).unwrap();

    let mut config = EngineConfig::new(root.path().to_path_buf(), root.path().to_path_buf());
    config.reboot_timeout = Some(Duration::from_secs(5));
    config.pidfile_root = Some(root.path().join("pid"));

    let invoker = Invoker {
        config: Arc::new(config),
        run_id,
        plan_id,
        plan_context: Context::new(),
        base_env: Environment::new(),
        workdir,
        store,
        guest: Arc::clone(&guest) as Arc<dyn Guest>,
        scripts_dir,
        topology_bash: root.path().join("topology.sh"),
        topology_yaml: root.path().join("topology.yaml"),
    };

    Fixture {
        _root: root,
        invoker,
        guest,
    }
}

fn invocation(yaml: &str, serial: u64) -> TestInvocation {
    let node = Node::new("/tests/unit", serde_yaml::from_str(yaml).unwrap());
    TestInvocation::new(
        TestSpec::from_node(&node).unwrap(),
        rig_core::GuestIdentity {
            name: "default-0".to_string(),
            role: None,
        },
        serial,
    )
}

#[tokio::test]
async fn passing_test_produces_pass() {
    let fixture = fixture();
    let mut invocation = invocation("test: exit 0", 1);

    let report = fixture.invoker.run_test(&mut invocation).await.unwrap();
    assert_eq!(report.outcome, Outcome::Pass);
    assert!(!report.abort_requested);

    let snapshot = fixture.invoker.store.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].result, Outcome::Pass);
    assert_eq!(snapshot[0].original_result, Some(Outcome::Pass));
    assert!(snapshot[0].duration.is_some());
}

#[tokio::test]
async fn environment_reaches_the_test() {
    let fixture = fixture();
    let mut invocation = invocation(
        "test: echo \"serial=$TMT_TEST_SERIAL_NUMBER iteration=$TMT_TEST_ITERATION_ID\" > \"$TMT_TEST_DATA/env.txt\"",
        7,
    );

    fixture.invoker.run_test(&mut invocation).await.unwrap();

    let data_dir = fixture.invoker.workdir.test_data_dir(
        &fixture.invoker.plan_id,
        "default-0",
        "tests-unit-7",
    );
    let content = std::fs::read_to_string(data_dir.join("env.txt")).unwrap();
    assert_eq!(content.trim(), "serial=7 iteration=test-run-7");
}

#[tokio::test]
async fn timeout_yields_error_outcome() {
    let fixture = fixture();
    let mut invocation = invocation("test: sleep 30\nduration: 1s", 1);

    let report = fixture.invoker.run_test(&mut invocation).await.unwrap();
    assert_eq!(report.outcome, Outcome::Error);

    let snapshot = fixture.invoker.store.snapshot();
    assert!(snapshot[0].note.iter().any(|n| n.contains("timed out")));
}

#[tokio::test]
async fn zero_duration_is_rejected_without_override() {
    let fixture = fixture();
    let mut invocation = invocation("test: exit 0\nduration: '0'", 1);
    assert!(matches!(
        fixture.invoker.run_test(&mut invocation).await,
        Err(EngineError::Duration { .. })
    ));
}

#[tokio::test]
async fn restart_exhaustion_fails_with_note() {
    let fixture = fixture();
    let mut invocation = invocation(
        "test: exit 79\nrestart-on-exit-code: [79]\nrestart-max-count: 1",
        1,
    );

    let report = fixture.invoker.run_test(&mut invocation).await.unwrap();
    assert_eq!(report.outcome, Outcome::Fail);
    assert_eq!(invocation.restart_count, 1);

    // Two wrapper executions: the original and one restart
    let runs = fixture
        .guest
        .run_scripts()
        .into_iter()
        .filter(|s| s.contains("test-wrapper-outer"))
        .count();
    assert_eq!(runs, 2);

    let snapshot = fixture.invoker.store.snapshot();
    assert!(snapshot[0]
        .note
        .iter()
        .any(|n| n.contains("restart limit reached")));
}

#[tokio::test]
async fn reboot_request_drives_the_loop() {
    let fixture = fixture();
    let mut invocation = invocation(
        concat!(
            "test: |\n",
            "  if [ \"$TMT_REBOOT_COUNT\" = \"0\" ]; then\n",
            "    echo \"command=\" > \"$TMT_REBOOT_REQUEST\"\n",
            "    exit 1\n",
            "  else\n",
            "    exit 0\n",
            "  fi\n",
        ),
        1,
    );

    let report = fixture.invoker.run_test(&mut invocation).await.unwrap();
    assert_eq!(report.outcome, Outcome::Pass);
    assert_eq!(invocation.reboot_count, 1);
    assert_eq!(fixture.guest.reboots(), 1);
}

#[tokio::test]
async fn failed_reboot_is_an_error_with_failure_record() {
    let fixture = fixture();
    fixture.guest.set_fail_reboot(true);
    let mut invocation = invocation(
        "test: echo \"command=\" > \"$TMT_REBOOT_REQUEST\"; exit 1",
        1,
    );

    let report = fixture.invoker.run_test(&mut invocation).await.unwrap();
    assert_eq!(report.outcome, Outcome::Error);

    let failures = fixture
        .invoker
        .workdir
        .failures_file(&fixture.invoker.plan_id);
    assert!(failures.exists());
}

#[tokio::test]
async fn subresults_reduce_but_original_stays() {
    let fixture = fixture();
    // Reported entries win over the clean exit code
    let mut invocation = invocation(
        concat!(
            "test: |\n",
            "  printf -- '- name: \"A\"\\n  result: \"pass\"\\n' >> \"$TMT_TEST_DATA/tmt-report-results.yaml\"\n",
            "  printf -- '- name: \"B\"\\n  result: \"fail\"\\n' >> \"$TMT_TEST_DATA/tmt-report-results.yaml\"\n",
            "  exit 0\n",
        ),
        1,
    );

    let report = fixture.invoker.run_test(&mut invocation).await.unwrap();
    assert_eq!(report.outcome, Outcome::Fail);

    let snapshot = fixture.invoker.store.snapshot();
    assert_eq!(snapshot[0].original_result, Some(Outcome::Pass));
    assert_eq!(snapshot[0].result, Outcome::Fail);
    assert_eq!(snapshot[0].subresult.len(), 2);
}

#[tokio::test]
async fn abort_marker_is_reported() {
    let fixture = fixture();
    let mut invocation = invocation("test: touch \"$TMT_TEST_DATA/tmt-abort\"; exit 0", 1);

    let report = fixture.invoker.run_test(&mut invocation).await.unwrap();
    assert!(report.abort_requested);
    assert_eq!(report.outcome, Outcome::Fail);
}

#[tokio::test]
async fn xfail_flips_the_outcome() {
    let fixture = fixture();
    let mut invocation = invocation("test: exit 1\nresult: xfail", 1);

    let report = fixture.invoker.run_test(&mut invocation).await.unwrap();
    assert_eq!(report.outcome, Outcome::Pass);

    let snapshot = fixture.invoker.store.snapshot();
    assert_eq!(snapshot[0].original_result, Some(Outcome::Fail));
}
