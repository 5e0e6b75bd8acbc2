// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::fake::{FakeGuest, GuestCall};

#[test]
fn helpers_are_wired_for_the_data_protocol() {
    assert!(TMT_REBOOT.content.contains("flock"));
    assert!(TMT_REBOOT.content.contains("TMT_TEST_PIDFILE"));
    assert!(TMT_REPORT_RESULT
        .content
        .contains(REPORT_RESULTS_FILENAME));
    assert!(TMT_ABORT.content.contains(ABORT_FILENAME));
    assert!(TMT_FILE_SUBMIT.content.contains(SUBMITTED_FILES_FILENAME));
}

#[tokio::test]
async fn install_pushes_every_helper() {
    let staging = tempfile::tempdir().unwrap();
    let scripts = tempfile::tempdir().unwrap();
    let guest = FakeGuest::new("fake-0", None);

    install(&guest, staging.path(), scripts.path()).await.unwrap();

    let pushes = guest
        .calls()
        .into_iter()
        .filter(|call| matches!(call, GuestCall::Push { .. }))
        .count();
    assert_eq!(pushes, ALL.len());
    assert!(scripts.path().join("tmt-reboot").exists());
}
