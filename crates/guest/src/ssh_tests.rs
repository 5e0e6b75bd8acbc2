// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rig_core::Environment;

fn guest() -> SshGuest {
    SshGuest::new(
        "client-1",
        Some("client".to_string()),
        "guest.example.com",
        Some("root".to_string()),
        Some(2222),
        false,
        Path::new("/tmp/run"),
    )
}

#[test]
fn destination_includes_user() {
    assert_eq!(guest().destination(), "root@guest.example.com");
}

#[test]
fn control_path_is_per_guest() {
    let options = guest().common_options();
    assert!(options
        .iter()
        .any(|o| o.contains("ssh-client-1.socket")));
}

#[test]
fn remote_script_exports_environment() {
    let mut env = Environment::new();
    env.set("TMT_TEST_DATA", "/var/tmp/data");

    let options = RunOptions {
        env,
        cwd: Some("/opt/work dir".into()),
        ..RunOptions::default()
    };
    let script = remote_script("./test.sh", &options, false);
    assert_eq!(
        script,
        "cd '/opt/work dir' && export TMT_TEST_DATA='/var/tmp/data' && sh -c './test.sh'"
    );
}

#[test]
fn remote_script_escalates_when_asked() {
    let script = remote_script("whoami", &RunOptions::default(), true);
    assert_eq!(script, "sudo -E sh -c 'whoami'");
}

#[test]
fn reboot_is_supported() {
    assert!(guest().supports_reboot());
    assert!(guest().supports_parallel_provision());
}
