// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::fake::FakeGuest;

fn two_host_topology() -> Topology {
    let server = FakeGuest::new("server-1", Some("server".to_string()));
    let client = FakeGuest::new("client-1", Some("client".to_string()));
    Topology::from_guests(&[&server as &dyn Guest, &client as &dyn Guest])
}

#[test]
fn collects_guests_and_roles() {
    let topology = two_host_topology();
    assert_eq!(topology.guests.len(), 2);
    assert_eq!(
        topology.roles.get("server"),
        Some(&vec!["server-1".to_string()])
    );
}

#[test]
fn bash_rendering_exposes_variables() {
    let bash = two_host_topology().to_bash();
    assert!(bash.contains(r#"TMT_GUESTS="client-1 server-1""#));
    assert!(bash.contains(r#"TMT_GUEST_SERVER_1_HOSTNAME="server-1.fake""#));
    assert!(bash.contains(r#"TMT_GUEST_CLIENT_1_ROLE="client""#));
    assert!(bash.contains(r#"TMT_ROLE_SERVER="server-1""#));
}

#[test]
fn yaml_rendering_round_trips() {
    let topology = two_host_topology();
    let parsed: Topology = serde_yaml::from_str(&topology.to_yaml()).unwrap();
    assert_eq!(parsed, topology);
}

#[test]
fn save_writes_both_files() {
    let dir = tempfile::tempdir().unwrap();
    let (bash, yaml) = two_host_topology().save(dir.path()).unwrap();
    assert!(bash.exists());
    assert!(yaml.exists());
}
