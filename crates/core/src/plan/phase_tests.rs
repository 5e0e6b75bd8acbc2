// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_yaml::Value;

fn phase(yaml: &str, index: usize) -> Phase {
    Phase::from_value(&serde_yaml::from_str::<Value>(yaml).unwrap(), index, "shell").unwrap()
}

fn guest(name: &str, role: Option<&str>) -> GuestIdentity {
    GuestIdentity {
        name: name.to_string(),
        role: role.map(str::to_string),
    }
}

#[test]
fn defaults() {
    let phase = phase("script: echo hi", 2);
    assert_eq!(phase.how, "shell");
    assert_eq!(phase.name, "default-2");
    assert_eq!(phase.order, PHASE_ORDER_DEFAULT);
    assert!(phase.enabled);
    assert!(!phase.sequential);
    assert!(phase.options.contains_key(&Value::from("script")));
}

#[test]
fn known_keys_are_lifted() {
    let phase = phase(
        "how: install\nname: packages\norder: 70\nwhere: [server]\nsequential: true",
        0,
    );
    assert_eq!(phase.how, "install");
    assert_eq!(phase.name, "packages");
    assert_eq!(phase.order, PHASE_ORDER_REQUIRES);
    assert_eq!(phase.where_, vec!["server"]);
    assert!(phase.sequential);
    assert!(phase.options.is_empty());
}

#[test]
fn bad_order_is_rejected() {
    let value: Value = serde_yaml::from_str("order: high").unwrap();
    assert!(matches!(
        Phase::from_value(&value, 0, "shell"),
        Err(PhaseParseError::BadOrder { .. })
    ));
}

#[test]
fn step_config_accepts_single_mapping() {
    let value: Value = serde_yaml::from_str("how: shell\nscript: echo hi").unwrap();
    let config = parse_step_config(&value, "shell").unwrap();
    assert_eq!(config.len(), 1);
}

#[test]
fn step_config_accepts_list() {
    let value: Value =
        serde_yaml::from_str("- name: first\n- name: second\n  order: 30").unwrap();
    let config = parse_step_config(&value, "shell").unwrap();
    assert_eq!(config.len(), 2);
    assert_eq!(config[1].source_index, 1);
}

#[test]
fn selection_sorts_by_order_then_source() {
    let value: Value = serde_yaml::from_str(concat!(
        "- name: late\n  order: 70\n",
        "- name: second\n",
        "- name: first\n  order: 30\n",
        "- name: third\n",
    ))
    .unwrap();
    let config = parse_step_config(&value, "shell").unwrap();
    let selected = select_phases(&config, &Context::new()).unwrap();
    let names: Vec<&str> = selected.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["first", "second", "third", "late"]);
}

#[test]
fn selection_drops_inactive_phases() {
    let mut context = Context::new();
    context.set("distro", ["fedora-33"]);

    let value: Value = serde_yaml::from_str(concat!(
        "- name: always\n",
        "- name: fedora-only\n  when: distro == fedora\n",
        "- name: centos-only\n  when: distro == centos\n",
        "- name: disabled\n  enabled: false\n",
    ))
    .unwrap();
    let config = parse_step_config(&value, "shell").unwrap();
    let selected = select_phases(&config, &context).unwrap();
    let names: Vec<&str> = selected.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["always", "fedora-only"]);
}

#[test]
fn where_resolves_names_and_roles() {
    let guests = vec![
        guest("server-1", Some("server")),
        guest("client-1", Some("client")),
        guest("lonely", None),
    ];

    let phase = phase("where: [server, lonely]", 0);
    let resolved = phase.resolve_where(&guests);
    let names: Vec<&str> = resolved.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, ["server-1", "lonely"]);
}

#[test]
fn empty_where_selects_all_guests() {
    let guests = vec![guest("a", None), guest("b", None)];
    let phase = phase("script: echo hi", 0);
    assert_eq!(phase.resolve_where(&guests).len(), 2);
}
