// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_yaml::Value;

fn fedora() -> Context {
    let mut context = Context::new();
    context.set("distro", ["fedora-33"]);
    context
}

fn entry(yaml: &str) -> AdjustEntry {
    AdjustEntry::from_value(&serde_yaml::from_str::<Value>(yaml).unwrap()).unwrap()
}

fn attributes(yaml: &str) -> Mapping {
    serde_yaml::from_str(yaml).unwrap()
}

#[test]
fn matching_entry_replaces() {
    let node = attributes("enabled: true\nsummary: original");
    let entries = vec![entry("when: distro == fedora\nenabled: false")];

    let adjusted = apply_adjust(&node, &entries, &fedora()).unwrap();
    assert_eq!(adjusted.get(&Value::from("enabled")), Some(&Value::from(false)));
    assert_eq!(
        adjusted.get(&Value::from("summary")),
        Some(&Value::from("original"))
    );
}

#[test]
fn unmatched_entry_is_skipped() {
    let node = attributes("enabled: true");
    let entries = vec![entry("when: distro == centos\nenabled: false")];

    let adjusted = apply_adjust(&node, &entries, &fedora()).unwrap();
    assert_eq!(adjusted.get(&Value::from("enabled")), Some(&Value::from(true)));
}

#[test]
fn plus_suffix_appends_lists() {
    let node = attributes("require: [wget]");
    let entries = vec![entry("when: distro == fedora\nrequire+: [curl]")];

    let adjusted = apply_adjust(&node, &entries, &fedora()).unwrap();
    let require = adjusted.get(&Value::from("require")).unwrap();
    assert_eq!(
        require,
        &Value::Sequence(vec![Value::from("wget"), Value::from("curl")])
    );
}

#[test]
fn plus_suffix_merges_mappings() {
    let node = attributes("environment:\n  A: '1'");
    let entries = vec![entry("when: distro == fedora\nenvironment+:\n  B: '2'")];

    let adjusted = apply_adjust(&node, &entries, &fedora()).unwrap();
    let environment = adjusted
        .get(&Value::from("environment"))
        .and_then(Value::as_mapping)
        .unwrap();
    assert_eq!(environment.get(&Value::from("A")), Some(&Value::from("1")));
    assert_eq!(environment.get(&Value::from("B")), Some(&Value::from("2")));
}

#[test]
fn continue_false_stops_processing() {
    let node = attributes("summary: original");
    let entries = vec![
        entry("when: distro == fedora\ncontinue: false\nsummary: first"),
        entry("when: distro == fedora\nsummary: second"),
    ];

    let adjusted = apply_adjust(&node, &entries, &fedora()).unwrap();
    assert_eq!(
        adjusted.get(&Value::from("summary")),
        Some(&Value::from("first"))
    );
}

#[test]
fn entry_without_when_always_applies() {
    let node = attributes("summary: original");
    let entries = vec![entry("summary: adjusted")];

    let adjusted = apply_adjust(&node, &entries, &Context::new()).unwrap();
    assert_eq!(
        adjusted.get(&Value::from("summary")),
        Some(&Value::from("adjusted"))
    );
}

#[test]
fn adjust_is_idempotent() {
    let node = attributes("enabled: true\nsummary: original");
    let entries = vec![entry("when: distro == fedora\nenabled: false")];

    let once = apply_adjust(&node, &entries, &fedora()).unwrap();
    let twice = apply_adjust(&once, &entries, &fedora()).unwrap();
    assert_eq!(once, twice);
}
