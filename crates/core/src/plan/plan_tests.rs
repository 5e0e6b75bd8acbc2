// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::metadata::Node;

fn node(yaml: &str) -> Node {
    Node::new("/plans/basic", serde_yaml::from_str(yaml).unwrap())
}

#[test]
fn step_order_is_fixed() {
    let kinds: Vec<&str> = StepKind::ALL.iter().map(|k| k.as_str()).collect();
    assert_eq!(
        kinds,
        ["discover", "provision", "prepare", "execute", "finish", "report"]
    );
}

#[test]
fn minimal_plan_materializes() {
    let plan = Plan::from_node(
        &node("summary: smoke\nexecute:\n  how: tmt\n  script: exit 0"),
        &Context::new(),
    )
    .unwrap();

    assert_eq!(plan.summary.as_deref(), Some("smoke"));
    assert!(plan.enabled);
    assert_eq!(plan.step(StepKind::Execute).len(), 1);
    assert!(plan.step(StepKind::Prepare).is_empty());
}

#[test]
fn disabled_plan_is_marked() {
    let plan = Plan::from_node(&node("enabled: false"), &Context::new()).unwrap();
    assert!(!plan.enabled);
}

#[test]
fn plan_context_overlays_run_context() {
    let mut run_context = Context::new();
    run_context.set("distro", ["fedora-33"]);
    run_context.set("arch", ["x86_64"]);

    let plan = Plan::from_node(
        &node("context:\n  distro: centos-8"),
        &run_context,
    )
    .unwrap();

    assert_eq!(
        plan.context.get("distro"),
        Some(&["centos-8".to_string()][..])
    );
    assert_eq!(plan.context.get("arch"), Some(&["x86_64".to_string()][..]));
}

#[test]
fn adjust_can_disable_plan() {
    let mut run_context = Context::new();
    run_context.set("distro", ["centos-8"]);

    let plan = Plan::from_node(
        &node(concat!(
            "enabled: true\n",
            "adjust:\n",
            "  - when: distro == centos\n",
            "    enabled: false\n",
        )),
        &run_context,
    )
    .unwrap();

    assert!(!plan.enabled);
}

#[test]
fn environment_and_files_parse() {
    let plan = Plan::from_node(
        &node("environment:\n  STAGE: production\nenvironment-file: vars.env"),
        &Context::new(),
    )
    .unwrap();

    assert_eq!(plan.environment.get("STAGE"), Some("production"));
    assert_eq!(plan.environment_files, vec!["vars.env"]);
}

#[test]
fn scalar_step_config_is_rejected() {
    let error = Plan::from_node(&node("execute: just-a-string"), &Context::new()).unwrap_err();
    assert!(matches!(error, PlanError::BadStep { .. }));
}

#[test]
fn bad_phase_order_is_a_plan_error() {
    let error = Plan::from_node(
        &node("prepare:\n  order: sideways"),
        &Context::new(),
    )
    .unwrap_err();
    assert!(matches!(error, PlanError::Phase { .. }));
}

#[test]
fn default_how_follows_the_step() {
    let plan = Plan::from_node(
        &node("provision:\n  image: fedora\nreport:\n  file: out.html"),
        &Context::new(),
    )
    .unwrap();

    assert_eq!(plan.step(StepKind::Provision)[0].how, "local");
    assert_eq!(plan.step(StepKind::Report)[0].how, "display");
}
