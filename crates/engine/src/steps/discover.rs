// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Discover step: turn metadata into test invocations.
//!
//! Two built-in variants: `fmf` selects test nodes from the metadata
//! tree, `shell` takes tests defined inline in the phase. Every
//! discovered test receives a serial number; the same test found by
//! several phases gets a distinct serial from each.

use super::PlanRunner;
use crate::error::EngineError;
use rig_core::{Node, Outcome, Phase, SelectFilter, StepKind, TestSpec};
use rig_storage::atomic::atomic_write_yaml;
use rig_storage::StepState;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::path::Path;

/// One discovered test with its serial number (`tests.yaml` entry)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct DiscoveredTest {
    pub name: String,
    pub serial_number: u64,
    /// Discover phase that produced the test; execution synchronizes
    /// between phases
    pub phase: String,
    pub spec: TestSpec,
}

pub(crate) async fn run(
    runner: &mut PlanRunner,
    state: &mut StepState,
    state_file: &Path,
) -> Result<(), EngineError> {
    // A rerun keeps the serials of persisting tests so fresh results
    // replace the old ones in the store; new tests continue above
    // the highest serial ever assigned
    let previous: Vec<DiscoveredTest> =
        rig_storage::atomic::read_yaml(&runner.workdir.tests_file(&runner.plan.id))?
            .unwrap_or_default();
    let highest = previous.iter().map(|t| t.serial_number).max().unwrap_or(0);
    runner.serials.raise_to(highest + 1);
    let mut reusable: Vec<Option<&DiscoveredTest>> = previous.iter().map(Some).collect();
    let mut reuse_serial = |name: &str| -> Option<u64> {
        let slot = reusable
            .iter_mut()
            .find(|slot| slot.is_some_and(|t| t.name == name))?;
        slot.take().map(|t| t.serial_number)
    };

    let mut discovered = Vec::new();

    for phase in runner.selected_phases(StepKind::Discover)? {
        let mut tests = match phase.how.as_str() {
            "fmf" => discover_fmf(runner, &phase)?,
            "shell" => discover_shell(&phase)?,
            other => {
                return Err(EngineError::Specification(format!(
                    "discover phase '{}': unknown variant '{other}'",
                    phase.name
                )))
            }
        };

        // Tests inherit the phase's where unless they set their own
        for test in &mut tests {
            if test.where_.is_empty() {
                test.where_ = phase.where_.clone();
            }
        }

        for spec in tests {
            let serial_number = reuse_serial(&spec.name)
                .unwrap_or_else(|| runner.serials.next());
            discovered.push(DiscoveredTest {
                name: spec.name.clone(),
                serial_number,
                phase: phase.name.clone(),
                spec,
            });
        }

        state.mark_phase_done(&phase.name);
        state.save(state_file)?;
    }

    // A failed-only rerun keeps just the tests that failed before
    if runner.config.failed_only {
        let previous = runner.store.snapshot();
        discovered.retain(|test| {
            previous.iter().any(|result| {
                result.name == test.name
                    && matches!(result.result, Outcome::Fail | Outcome::Error)
            })
        });
    }

    tracing::info!(
        plan = %runner.plan.id,
        tests = discovered.len(),
        "discover finished"
    );

    atomic_write_yaml(&runner.workdir.tests_file(&runner.plan.id), &discovered)?;
    runner.tests = discovered;
    Ok(())
}

/// Reload `tests.yaml` from a previously completed discover
pub(crate) fn load(runner: &mut PlanRunner) -> Result<(), EngineError> {
    let path = runner.workdir.tests_file(&runner.plan.id);
    let mut discovered: Vec<DiscoveredTest> =
        rig_storage::atomic::read_yaml(&path)?.unwrap_or_default();
    for test in &mut discovered {
        test.spec.name = test.name.clone();
    }

    // Keep fresh serials above everything already assigned
    let highest = discovered.iter().map(|t| t.serial_number).max().unwrap_or(0);
    runner.serials.raise_to(highest + 1);
    runner.tests = discovered;
    Ok(())
}

/// Select test nodes from the metadata tree
fn discover_fmf(runner: &PlanRunner, phase: &Phase) -> Result<Vec<TestSpec>, EngineError> {
    let filter = SelectFilter {
        names: phase_string_list(phase, "test"),
        excludes: phase_string_list(phase, "exclude")
            .into_iter()
            .map(rig_core::NodeId::new)
            .collect(),
        ..SelectFilter::default()
    };

    let mut specs = Vec::new();
    for node in runner.source.select(&filter)? {
        // Only nodes that actually define a test script
        if node.get_str("test").is_none() {
            continue;
        }
        let spec = TestSpec::from_node(&node).map_err(|e| {
            EngineError::Specification(format!("test {}: {e}", node.id))
        })?;
        specs.push(spec);
    }
    Ok(specs)
}

/// Tests listed inline in the phase configuration
fn discover_shell(phase: &Phase) -> Result<Vec<TestSpec>, EngineError> {
    let Some(tests) = phase.options.get(&Value::from("tests")) else {
        return Ok(Vec::new());
    };
    let Value::Sequence(entries) = tests else {
        return Err(EngineError::Specification(format!(
            "discover phase '{}': tests must be a list",
            phase.name
        )));
    };

    let mut specs = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        let Value::Mapping(mapping) = entry else {
            return Err(EngineError::Specification(format!(
                "discover phase '{}': test {index} must be a mapping",
                phase.name
            )));
        };
        let name = mapping
            .get(&Value::from("name"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("/test-{index}"));
        let mut attributes = mapping.clone();
        attributes.remove(&Value::from("name"));
        let node = Node::new(name, attributes);
        let spec = TestSpec::from_node(&node).map_err(|e| {
            EngineError::Specification(format!("test {}: {e}", node.id))
        })?;
        specs.push(spec);
    }
    Ok(specs)
}

fn phase_string_list(phase: &Phase, key: &str) -> Vec<String> {
    match phase.options.get(&Value::from(key)) {
        Some(Value::String(value)) => vec![value.clone()],
        Some(Value::Sequence(values)) => values
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}
