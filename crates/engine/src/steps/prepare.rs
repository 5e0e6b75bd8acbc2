// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prepare step: run preparation phases on the selected guests.
//!
//! The built-in `shell` variant executes configured scripts. Phases
//! already marked done are skipped on resume; the phase barrier
//! holds between phases.

use super::PlanRunner;
use crate::cancel::CancelToken;
use crate::dispatch::{fan_out, first_error};
use crate::error::EngineError;
use rig_core::{Environment, Phase, StepKind};
use rig_guest::{Guest, RunOptions};
use rig_storage::StepState;
use serde_yaml::Value;
use std::path::Path;
use std::sync::Arc;

pub(crate) async fn run(
    runner: &mut PlanRunner,
    state: &mut StepState,
    state_file: &Path,
) -> Result<(), EngineError> {
    run_shell_phases(runner, StepKind::Prepare, state, state_file).await
}

/// Run every selected shell phase of a step, one at a time, fanning
/// each out across its guests
pub(crate) async fn run_shell_phases(
    runner: &PlanRunner,
    kind: StepKind,
    state: &mut StepState,
    state_file: &Path,
) -> Result<(), EngineError> {
    let env = runner.plan_environment()?;

    for phase in runner.selected_phases(kind)? {
        if state.phase_done(&phase.name) {
            tracing::debug!(phase = phase.name, "phase already done");
            continue;
        }
        if phase.how != "shell" {
            return Err(EngineError::Specification(format!(
                "{kind} phase '{}': unknown variant '{}'",
                phase.name, phase.how
            )));
        }

        let guests = runner.phase_guests(&phase)?;
        if !guests.is_empty() {
            run_phase_scripts(&phase, guests, &env, kind, runner).await?;
        }

        state.mark_phase_done(&phase.name);
        state.save(state_file)?;
    }

    Ok(())
}

async fn run_phase_scripts(
    phase: &Phase,
    guests: Vec<Arc<dyn Guest>>,
    env: &Environment,
    kind: StepKind,
    runner: &PlanRunner,
) -> Result<(), EngineError> {
    let scripts = phase_scripts(phase);
    if scripts.is_empty() {
        return Ok(());
    }

    let items: Vec<(String, Arc<dyn Guest>)> = guests
        .into_iter()
        .map(|guest| (guest.name().to_string(), guest))
        .collect();
    let cancel = CancelToken::new();
    let phase_name = phase.name.clone();
    let plan_id = runner.plan.id.clone();
    let env = env.clone();

    let outcomes = fan_out(items, phase.sequential, &cancel, move |guest, cancel| {
        let scripts = scripts.clone();
        let env = env.clone();
        let phase_name = phase_name.clone();
        let plan_id = plan_id.clone();
        async move {
            for script in scripts {
                if cancel.is_cancelled() {
                    break;
                }
                let options = RunOptions {
                    env: env.clone(),
                    ..RunOptions::default()
                };
                let output = guest.run(&script, &options).await?;
                if !output.success() {
                    return Err(EngineError::Step {
                        plan: plan_id,
                        step: kind,
                        message: format!(
                            "phase '{phase_name}' failed on guest '{}' (exit {}): {}",
                            guest.name(),
                            output.exit_code,
                            output.stderr.trim()
                        ),
                    });
                }
            }
            Ok(())
        }
    })
    .await;
    first_error(outcomes)
}

/// The phase's `script` option: a string or a list of strings
fn phase_scripts(phase: &Phase) -> Vec<String> {
    match phase.options.get(&Value::from("script")) {
        Some(Value::String(script)) => vec![script.clone()],
        Some(Value::Sequence(scripts)) => scripts
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}
