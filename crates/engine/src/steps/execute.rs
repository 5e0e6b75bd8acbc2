// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execute step: fan test invocations out across guests.
//!
//! Within a phase every selected guest runs its assigned tests
//! concurrently with the other guests, each guest sequentially
//! through its own queue. The dispatcher's barrier keeps phase n+1
//! from starting anywhere before phase n finished everywhere. An
//! abort (from `tmt-abort` or `--exit-first`) marks every
//! not-yet-started test as skipped.

use super::{DiscoveredTest, PlanRunner};
use crate::cancel::CancelToken;
use crate::dispatch::{fan_out, first_error};
use crate::error::EngineError;
use crate::invoker::Invoker;
use rig_core::{GuestIdentity, Outcome, StepKind, TestInvocation, TestResult};
use rig_guest::{Guest, Topology};
use rig_storage::{ResultStore, StepState};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub(crate) async fn run(
    runner: &mut PlanRunner,
    state: &mut StepState,
    state_file: &Path,
) -> Result<(), EngineError> {
    let step_dir = runner.workdir.step_dir(&runner.plan.id, StepKind::Execute);
    std::fs::create_dir_all(&step_dir)
        .map_err(|e| EngineError::Internal(format!("execute dir: {e}")))?;

    // Topology files describe every guest of the plan
    let guest_refs: Vec<&dyn Guest> = runner.guests.iter().map(|g| g.as_ref()).collect();
    let topology = Topology::from_guests(&guest_refs);
    let (topology_bash, topology_yaml) = topology.save(&step_dir)?;
    for guest in &runner.guests {
        guest.push(&topology_bash, &topology_bash).await?;
        guest.push(&topology_yaml, &topology_yaml).await?;
    }

    let base_env = runner.plan_environment()?;

    for phase in runner.selected_phases(StepKind::Execute)? {
        if state.phase_done(&phase.name) {
            tracing::debug!(phase = phase.name, "phase already done");
            continue;
        }
        if phase.how != "tmt" {
            return Err(EngineError::Specification(format!(
                "execute phase '{}': unknown variant '{}'",
                phase.name, phase.how
            )));
        }

        let guests = runner.phase_guests(&phase)?;

        // Tests synchronize on their discover phase: each group must
        // finish on every guest before the next group starts anywhere
        for group in discover_groups(&runner.tests) {
            let mut items: Vec<(String, (Arc<dyn Guest>, Vec<TestInvocation>))> = Vec::new();
            for guest in &guests {
                let queue = guest_queue(&group, &guest.identity());
                if queue.is_empty() {
                    continue;
                }
                items.push((guest.name().to_string(), (Arc::clone(guest), queue)));
            }

            let cancel = CancelToken::new();
            let abort = Arc::clone(&runner.abort);
            let config = Arc::clone(&runner.config);
            let run_id = runner.run_id.clone();
            let plan_id = runner.plan.id.clone();
            let plan_context = runner.plan.context.clone();
            let workdir = runner.workdir.clone();
            let store = Arc::clone(&runner.store);
            let scripts_dir = runner.scripts_dir();
            let env = base_env.clone();
            let bash = topology_bash.clone();
            let yaml = topology_yaml.clone();

            let outcomes = fan_out(
                items,
                phase.sequential,
                &cancel,
                move |(guest, queue), _cancel| {
                    let invoker = Invoker {
                        config: Arc::clone(&config),
                        run_id: run_id.clone(),
                        plan_id: plan_id.clone(),
                        plan_context: plan_context.clone(),
                        base_env: env.clone(),
                        workdir: workdir.clone(),
                        store: Arc::clone(&store),
                        guest,
                        scripts_dir: scripts_dir.clone(),
                        topology_bash: bash.clone(),
                        topology_yaml: yaml.clone(),
                    };
                    let abort = Arc::clone(&abort);
                    let exit_first = config.exit_first;
                    async move { run_guest_queue(invoker, queue, abort, exit_first).await }
                },
            )
            .await;
            first_error(outcomes)?;
        }

        state.mark_phase_done(&phase.name);
        state.save(state_file)?;
    }

    Ok(())
}

/// Tests grouped by their discover phase, preserving phase order
fn discover_groups(tests: &[DiscoveredTest]) -> Vec<Vec<DiscoveredTest>> {
    let mut groups: Vec<(String, Vec<DiscoveredTest>)> = Vec::new();
    for test in tests {
        match groups.iter_mut().find(|(phase, _)| phase == &test.phase) {
            Some((_, group)) => group.push(test.clone()),
            None => groups.push((test.phase.clone(), vec![test.clone()])),
        }
    }
    groups.into_iter().map(|(_, group)| group).collect()
}

/// Tests assigned to one guest, instantiated as invocations
fn guest_queue(tests: &[DiscoveredTest], guest: &GuestIdentity) -> Vec<TestInvocation> {
    tests
        .iter()
        .filter(|test| {
            test.spec.where_.is_empty()
                || test.spec.where_.iter().any(|target| {
                    target == &guest.name || guest.role.as_deref() == Some(target.as_str())
                })
        })
        .map(|test| TestInvocation::new(test.spec.clone(), guest.clone(), test.serial_number))
        .collect()
}

/// Run one guest's queue sequentially, honoring the abort flag
async fn run_guest_queue(
    invoker: Invoker,
    queue: Vec<TestInvocation>,
    abort: Arc<AtomicBool>,
    exit_first: bool,
) -> Result<(), EngineError> {
    for mut invocation in queue {
        if abort.load(Ordering::SeqCst) {
            skip_invocation(&invoker.store, &invocation)?;
            continue;
        }

        let report = invoker.run_test(&mut invocation).await?;

        let stop = report.abort_requested
            || (exit_first && matches!(report.outcome, Outcome::Fail | Outcome::Error));
        if stop {
            tracing::warn!(
                test = invocation.test.name,
                outcome = report.outcome.as_str(),
                "stopping execution"
            );
            abort.store(true, Ordering::SeqCst);
        }
    }
    Ok(())
}

/// Record a skipped result for a test that never started
fn skip_invocation(store: &ResultStore, invocation: &TestInvocation) -> Result<(), EngineError> {
    let mut result = TestResult::pending(
        invocation.test.name.clone(),
        invocation.serial_number,
        invocation.guest.clone(),
    );
    result.result = Outcome::Skip;
    result.note.push("aborted".to_string());
    store.insert(result)?;
    Ok(())
}
