// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provision step: acquire guests and install the helper scripts.
//!
//! Guests are provisioned in parallel only when every requested
//! variant declares the parallel-safe capability; otherwise the step
//! silently falls back to sequential. Reconnect data lands in
//! `guests.yaml` so later steps and resumed runs reach the same
//! guests.

use super::PlanRunner;
use crate::cancel::CancelToken;
use crate::dispatch::{fan_out, first_error};
use crate::error::EngineError;
use rig_core::StepKind;
use rig_guest::spec::{load_records, save_records, GuestRecord, GuestSpec};
use rig_guest::{scripts, Guest, RunOptions};
use rig_storage::StepState;
use std::path::Path;
use std::sync::Arc;

pub(crate) async fn run(
    runner: &mut PlanRunner,
    state: &mut StepState,
    state_file: &Path,
) -> Result<(), EngineError> {
    let control_dir = runner.workdir.step_dir(&runner.plan.id, StepKind::Provision);
    std::fs::create_dir_all(&control_dir)
        .map_err(|e| EngineError::Internal(format!("provision dir: {e}")))?;

    let phases = runner.selected_phases(StepKind::Provision)?;
    let mut records = Vec::new();
    let mut guests: Vec<Arc<dyn Guest>> = Vec::new();

    for phase in &phases {
        let spec = GuestSpec::from_phase(phase)?;
        let record = GuestRecord::new(phase.name.clone(), spec);
        let guest = runner.registry.acquire(&record, &control_dir)?;
        records.push(record);
        guests.push(Arc::from(guest));
    }

    // Connectivity check plus helper scripts, one instance per guest
    let parallel = guests.iter().all(|g| g.supports_parallel_provision());
    let scripts_dir = runner.scripts_dir();
    let staging_root = control_dir.join("scripts");
    let plan_id = runner.plan.id.clone();

    let items: Vec<(String, Arc<dyn Guest>)> = guests
        .iter()
        .map(|guest| (guest.name().to_string(), Arc::clone(guest)))
        .collect();
    let cancel = CancelToken::new();
    let outcomes = fan_out(items, !parallel, &cancel, move |guest, _cancel| {
        let scripts_dir = scripts_dir.clone();
        let staging = staging_root.join(guest.name());
        let plan_id = plan_id.clone();
        async move {
            let probe = guest.run("true", &RunOptions::default()).await?;
            if !probe.success() {
                return Err(EngineError::Step {
                    plan: plan_id,
                    step: StepKind::Provision,
                    message: format!("guest '{}' failed the connectivity check", guest.name()),
                });
            }
            scripts::install(guest.as_ref(), &staging, &scripts_dir).await?;
            tracing::info!(guest = guest.name(), "guest ready");
            Ok(())
        }
    })
    .await;
    first_error(outcomes)?;

    save_records(&runner.workdir.guests_file(&runner.plan.id), &records)?;
    for phase in &phases {
        state.mark_phase_done(&phase.name);
    }
    state.save(state_file)?;
    runner.guests = guests;
    Ok(())
}

/// Reconnect guests from `guests.yaml` after a resume
pub(crate) async fn load(runner: &mut PlanRunner) -> Result<(), EngineError> {
    let path = runner.workdir.guests_file(&runner.plan.id);
    if !path.exists() {
        return Ok(());
    }
    let control_dir = runner.workdir.step_dir(&runner.plan.id, StepKind::Provision);

    let mut guests: Vec<Arc<dyn Guest>> = Vec::new();
    for record in load_records(&path)? {
        let guest = runner.registry.acquire(&record, &control_dir)?;
        guests.push(Arc::from(guest));
    }
    tracing::debug!(
        plan = %runner.plan.id,
        guests = guests.len(),
        "reconnected guests"
    );
    runner.guests = guests;
    Ok(())
}
