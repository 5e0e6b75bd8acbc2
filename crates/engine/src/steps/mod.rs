// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step engine.
//!
//! Each plan walks the fixed step order. A step moves `todo` to
//! `pending` on entry and `pending` to `done` only after every
//! selected phase completed; an abnormal exit leaves it `pending`
//! and a resumed run replays the phases that have no completion
//! marker. `finish` runs best-effort after any failure and `report`
//! always runs so partial results stay visible.

mod discover;
mod execute;
mod finish;
mod prepare;
mod provision;
mod report;

pub(crate) use discover::DiscoveredTest;

use crate::config::EngineConfig;
use crate::error::EngineError;
use rig_core::{
    select_phases, Environment, MetadataSource, Phase, Plan, RunId, SerialAllocator, StepKind,
    TestResult,
};
use rig_guest::{Guest, ProvisionerRegistry};
use rig_storage::{ResultStore, StepState, StepStatus, Workdir};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Outcome of running one plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PlanVerdict {
    /// All steps completed
    Completed,
    /// A step failed; finish and report still ran
    Failed,
}

/// Drives one plan through the six steps
pub(crate) struct PlanRunner {
    pub config: Arc<EngineConfig>,
    pub run_id: RunId,
    pub plan: Plan,
    pub workdir: Workdir,
    pub source: Arc<dyn MetadataSource>,
    pub registry: Arc<ProvisionerRegistry>,
    pub store: Arc<ResultStore>,
    pub serials: SerialAllocator,
    /// Ready guests, populated by provision
    pub guests: Vec<Arc<dyn Guest>>,
    /// Discovered tests with their serial numbers
    pub tests: Vec<DiscoveredTest>,
    /// Abort flag shared with every invoker
    pub abort: Arc<AtomicBool>,
}

impl PlanRunner {
    pub fn new(
        config: Arc<EngineConfig>,
        run_id: RunId,
        plan: Plan,
        workdir: Workdir,
        source: Arc<dyn MetadataSource>,
        registry: Arc<ProvisionerRegistry>,
        serials: SerialAllocator,
    ) -> Result<PlanRunner, EngineError> {
        let store = Arc::new(ResultStore::open(
            workdir.results_file(&plan.id),
            workdir.failures_file(&plan.id),
        )?);
        Ok(PlanRunner {
            config,
            run_id,
            plan,
            workdir,
            source,
            registry,
            store,
            serials,
            guests: Vec::new(),
            tests: Vec::new(),
            abort: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Walk the fixed step order.
    ///
    /// The first failing step short-circuits the remaining regular
    /// steps, but finish and report run regardless.
    pub async fn execute(&mut self) -> Result<PlanVerdict, EngineError> {
        // Forcing a step discards the state of everything after it
        for forced in &self.config.force {
            for downstream in rig_storage::state::downstream_steps(*forced) {
                let state_file = self.workdir.step_state_file(&self.plan.id, downstream);
                if state_file.exists() {
                    rig_storage::state::reset_step(&state_file)?;
                }
            }
        }

        let mut failure: Option<EngineError> = None;

        for kind in StepKind::ALL {
            let always_runs = matches!(kind, StepKind::Finish | StepKind::Report);
            if failure.is_some() && !always_runs {
                continue;
            }

            if let Err(error) = self.run_step(kind).await {
                tracing::error!(
                    plan = %self.plan.id,
                    step = %kind,
                    error = %error,
                    "step failed"
                );
                if failure.is_none() {
                    failure = Some(error);
                }
            }
        }

        match failure {
            None => Ok(PlanVerdict::Completed),
            Some(_) => Ok(PlanVerdict::Failed),
        }
    }

    /// One step through its lifecycle
    async fn run_step(&mut self, kind: StepKind) -> Result<(), EngineError> {
        let state_file = self.workdir.step_state_file(&self.plan.id, kind);
        let mut state = StepState::load(&state_file)?;

        if state.status == StepStatus::Done && !self.config.rerun_requested(kind) {
            tracing::debug!(plan = %self.plan.id, step = %kind, "step already done");
            return self.load_step_outputs(kind).await;
        }
        if self.config.rerun_requested(kind) {
            state.phases.clear();
        }

        state.status = StepStatus::Pending;
        state.save(&state_file)?;
        tracing::info!(plan = %self.plan.id, step = %kind, "running step");

        match kind {
            StepKind::Discover => discover::run(self, &mut state, &state_file).await?,
            StepKind::Provision => provision::run(self, &mut state, &state_file).await?,
            StepKind::Prepare => prepare::run(self, &mut state, &state_file).await?,
            StepKind::Execute => execute::run(self, &mut state, &state_file).await?,
            StepKind::Finish => finish::run(self, &mut state, &state_file).await?,
            StepKind::Report => report::run(self, &mut state, &state_file).await?,
        }

        state.status = StepStatus::Done;
        state.save(&state_file)?;
        Ok(())
    }

    /// Reload the outputs of a completed step a later step needs
    async fn load_step_outputs(&mut self, kind: StepKind) -> Result<(), EngineError> {
        match kind {
            StepKind::Discover => discover::load(self),
            StepKind::Provision => provision::load(self).await,
            _ => Ok(()),
        }
    }

    /// Active phases of a step in execution order
    pub(crate) fn selected_phases(&self, kind: StepKind) -> Result<Vec<Phase>, EngineError> {
        Ok(select_phases(self.plan.step(kind), &self.plan.context)?
            .into_iter()
            .cloned()
            .collect())
    }

    /// Concrete guests a phase targets.
    ///
    /// A `where` naming no active guest skips the phase silently
    /// unless `strict_where` escalates it.
    pub(crate) fn phase_guests(&self, phase: &Phase) -> Result<Vec<Arc<dyn Guest>>, EngineError> {
        let identities: Vec<_> = self.guests.iter().map(|g| g.identity()).collect();
        let selected = phase.resolve_where(&identities);
        if selected.is_empty() && !phase.where_.is_empty() && !self.guests.is_empty() {
            if self.config.strict_where {
                return Err(EngineError::Specification(format!(
                    "phase '{}': where {:?} matches no guest",
                    phase.name, phase.where_
                )));
            }
            tracing::debug!(phase = phase.name, "no guest matches where, skipping");
            return Ok(Vec::new());
        }
        let names: Vec<&str> = selected.iter().map(|g| g.name.as_str()).collect();
        Ok(self
            .guests
            .iter()
            .filter(|guest| names.contains(&guest.name()))
            .map(Arc::clone)
            .collect())
    }

    /// Plan environment with `environment-file` layers applied
    pub(crate) fn plan_environment(&self) -> Result<Environment, EngineError> {
        let mut env = self.plan.environment.clone();
        for file in &self.plan.environment_files {
            let path = self.config.tree_root.join(file);
            let layer = Environment::from_file(&path)
                .map_err(|e| EngineError::Specification(e.to_string()))?;
            env.extend(&layer);
        }
        Ok(env)
    }

    /// Scripts directory on guests, honoring the configured override
    pub(crate) fn scripts_dir(&self) -> PathBuf {
        self.config
            .scripts_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(rig_guest::scripts::DEFAULT_SCRIPTS_DIR))
    }

    /// All results of this plan, in store order
    pub(crate) fn results(&self) -> Vec<TestResult> {
        self.store.snapshot()
    }
}
