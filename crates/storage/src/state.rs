// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted run and step state.
//!
//! `run.yaml` records the plan list and removal intent; each step
//! keeps its own `step.yaml` with the lifecycle status and per-phase
//! completion markers used to detect partially executed phases on
//! resume.

use crate::atomic::{atomic_write_yaml, read_yaml, StorageError};
use rig_core::{Context, NodeId, RunId, StepKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Step lifecycle status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    #[default]
    Todo,
    /// Entered but not completed; a resumed run must inspect phase
    /// markers
    Pending,
    Done,
}

/// Persisted state of one step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepState {
    pub status: StepStatus,
    /// Completion marker per phase name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub phases: BTreeMap<String, bool>,
}

impl StepState {
    pub fn load(path: &Path) -> Result<StepState, StorageError> {
        Ok(read_yaml(path)?.unwrap_or_default())
    }

    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        atomic_write_yaml(path, self)
    }

    pub fn phase_done(&self, phase: &str) -> bool {
        self.phases.get(phase).copied().unwrap_or(false)
    }

    pub fn mark_phase_done(&mut self, phase: &str) {
        self.phases.insert(phase.to_string(), true);
    }
}

/// Status of one plan within the run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    #[default]
    Pending,
    Running,
    Done,
    Failed,
    Skipped,
}

/// One plan entry in `run.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRunState {
    pub name: NodeId,
    #[serde(default)]
    pub status: PlanStatus,
}

/// Persisted top-level run state (`run.yaml`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunState {
    pub run_id: RunId,
    pub created: chrono::DateTime<chrono::Utc>,
    #[serde(default, skip_serializing_if = "Context::is_empty")]
    pub context: Context,
    pub plans: Vec<PlanRunState>,
    /// Delete the workdir after successful finalization
    #[serde(default)]
    pub remove_on_success: bool,
}

impl RunState {
    pub fn new(run_id: RunId, context: Context, plans: Vec<NodeId>) -> Self {
        Self {
            run_id,
            created: chrono::Utc::now(),
            context,
            plans: plans
                .into_iter()
                .map(|name| PlanRunState {
                    name,
                    status: PlanStatus::default(),
                })
                .collect(),
            remove_on_success: false,
        }
    }

    pub fn load(path: &Path) -> Result<Option<RunState>, StorageError> {
        read_yaml(path)
    }

    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        atomic_write_yaml(path, self)
    }

    pub fn set_plan_status(&mut self, plan: &NodeId, status: PlanStatus) {
        if let Some(entry) = self.plans.iter_mut().find(|p| &p.name == plan) {
            entry.status = status;
        }
    }

    /// Track a plan that joined the run after the state was created
    pub fn ensure_plan(&mut self, plan: &NodeId) {
        if !self.plans.iter().any(|p| &p.name == plan) {
            self.plans.push(PlanRunState {
                name: plan.clone(),
                status: PlanStatus::default(),
            });
        }
    }
}

/// Reset a step (and its downstream state) for `--force`
pub fn reset_step(state_file: &Path) -> Result<(), StorageError> {
    let mut state = StepState::load(state_file)?;
    state.status = StepStatus::Todo;
    state.phases.clear();
    state.save(state_file)
}

/// Steps strictly after the given one, whose state `--force`
/// invalidates
pub fn downstream_steps(step: StepKind) -> Vec<StepKind> {
    StepKind::ALL
        .into_iter()
        .skip_while(|k| *k != step)
        .skip(1)
        .collect()
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
