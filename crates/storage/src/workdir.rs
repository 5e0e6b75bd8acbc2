// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic on-disk layout of a run.
//!
//! ```text
//! <run-root>/
//!   run.yaml
//!   <plan-id-path>/
//!     plan.yaml
//!     provision/guests.yaml
//!     discover/tests.yaml
//!     execute/results.yaml
//!     execute/data/guest/<name>/<test>-<serial>/
//!   log.txt
//! ```

use crate::atomic::StorageError;
use rig_core::{NodeId, RunId, StepKind};
use std::fs;
use std::path::{Path, PathBuf};

/// Marker file under the workdir root pointing at the last run
const LATEST_MARKER: &str = ".latest";

/// Path helpers for one run's on-disk tree
#[derive(Debug, Clone)]
pub struct Workdir {
    root: PathBuf,
}

impl Workdir {
    /// Open (or lay out) the workdir for a run under the given root
    pub fn create(workdir_root: &Path, run_id: &RunId) -> Result<Workdir, StorageError> {
        let root = workdir_root.join(run_id.as_str());
        fs::create_dir_all(&root).map_err(|e| StorageError::io(&root, e))?;

        // Remember the last run for `--last`
        let marker = workdir_root.join(LATEST_MARKER);
        let _ = fs::write(&marker, root.display().to_string());

        Ok(Workdir { root })
    }

    /// Open an explicit run directory (`--id <path>`)
    pub fn open(root: PathBuf) -> Result<Workdir, StorageError> {
        fs::create_dir_all(&root).map_err(|e| StorageError::io(&root, e))?;
        Ok(Workdir { root })
    }

    /// The run directory recorded by the previous invocation
    pub fn last(workdir_root: &Path) -> Option<PathBuf> {
        let marker = workdir_root.join(LATEST_MARKER);
        let content = fs::read_to_string(marker).ok()?;
        let path = PathBuf::from(content.trim());
        path.is_dir().then_some(path)
    }

    /// Remove all run content, keeping the directory (`--scratch`)
    pub fn scratch(&self) -> Result<(), StorageError> {
        for entry in fs::read_dir(&self.root).map_err(|e| StorageError::io(&self.root, e))? {
            let entry = entry.map_err(|e| StorageError::io(&self.root, e))?;
            let path = entry.path();
            let removed = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            removed.map_err(|e| StorageError::io(&path, e))?;
        }
        Ok(())
    }

    /// Delete the whole run directory (`--remove` finalization)
    pub fn remove(self) -> Result<(), StorageError> {
        fs::remove_dir_all(&self.root).map_err(|e| StorageError::io(&self.root, e))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn run_file(&self) -> PathBuf {
        self.root.join("run.yaml")
    }

    pub fn log_file(&self) -> PathBuf {
        self.root.join("log.txt")
    }

    pub fn plan_dir(&self, plan: &NodeId) -> PathBuf {
        self.root.join(plan.as_path_component())
    }

    pub fn plan_file(&self, plan: &NodeId) -> PathBuf {
        self.plan_dir(plan).join("plan.yaml")
    }

    pub fn step_dir(&self, plan: &NodeId, step: StepKind) -> PathBuf {
        self.plan_dir(plan).join(step.as_str())
    }

    pub fn step_state_file(&self, plan: &NodeId, step: StepKind) -> PathBuf {
        self.step_dir(plan, step).join("step.yaml")
    }

    pub fn guests_file(&self, plan: &NodeId) -> PathBuf {
        self.step_dir(plan, StepKind::Provision).join("guests.yaml")
    }

    pub fn tests_file(&self, plan: &NodeId) -> PathBuf {
        self.step_dir(plan, StepKind::Discover).join("tests.yaml")
    }

    pub fn results_file(&self, plan: &NodeId) -> PathBuf {
        self.step_dir(plan, StepKind::Execute).join("results.yaml")
    }

    pub fn failures_file(&self, plan: &NodeId) -> PathBuf {
        self.step_dir(plan, StepKind::Execute).join("failures.yaml")
    }

    /// Plan-wide data directory exposed as `TMT_PLAN_DATA`
    pub fn plan_data_dir(&self, plan: &NodeId) -> PathBuf {
        self.plan_dir(plan).join("data")
    }

    /// Per-invocation directory under the execute step
    pub fn invocation_dir(&self, plan: &NodeId, guest: &str, data_dir_name: &str) -> PathBuf {
        self.step_dir(plan, StepKind::Execute)
            .join("data/guest")
            .join(guest)
            .join(data_dir_name)
    }

    /// Where tests write their own artifacts (`TMT_TEST_DATA`)
    pub fn test_data_dir(&self, plan: &NodeId, guest: &str, data_dir_name: &str) -> PathBuf {
        self.invocation_dir(plan, guest, data_dir_name).join("data")
    }
}

#[cfg(test)]
#[path = "workdir_tests.rs"]
mod tests;
