// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level run driver.
//!
//! Resolves the run workdir, selects and materializes plans, drives
//! them sequentially through the step pipeline and reduces all
//! results into the process exit code.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::steps::{PlanRunner, PlanVerdict};
use rig_core::{MetadataSource, Node, Outcome, Plan, RunId, StepKind, TestResult};
use rig_guest::ProvisionerRegistry;
use rig_storage::{PlanStatus, RunLock, RunState, Workdir};
use std::path::PathBuf;
use std::sync::Arc;

/// How to locate (and optionally reset) the run directory
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// Explicit run directory (`--id`)
    pub id: Option<PathBuf>,
    /// Reuse the previous run (`--last`)
    pub last: bool,
    /// Purge the run directory before starting (`--scratch`)
    pub scratch: bool,
    /// Delete the workdir after a fully successful run (`--remove`)
    pub remove: bool,
    /// Cancel a previously recorded removal intent (`--keep`)
    pub keep: bool,
}

/// Everything the caller needs after a run
#[derive(Debug)]
pub struct RunSummary {
    pub run_id: RunId,
    pub run_root: PathBuf,
    pub results: Vec<TestResult>,
    /// Plans that failed before or during their steps
    pub failed_plans: usize,
}

impl RunSummary {
    /// `0` all outcomes pass or info, `1` failures, `2` errors
    pub fn exit_code(&self) -> i32 {
        if self.failed_plans > 0 {
            return 2;
        }
        if self
            .results
            .iter()
            .any(|r| r.result == Outcome::Error)
        {
            return 2;
        }
        if self.results.iter().any(|r| r.result == Outcome::Fail) {
            return 1;
        }
        if self
            .results
            .iter()
            .all(|r| matches!(r.result, Outcome::Pass | Outcome::Info))
        {
            return 0;
        }
        1
    }
}

/// Append a transcript of the finished run to `log.txt`
fn append_run_log(workdir: &Workdir, summary: &RunSummary) {
    use std::io::Write;
    let opened = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(workdir.log_file());
    let Ok(mut file) = opened else { return };
    let _ = writeln!(file, "run {} finished", summary.run_id);
    for result in &summary.results {
        let _ = writeln!(
            file,
            "{} {} (serial {}, guest {})",
            result.result.as_str(),
            result.name,
            result.serial_number,
            result.guest.name
        );
    }
    let _ = writeln!(file, "exit code {}", summary.exit_code());
}

/// Drives a whole run
pub struct Runner {
    config: Arc<EngineConfig>,
    source: Arc<dyn MetadataSource>,
    registry: Arc<ProvisionerRegistry>,
}

impl Runner {
    pub fn new(config: EngineConfig, source: Arc<dyn MetadataSource>) -> Runner {
        Runner {
            config: Arc::new(config),
            source,
            registry: Arc::new(ProvisionerRegistry::new()),
        }
    }

    pub fn with_registry(mut self, registry: ProvisionerRegistry) -> Runner {
        self.registry = Arc::new(registry);
        self
    }

    /// Execute the run
    pub async fn run(&self, request: RunRequest) -> Result<RunSummary, EngineError> {
        let (workdir, run_id) = self.resolve_workdir(&request)?;
        let _lock = RunLock::acquire(workdir.root())?;

        if request.scratch {
            workdir.scratch()?;
        }

        let plans = self.select_plans()?;
        let mut run_state = match RunState::load(&workdir.run_file())? {
            Some(state) => state,
            None => RunState::new(
                run_id.clone(),
                self.config.context.clone(),
                plans.iter().map(|(node, _)| node.id.clone()).collect(),
            ),
        };
        for (node, _) in &plans {
            run_state.ensure_plan(&node.id);
        }
        if request.remove {
            run_state.remove_on_success = true;
        }
        if request.keep {
            run_state.remove_on_success = false;
        }
        run_state.save(&workdir.run_file())?;

        tracing::info!(
            run = %run_id,
            root = %workdir.root().display(),
            plans = plans.len(),
            "run started"
        );

        let mut results = Vec::new();
        let mut failed_plans = 0;
        // Serial numbers are unique within the whole run
        let serials = rig_core::SerialAllocator::new();

        for (node, materialized) in plans {
            // A specification error aborts the affected plan before
            // provisioning; other plans still run
            let plan = match materialized {
                Ok(plan) => plan,
                Err(error) => {
                    tracing::error!(plan = %node.id, error = %error, "plan cannot be materialized");
                    run_state.set_plan_status(&node.id, PlanStatus::Failed);
                    run_state.save(&workdir.run_file())?;
                    failed_plans += 1;
                    continue;
                }
            };

            if !plan.enabled {
                // Disabled plans are skipped entirely, their workdir
                // is never created
                tracing::info!(plan = %plan.id, "plan disabled, skipping");
                run_state.set_plan_status(&plan.id, PlanStatus::Skipped);
                run_state.save(&workdir.run_file())?;
                continue;
            }

            run_state.set_plan_status(&plan.id, PlanStatus::Running);
            run_state.save(&workdir.run_file())?;

            rig_storage::atomic_write_yaml(&workdir.plan_file(&plan.id), &node.attributes)?;

            let mut plan_runner = PlanRunner::new(
                Arc::clone(&self.config),
                run_id.clone(),
                plan,
                workdir.clone(),
                Arc::clone(&self.source),
                Arc::clone(&self.registry),
                serials.clone(),
            )?;

            let verdict = plan_runner.execute().await?;
            results.extend(plan_runner.results());

            let status = match verdict {
                PlanVerdict::Completed => PlanStatus::Done,
                PlanVerdict::Failed => {
                    failed_plans += 1;
                    PlanStatus::Failed
                }
            };
            run_state.set_plan_status(&plan_runner.plan.id, status);
            run_state.save(&workdir.run_file())?;
        }

        let summary = RunSummary {
            run_id,
            run_root: workdir.root().to_path_buf(),
            results,
            failed_plans,
        };
        append_run_log(&workdir, &summary);

        if run_state.remove_on_success && summary.exit_code() == 0 {
            tracing::info!(run = %summary.run_id, "removing workdir");
            workdir.remove()?;
        }

        Ok(summary)
    }

    fn resolve_workdir(&self, request: &RunRequest) -> Result<(Workdir, RunId), EngineError> {
        if let Some(id) = &request.id {
            let run_id = id
                .file_name()
                .and_then(|n| n.to_str())
                .map(RunId::new)
                .ok_or_else(|| {
                    EngineError::Specification(format!("invalid run id path: {}", id.display()))
                })?;
            return Ok((Workdir::open(id.clone())?, run_id));
        }
        if request.last {
            let path = Workdir::last(&self.config.workdir_root).ok_or_else(|| {
                EngineError::Specification("no previous run found for --last".to_string())
            })?;
            let run_id = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(RunId::new)
                .unwrap_or_else(RunId::generate);
            return Ok((Workdir::open(path)?, run_id));
        }
        let run_id = RunId::generate();
        Ok((Workdir::create(&self.config.workdir_root, &run_id)?, run_id))
    }

    /// Materialize every selected plan.
    ///
    /// A node counts as a plan when it configures at least one step.
    /// Specification errors surface here, per plan, before any
    /// provisioning.
    #[allow(clippy::type_complexity)]
    fn select_plans(&self) -> Result<Vec<(Node, Result<Plan, EngineError>)>, EngineError> {
        let filter = rig_core::SelectFilter::by_names(self.config.plan_names.clone());
        let mut plans = Vec::new();
        for node in self.source.select(&filter)? {
            let is_plan = StepKind::ALL
                .iter()
                .any(|kind| node.get(kind.as_str()).is_some());
            if !is_plan {
                continue;
            }
            let plan = Plan::from_node(&node, &self.config.context).map_err(EngineError::from);
            plans.push((node, plan));
        }
        Ok(plans)
    }
}
