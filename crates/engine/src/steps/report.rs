// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Report step: feed finalized results to the configured sinks.
//!
//! Always runs, even after an interrupted execute, so partial
//! results stay visible. Sink failures are logged and swallowed.

use super::PlanRunner;
use crate::error::EngineError;
use crate::report::sink_for;
use rig_core::StepKind;
use rig_storage::StepState;
use std::path::Path;

pub(crate) async fn run(
    runner: &mut PlanRunner,
    state: &mut StepState,
    state_file: &Path,
) -> Result<(), EngineError> {
    let results = runner.results();
    let report_dir = runner.workdir.step_dir(&runner.plan.id, StepKind::Report);
    std::fs::create_dir_all(&report_dir)
        .map_err(|e| EngineError::Internal(format!("report dir: {e}")))?;

    for phase in runner.selected_phases(StepKind::Report)? {
        if state.phase_done(&phase.name) {
            continue;
        }

        match sink_for(&phase.how) {
            Some(sink) => {
                if let Err(error) = sink.report(&runner.plan.id, &results, &report_dir) {
                    tracing::warn!(
                        plan = %runner.plan.id,
                        sink = sink.how(),
                        error = %error,
                        "report sink failed"
                    );
                }
            }
            None => {
                tracing::warn!(
                    plan = %runner.plan.id,
                    how = phase.how,
                    "no such report sink"
                );
            }
        }

        state.mark_phase_done(&phase.name);
        state.save(state_file)?;
    }

    Ok(())
}
