// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Finish step: finalization phases plus guest release.
//!
//! Runs best-effort after failures. Guests are released even when a
//! finish phase fails, tearing down connection masters so nothing
//! keeps logins alive after the run.

use super::{prepare, PlanRunner};
use crate::error::EngineError;
use rig_core::StepKind;
use rig_storage::StepState;
use std::path::Path;

pub(crate) async fn run(
    runner: &mut PlanRunner,
    state: &mut StepState,
    state_file: &Path,
) -> Result<(), EngineError> {
    let phases_result =
        prepare::run_shell_phases(runner, StepKind::Finish, state, state_file).await;

    // Release guests no matter how the phases went
    for guest in runner.guests.drain(..) {
        if let Err(error) = guest.release().await {
            tracing::warn!(guest = guest.name(), error = %error, "release failed");
        } else {
            tracing::debug!(guest = guest.name(), "guest released");
        }
    }

    phases_result
}
