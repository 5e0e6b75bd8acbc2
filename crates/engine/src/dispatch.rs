// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Multi-guest dispatcher.
//!
//! Runs one phase across its selected guests: serially for a single
//! guest or a `sequential` phase, concurrently otherwise. The
//! dispatcher always waits for every instance before returning,
//! which is the phase-level barrier: phase n+1 starts on no guest
//! until phase n finished on all of them.

use crate::cancel::CancelToken;
use crate::error::EngineError;
use std::future::Future;
use tokio::task::JoinSet;

/// Outcome of one phase instance on one guest
#[derive(Debug)]
pub struct InstanceOutcome {
    pub guest: String,
    pub result: Result<(), EngineError>,
}

/// Execute `run` once per item, respecting the barrier.
///
/// A failing instance cancels its in-flight peers through the token;
/// the dispatcher still joins every task. Outcomes are returned in
/// completion order for the concurrent path and in item order for
/// the serial one.
pub async fn fan_out<T, F, Fut>(
    items: Vec<(String, T)>,
    sequential: bool,
    cancel: &CancelToken,
    run: F,
) -> Vec<InstanceOutcome>
where
    T: Send + 'static,
    F: Fn(T, CancelToken) -> Fut,
    Fut: Future<Output = Result<(), EngineError>> + Send + 'static,
{
    let mut outcomes = Vec::with_capacity(items.len());

    if sequential || items.len() <= 1 {
        for (guest, item) in items {
            if cancel.is_cancelled() {
                outcomes.push(InstanceOutcome {
                    guest,
                    result: Err(EngineError::Internal("cancelled".to_string())),
                });
                continue;
            }
            let result = run(item, cancel.clone()).await;
            if result.is_err() {
                cancel.cancel();
            }
            outcomes.push(InstanceOutcome { guest, result });
        }
        return outcomes;
    }

    let mut tasks: JoinSet<InstanceOutcome> = JoinSet::new();
    for (guest, item) in items {
        let future = run(item, cancel.clone());
        tasks.spawn(async move {
            InstanceOutcome {
                guest,
                result: future.await,
            }
        });
    }

    // Barrier: join every instance, success or failure
    while let Some(joined) = tasks.join_next().await {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(join_error) => InstanceOutcome {
                guest: String::new(),
                result: Err(EngineError::Internal(format!(
                    "phase instance panicked: {join_error}"
                ))),
            },
        };
        if outcome.result.is_err() {
            cancel.cancel();
        }
        outcomes.push(outcome);
    }

    outcomes
}

/// First error among the outcomes, if any
pub fn first_error(outcomes: Vec<InstanceOutcome>) -> Result<(), EngineError> {
    for outcome in outcomes {
        outcome.result?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
