// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Report sinks.
//!
//! A sink consumes the finalized, ordered result list of one plan.
//! Reporting is best-effort: a failing sink is logged and never
//! changes any result outcome.

use crate::error::EngineError;
use rig_core::{NodeId, Outcome, TestResult};
use rig_storage::atomic::atomic_write_yaml;
use std::path::Path;

/// Consumes a finalized result stream
pub trait ReportSink: Send + Sync {
    fn how(&self) -> &'static str;

    fn report(
        &self,
        plan: &NodeId,
        results: &[TestResult],
        report_dir: &Path,
    ) -> Result<(), EngineError>;
}

/// Built-in sink for a `how` value
pub fn sink_for(how: &str) -> Option<Box<dyn ReportSink>> {
    match how {
        "display" => Some(Box::new(DisplaySink)),
        "yaml" => Some(Box::new(YamlSink)),
        _ => None,
    }
}

/// Log a one-line verdict per result plus a summary
pub struct DisplaySink;

impl ReportSink for DisplaySink {
    fn how(&self) -> &'static str {
        "display"
    }

    fn report(
        &self,
        plan: &NodeId,
        results: &[TestResult],
        _report_dir: &Path,
    ) -> Result<(), EngineError> {
        for result in results {
            tracing::info!(
                plan = %plan,
                test = result.name,
                guest = result.guest.name,
                outcome = result.result.as_str(),
                "result"
            );
        }

        let total = results.len();
        let passed = results
            .iter()
            .filter(|r| r.result == Outcome::Pass)
            .count();
        let failed = results
            .iter()
            .filter(|r| matches!(r.result, Outcome::Fail | Outcome::Error))
            .count();
        tracing::info!(plan = %plan, total, passed, failed, "plan summary");
        Ok(())
    }
}

/// Write the finalized results as one YAML document
pub struct YamlSink;

impl ReportSink for YamlSink {
    fn how(&self) -> &'static str {
        "yaml"
    }

    fn report(
        &self,
        _plan: &NodeId,
        results: &[TestResult],
        report_dir: &Path,
    ) -> Result<(), EngineError> {
        atomic_write_yaml(&report_dir.join("results.yaml"), &results)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
