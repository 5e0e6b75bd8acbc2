// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subresult harvest.
//!
//! After a test exits, the invoker inspects the test data directory
//! for results the test reported on its own: `tmt-report-result`
//! entries for shell tests, the journal for beakerlib ones. The
//! parent outcome is reduced from subresults for shell tests, taken
//! from the journal verdict for beakerlib, and `result: restraint`
//! turns every reported entry into an independent result.

use rig_core::{Outcome, ResultInterpret, SubResult, TestInvocation, TestResult};
use rig_guest::scripts::REPORT_RESULTS_FILENAME;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// One entry appended by `tmt-report-result`
#[derive(Debug, Clone, Deserialize)]
struct ReportedResult {
    name: String,
    result: String,
    #[serde(default)]
    log: Vec<PathBuf>,
}

/// What the harvest found
#[derive(Debug, Default)]
pub struct Harvest {
    /// Raw parent outcome before interpretation
    pub outcome: Option<Outcome>,
    pub subresults: Vec<SubResult>,
    /// Independent results produced under the restraint policy
    pub independent: Vec<TestResult>,
    pub notes: Vec<String>,
}

fn parse_outcome(value: &str) -> Outcome {
    match value.to_lowercase().as_str() {
        "pass" => Outcome::Pass,
        "fail" => Outcome::Fail,
        "info" => Outcome::Info,
        "warn" | "warning" => Outcome::Warn,
        "skip" => Outcome::Skip,
        _ => Outcome::Error,
    }
}

fn reported_results(data_dir: &Path) -> Vec<ReportedResult> {
    let path = data_dir.join(REPORT_RESULTS_FILENAME);
    let Ok(content) = std::fs::read_to_string(&path) else {
        return Vec::new();
    };
    serde_yaml::from_str(&content).unwrap_or_default()
}

/// Harvest a shell test: reported entries become subresults and the
/// parent outcome is their priority reduction; without any entries
/// the exit code decides
pub fn harvest_shell(
    invocation: &TestInvocation,
    exit_code: i32,
    data_dir: &Path,
) -> Harvest {
    let mut harvest = Harvest::default();
    let reported = reported_results(data_dir);

    if invocation.test.result == ResultInterpret::Restraint {
        for entry in reported {
            let mut result = TestResult::pending(
                format!("{}/{}", invocation.test.name, entry.name.trim_start_matches('/')),
                invocation.serial_number,
                invocation.guest.clone(),
            );
            result.result = parse_outcome(&entry.result);
            result.original_result = Some(result.result);
            result.log = entry.log;
            harvest.independent.push(result);
        }
        harvest.outcome = Some(Outcome::from_exit_code(exit_code));
        return harvest;
    }

    if reported.is_empty() {
        harvest.outcome = Some(Outcome::from_exit_code(exit_code));
        return harvest;
    }

    for entry in &reported {
        harvest.subresults.push(SubResult {
            name: entry.name.clone(),
            result: parse_outcome(&entry.result),
            original_result: None,
            note: Vec::new(),
            log: entry.log.clone(),
            check: Vec::new(),
        });
    }

    let reduced = Outcome::reduce(harvest.subresults.iter().map(|s| s.result))
        .unwrap_or_else(|| Outcome::from_exit_code(exit_code));
    harvest.notes.push(format!(
        "reduced from {} subresults",
        harvest.subresults.len()
    ));
    harvest.outcome = Some(reduced);
    harvest
}

/// Harvest a beakerlib test: phases become subresults, the journal
/// verdict decides the parent outcome
pub fn harvest_beakerlib(data_dir: &Path) -> Harvest {
    let mut harvest = Harvest::default();
    let beakerlib_dir = data_dir.join("beakerlib");

    // Overall verdict from the TestResults state file
    let results_file = beakerlib_dir.join("TestResults");
    let verdict = std::fs::read_to_string(&results_file)
        .ok()
        .and_then(|content| {
            content.lines().find_map(|line| {
                let line = line.trim().trim_start_matches("export ");
                line.strip_prefix("TESTRESULT_RESULT_STRING=")
                    .map(|value| parse_outcome(value.trim_matches('"')))
            })
        });

    match verdict {
        Some(outcome) => harvest.outcome = Some(outcome),
        None => {
            harvest.outcome = Some(Outcome::Error);
            harvest
                .notes
                .push("beakerlib results file not found".to_string());
            return harvest;
        }
    }

    // Phase results from the journal
    if let Ok(journal) = std::fs::read_to_string(beakerlib_dir.join("journal.txt")) {
        for line in journal.lines() {
            if let Some(subresult) = parse_journal_phase(line) {
                harvest.subresults.push(subresult);
            }
        }
    }

    harvest
}

/// Parse a journal phase line such as
/// `:: [   PASS   ] :: Setup phase`
fn parse_journal_phase(line: &str) -> Option<SubResult> {
    let rest = line.trim().strip_prefix("::")?.trim();
    let rest = rest.strip_prefix('[')?;
    let (verdict, rest) = rest.split_once(']')?;
    let name = rest.trim().strip_prefix("::")?.trim();
    let verdict = verdict.trim();
    if name.is_empty() || !matches!(verdict, "PASS" | "FAIL" | "WARN" | "SKIP" | "INFO") {
        return None;
    }
    Some(SubResult {
        name: name.to_string(),
        result: parse_outcome(verdict),
        original_result: None,
        note: Vec::new(),
        log: Vec::new(),
        check: Vec::new(),
    })
}

#[cfg(test)]
#[path = "harvest_tests.rs"]
mod tests;
