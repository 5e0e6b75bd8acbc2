// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test results, subresults and checks.
//!
//! One [`TestResult`] exists per (invocation, guest) pair. Results are
//! created with the transient `pending` outcome at discover time and
//! mutated in place as execution progresses; the storage layer
//! persists after every mutation.

use crate::context::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Outcome of a test, subresult or check.
///
/// Reduction order, low to high:
/// `skip < info < pass < warn < fail < error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Not yet executed; written at discover time
    Pending,
    Skip,
    Info,
    Pass,
    Warn,
    Fail,
    Error,
}

impl Outcome {
    fn priority(self) -> u8 {
        match self {
            Outcome::Pending => 0,
            Outcome::Skip => 1,
            Outcome::Info => 2,
            Outcome::Pass => 3,
            Outcome::Warn => 4,
            Outcome::Fail => 5,
            Outcome::Error => 6,
        }
    }

    /// Reduce a set of outcomes to the most severe one
    pub fn reduce(outcomes: impl IntoIterator<Item = Outcome>) -> Option<Outcome> {
        outcomes.into_iter().max_by_key(|o| o.priority())
    }

    /// Shell framework policy: exit 0 passes, anything else fails
    pub fn from_exit_code(code: i32) -> Outcome {
        if code == 0 {
            Outcome::Pass
        } else {
            Outcome::Fail
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Pending => "pending",
            Outcome::Skip => "skip",
            Outcome::Info => "info",
            Outcome::Pass => "pass",
            Outcome::Warn => "warn",
            Outcome::Fail => "fail",
            Outcome::Error => "error",
        }
    }
}

/// How a raw test outcome is interpreted into the effective one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultInterpret {
    #[default]
    Respect,
    Xfail,
    Info,
    /// Outcome comes verbatim from the results file the test wrote
    Custom,
    /// Every reported entry becomes an independent result
    Restraint,
}

/// Interpretation of a check outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckInterpret {
    #[default]
    Respect,
    Xfail,
    Info,
}

/// When a check runs relative to the test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckEvent {
    BeforeTest,
    AfterTest,
}

/// Configured check attached to a test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CheckSpec {
    pub how: String,
    #[serde(default)]
    pub result: CheckInterpret,
}

/// Recorded observation of one check event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CheckResult {
    pub how: String,
    pub event: CheckEvent,
    pub result: Outcome,
    #[serde(default)]
    pub interpret: CheckInterpret,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub note: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub log: Vec<PathBuf>,
}

/// Guest a result was produced on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestIdentity {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Nested result produced inside a test (report-result call, or a
/// beakerlib phase)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SubResult {
    pub name: String,
    pub result: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_result: Option<Outcome>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub note: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub log: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub check: Vec<CheckResult>,
}

/// One result per (invocation, guest)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestResult {
    pub name: String,
    pub serial_number: u64,
    pub guest: GuestIdentity,
    pub result: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_result: Option<Outcome>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub note: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub log: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ids: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Wall-clock duration as `hh:mm:ss`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Context::is_empty")]
    pub context: Context,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub check: Vec<CheckResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subresult: Vec<SubResult>,
}

impl TestResult {
    /// Fresh pending result, as written at discover time
    pub fn pending(name: impl Into<String>, serial_number: u64, guest: GuestIdentity) -> Self {
        Self {
            name: name.into(),
            serial_number,
            guest,
            result: Outcome::Pending,
            original_result: None,
            note: Vec::new(),
            log: Vec::new(),
            ids: BTreeMap::new(),
            start_time: None,
            end_time: None,
            duration: None,
            context: Context::default(),
            data_path: None,
            check: Vec::new(),
            subresult: Vec::new(),
        }
    }

    /// Store key: results never collide across names, serials or
    /// guests (restraint results share a serial but carry their own
    /// names)
    pub fn key(&self) -> (String, u64, String) {
        (
            self.name.clone(),
            self.serial_number,
            self.guest.name.clone(),
        )
    }

    /// Record start/end times and the formatted duration
    pub fn set_times(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) {
        self.start_time = Some(start);
        self.end_time = Some(end);
        let seconds = (end - start).num_seconds().max(0);
        self.duration = Some(format_duration(seconds as u64));
    }

    /// Apply the interpretation policy and check outcomes.
    ///
    /// Sets `original_result` to the raw outcome and `result` to the
    /// effective one; explanatory notes are appended.
    pub fn interpret(&mut self, policy: ResultInterpret) {
        let original = self.result;
        self.original_result = Some(original);

        let (effective, mut notes) = interpret_outcome(original, policy);
        let (effective, check_notes) = fold_checks(effective, &self.check);
        notes.extend(check_notes);

        self.result = effective;
        self.note.extend(notes);
    }
}

/// `hh:mm:ss` rendering used by result records
pub fn format_duration(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

fn interpret_outcome(original: Outcome, policy: ResultInterpret) -> (Outcome, Vec<String>) {
    match policy {
        ResultInterpret::Respect | ResultInterpret::Custom | ResultInterpret::Restraint => {
            (original, Vec::new())
        }
        ResultInterpret::Info => (
            Outcome::Info,
            vec!["test result overridden: info".to_string()],
        ),
        ResultInterpret::Xfail => match original {
            Outcome::Pass => (
                Outcome::Fail,
                vec!["test was expected to fail".to_string()],
            ),
            Outcome::Fail => (Outcome::Pass, vec!["test failed as expected".to_string()]),
            other => (other, Vec::new()),
        },
    }
}

/// Fold check outcomes into the effective test outcome
fn fold_checks(outcome: Outcome, checks: &[CheckResult]) -> (Outcome, Vec<String>) {
    let mut effective = outcome;
    let mut notes = Vec::new();

    for check in checks {
        match check.interpret {
            CheckInterpret::Respect => {
                if matches!(check.result, Outcome::Fail | Outcome::Error) {
                    notes.push(format!("check '{}' failed", check.how));
                    effective = Outcome::reduce([effective, check.result]).unwrap_or(effective);
                }
            }
            CheckInterpret::Xfail => match check.result {
                Outcome::Pass => {
                    notes.push(format!("check '{}' was expected to fail", check.how));
                    effective = Outcome::reduce([effective, Outcome::Fail]).unwrap_or(effective);
                }
                Outcome::Fail => {
                    notes.push(format!("check '{}' failed as expected", check.how));
                }
                _ => {}
            },
            CheckInterpret::Info => {
                notes.push(format!("check '{}': {}", check.how, check.result.as_str()));
            }
        }
    }

    (effective, notes)
}

/// Merge a partial rerun into prior results.
///
/// Every (test, serial, guest) key present in `new` replaces the old
/// entry; all other old entries are preserved in their original
/// order, with fresh keys appended in `new` order.
pub fn merge_results(old: &[TestResult], new: &[TestResult]) -> Vec<TestResult> {
    let mut merged: Vec<TestResult> = Vec::with_capacity(old.len() + new.len());
    let mut consumed = vec![false; new.len()];

    for previous in old {
        match new
            .iter()
            .position(|candidate| candidate.key() == previous.key())
        {
            Some(index) => {
                consumed[index] = true;
                merged.push(new[index].clone());
            }
            None => merged.push(previous.clone()),
        }
    }

    for (index, candidate) in new.iter().enumerate() {
        if !consumed[index] {
            merged.push(candidate.clone());
        }
    }

    merged
}

#[cfg(test)]
#[path = "result_tests.rs"]
mod tests;
