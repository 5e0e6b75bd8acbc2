// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Check execution.
//!
//! Checks observe the guest around a test: every `before-test` check
//! runs before the invocation, every `after-test` one after it, and
//! their outcomes are folded into the test result according to each
//! check's interpretation policy.

use rig_core::{CheckEvent, CheckResult, CheckSpec, Outcome};
use rig_guest::{Guest, RunOptions};
use std::path::Path;

/// Kernel log patterns that fail the dmesg check
const DMESG_FAILURE_PATTERNS: &[&str] = &["Call Trace", "Oops", "BUG:", "panic"];

/// Run all checks for one event, storing their logs under
/// `checks_dir`
pub async fn run_checks(
    specs: &[CheckSpec],
    event: CheckEvent,
    guest: &dyn Guest,
    checks_dir: &Path,
) -> Vec<CheckResult> {
    let mut results = Vec::new();
    for spec in specs {
        results.push(run_check(spec, event, guest, checks_dir).await);
    }
    results
}

async fn run_check(
    spec: &CheckSpec,
    event: CheckEvent,
    guest: &dyn Guest,
    checks_dir: &Path,
) -> CheckResult {
    let mut result = CheckResult {
        how: spec.how.clone(),
        event,
        result: Outcome::Skip,
        interpret: spec.result,
        note: Vec::new(),
        log: Vec::new(),
    };

    match spec.how.as_str() {
        "dmesg" => run_dmesg(&mut result, event, guest, checks_dir).await,
        other => {
            result.note.push(format!("unknown check '{other}'"));
        }
    }

    result
}

/// Capture the kernel log and scan it for failure patterns
async fn run_dmesg(
    result: &mut CheckResult,
    event: CheckEvent,
    guest: &dyn Guest,
    checks_dir: &Path,
) {
    let output = match guest.run("dmesg 2>/dev/null | tail -n 500", &RunOptions::default()).await
    {
        Ok(output) => output,
        Err(error) => {
            result.result = Outcome::Error;
            result.note.push(format!("dmesg capture failed: {error}"));
            return;
        }
    };

    if !output.success() {
        // Unprivileged guests cannot read the kernel log
        result.result = Outcome::Skip;
        result.note.push("kernel log not accessible".to_string());
        return;
    }

    let event_name = match event {
        CheckEvent::BeforeTest => "before-test",
        CheckEvent::AfterTest => "after-test",
    };
    let log_name = format!("dmesg-{event_name}.txt");
    if std::fs::create_dir_all(checks_dir).is_ok()
        && std::fs::write(checks_dir.join(&log_name), &output.stdout).is_ok()
    {
        result.log.push(Path::new("checks").join(log_name));
    }

    let hit = DMESG_FAILURE_PATTERNS
        .iter()
        .find(|pattern| output.stdout.contains(**pattern));
    match hit {
        Some(pattern) => {
            result.result = Outcome::Fail;
            result.note.push(format!("kernel log contains '{pattern}'"));
        }
        None => result.result = Outcome::Pass,
    }
}

#[cfg(test)]
#[path = "checks_tests.rs"]
mod tests;
