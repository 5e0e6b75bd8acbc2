// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn result(name: &str, serial: u64, guest: &str, outcome: Outcome) -> TestResult {
    let mut result = TestResult::pending(
        name,
        serial,
        GuestIdentity {
            name: guest.to_string(),
            role: None,
        },
    );
    result.result = outcome;
    result
}

#[test]
fn reduction_priority() {
    assert_eq!(
        Outcome::reduce([Outcome::Pass, Outcome::Skip, Outcome::Info]),
        Some(Outcome::Pass)
    );
    assert_eq!(
        Outcome::reduce([Outcome::Pass, Outcome::Fail, Outcome::Warn]),
        Some(Outcome::Fail)
    );
    assert_eq!(
        Outcome::reduce([Outcome::Fail, Outcome::Error]),
        Some(Outcome::Error)
    );
    assert_eq!(Outcome::reduce([]), None);
}

#[parameterized(
    respect_pass = { ResultInterpret::Respect, Outcome::Pass, Outcome::Pass },
    respect_fail = { ResultInterpret::Respect, Outcome::Fail, Outcome::Fail },
    xfail_flips_fail = { ResultInterpret::Xfail, Outcome::Fail, Outcome::Pass },
    xfail_flips_pass = { ResultInterpret::Xfail, Outcome::Pass, Outcome::Fail },
    xfail_keeps_error = { ResultInterpret::Xfail, Outcome::Error, Outcome::Error },
    info_demotes = { ResultInterpret::Info, Outcome::Fail, Outcome::Info },
)]
fn interpretation(policy: ResultInterpret, raw: Outcome, expected: Outcome) {
    let mut result = result("/t", 1, "default-0", raw);
    result.interpret(policy);
    assert_eq!(result.result, expected);
    assert_eq!(result.original_result, Some(raw));
}

#[test]
fn respected_check_failure_raises_outcome() {
    let mut result = result("/t", 1, "default-0", Outcome::Pass);
    result.check.push(CheckResult {
        how: "dmesg".to_string(),
        event: CheckEvent::AfterTest,
        result: Outcome::Fail,
        interpret: CheckInterpret::Respect,
        note: Vec::new(),
        log: Vec::new(),
    });

    result.interpret(ResultInterpret::Respect);
    assert_eq!(result.result, Outcome::Fail);
    assert_eq!(result.original_result, Some(Outcome::Pass));
    assert!(result.note.iter().any(|n| n.contains("dmesg")));
}

#[test]
fn info_check_only_annotates() {
    let mut result = result("/t", 1, "default-0", Outcome::Pass);
    result.check.push(CheckResult {
        how: "avc".to_string(),
        event: CheckEvent::AfterTest,
        result: Outcome::Fail,
        interpret: CheckInterpret::Info,
        note: Vec::new(),
        log: Vec::new(),
    });

    result.interpret(ResultInterpret::Respect);
    assert_eq!(result.result, Outcome::Pass);
    assert!(result.note.iter().any(|n| n.contains("avc")));
}

#[test]
fn xfail_check_expects_failure() {
    let mut result = result("/t", 1, "default-0", Outcome::Pass);
    result.check.push(CheckResult {
        how: "coredump".to_string(),
        event: CheckEvent::AfterTest,
        result: Outcome::Pass,
        interpret: CheckInterpret::Xfail,
        note: Vec::new(),
        log: Vec::new(),
    });

    result.interpret(ResultInterpret::Respect);
    assert_eq!(result.result, Outcome::Fail);
}

#[test]
fn merge_replaces_matching_keys_only() {
    let old = vec![
        result("/a", 1, "default-0", Outcome::Pass),
        result("/b", 2, "default-0", Outcome::Fail),
        result("/c", 3, "default-0", Outcome::Error),
    ];
    let new = vec![
        result("/b", 2, "default-0", Outcome::Pass),
        result("/c", 3, "default-0", Outcome::Pass),
    ];

    let merged = merge_results(&old, &new);
    assert_eq!(merged.len(), 3);
    assert_eq!(merged[0], old[0]);
    assert_eq!(merged[1].result, Outcome::Pass);
    assert_eq!(merged[2].result, Outcome::Pass);
}

#[test]
fn merge_keeps_distinct_guests_apart() {
    let old = vec![
        result("/a", 1, "server", Outcome::Pass),
        result("/a", 1, "client", Outcome::Fail),
    ];
    let new = vec![result("/a", 1, "client", Outcome::Pass)];

    let merged = merge_results(&old, &new);
    assert_eq!(merged[0].guest.name, "server");
    assert_eq!(merged[0].result, Outcome::Pass);
    assert_eq!(merged[1].guest.name, "client");
    assert_eq!(merged[1].result, Outcome::Pass);
}

#[test]
fn merge_appends_new_keys() {
    let old = vec![result("/a", 1, "default-0", Outcome::Pass)];
    let new = vec![result("/b", 2, "default-0", Outcome::Pass)];

    let merged = merge_results(&old, &new);
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[1].name, "/b");
}

#[test]
fn duration_formatting() {
    assert_eq!(format_duration(0), "00:00:00");
    assert_eq!(format_duration(61), "00:01:01");
    assert_eq!(format_duration(3723), "01:02:03");
}

#[test]
fn yaml_round_trip_uses_kebab_keys() {
    let mut record = result("/t", 4, "default-0", Outcome::Pass);
    record.original_result = Some(Outcome::Pass);
    record.duration = Some("00:00:01".to_string());

    let yaml = serde_yaml::to_string(&record).unwrap();
    assert!(yaml.contains("serial-number: 4"));
    assert!(yaml.contains("original-result: pass"));

    let back: TestResult = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(back, record);
}

#[test]
fn pending_results_serialize_without_logs() {
    let record = TestResult::pending("/t", 1, GuestIdentity::default());
    let yaml = serde_yaml::to_string(&record).unwrap();
    assert!(yaml.contains("result: pending"));
    assert!(!yaml.contains("log:"));
}
