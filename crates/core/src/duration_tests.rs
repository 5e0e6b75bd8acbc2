// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    seconds = { "30s", 30 },
    bare_number = { "45", 45 },
    minutes = { "5m", 300 },
    hours = { "1h", 3600 },
    days = { "2d", 172_800 },
    combined = { "1h 30m", 5400 },
    multiplied = { "2*1h", 7200 },
    chained_multipliers = { "3*2*10s", 60 },
    multiplied_plus_term = { "2*5m 30s", 630 },
    zero = { "0", 0 },
)]
fn parses(input: &str, expected_seconds: u64) {
    assert_eq!(
        parse_duration(input).unwrap(),
        Duration::from_secs(expected_seconds),
        "{input}"
    );
}

#[parameterized(
    empty = { "" },
    blank = { "   " },
    unknown_unit = { "5q" },
    missing_number = { "h" },
    fraction_multiplier = { "1.5*1h" },
    unit_in_multiplier = { "2h*3" },
)]
fn rejects(input: &str) {
    assert!(parse_duration(input).is_err(), "{input}");
}
