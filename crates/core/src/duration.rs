// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test duration parsing.
//!
//! Durations combine `d`, `h`, `m` and `s` terms (`1h 30m`) and
//! support multiplication (`2*1h`). A bare number counts seconds.

use std::time::Duration;
use thiserror::Error;

/// Errors raised for malformed duration strings
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationError {
    #[error("invalid duration '{input}': {reason}")]
    Invalid { input: String, reason: String },
}

/// Parse a duration string such as `5m`, `1h 30m` or `2*1h`.
///
/// Terms are summed; within a term, `*` factors multiply. The zero
/// duration parses successfully and means "no timeout", which the
/// engine only honors when explicitly requested.
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let invalid = |reason: &str| DurationError::Invalid {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let mut total = 0u64;
    let mut terms = 0usize;

    for term in input.split_whitespace() {
        terms += 1;
        let mut product = 1u64;
        let factors: Vec<&str> = term.split('*').collect();
        let (unit_factor, multipliers) = factors.split_last().ok_or_else(|| invalid("empty"))?;

        for multiplier in multipliers {
            let multiplier: u64 = multiplier
                .trim()
                .parse()
                .map_err(|_| invalid("multiplier must be a plain number"))?;
            product = product
                .checked_mul(multiplier)
                .ok_or_else(|| invalid("duration overflow"))?;
        }

        let unit_factor = unit_factor.trim();
        let (number, unit) = match unit_factor.find(|c: char| !c.is_ascii_digit()) {
            Some(split) => unit_factor.split_at(split),
            None => (unit_factor, ""),
        };
        let number: u64 = number
            .parse()
            .map_err(|_| invalid("expected a number before the unit"))?;
        let seconds = match unit {
            "" | "s" => number,
            "m" => number * 60,
            "h" => number * 3600,
            "d" => number * 86400,
            other => return Err(invalid(&format!("unknown unit '{other}'"))),
        };

        total = product
            .checked_mul(seconds)
            .and_then(|t| total.checked_add(t))
            .ok_or_else(|| invalid("duration overflow"))?;
    }

    if terms == 0 {
        return Err(invalid("empty"));
    }

    Ok(Duration::from_secs(total))
}

#[cfg(test)]
#[path = "duration_tests.rs"]
mod tests;
