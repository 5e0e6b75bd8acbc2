// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adjust entries: context-driven metadata mutation.
//!
//! An adjust entry carries a `when` rule plus attribute overrides.
//! Matching entries are folded into the node in order; a key replaces
//! the previous value unless it carries the `+` suffix, which merges
//! (lists append, mappings deep-merge, strings concatenate).

use super::rule::any_matches;
use super::{Context, Rule, RuleError};
use serde_yaml::{Mapping, Value};

/// One entry of a node's `adjust` attribute
#[derive(Debug, Clone, PartialEq)]
pub struct AdjustEntry {
    /// Rules deciding whether the entry applies
    pub when: Vec<Rule>,
    /// Free-form documentation of the adjustment
    pub because: Option<String>,
    /// Stop processing further entries once this one applied
    pub continue_: bool,
    /// Attribute overrides merged into the node
    pub overrides: Mapping,
}

impl AdjustEntry {
    /// Parse one adjust entry from its YAML mapping
    pub fn from_value(value: &Value) -> Result<Self, RuleError> {
        let mapping = value.as_mapping().cloned().unwrap_or_default();
        let mut when = Vec::new();
        let mut because = None;
        let mut continue_ = true;
        let mut overrides = Mapping::new();

        for (key, value) in mapping {
            match key.as_str() {
                Some("when") => match value {
                    Value::String(rule) => when.push(Rule::parse(&rule)?),
                    Value::Sequence(rules) => {
                        for rule in rules {
                            if let Some(rule) = rule.as_str() {
                                when.push(Rule::parse(rule)?);
                            }
                        }
                    }
                    _ => {}
                },
                Some("because") => because = value.as_str().map(str::to_string),
                Some("continue") => continue_ = value.as_bool().unwrap_or(true),
                _ => {
                    overrides.insert(key, value);
                }
            }
        }

        Ok(Self {
            when,
            because,
            continue_,
            overrides,
        })
    }
}

/// Apply adjust entries to node attributes.
///
/// Pure with respect to the context: applying the result again with
/// the same context yields the same attributes.
pub fn apply_adjust(
    attributes: &Mapping,
    entries: &[AdjustEntry],
    context: &Context,
) -> Result<Mapping, RuleError> {
    let mut adjusted = attributes.clone();

    for entry in entries {
        // An entry without rules applies unconditionally
        if !entry.when.is_empty() && !any_matches(&entry.when, context)? {
            continue;
        }

        for (key, value) in &entry.overrides {
            let Some(key_str) = key.as_str() else {
                continue;
            };
            if let Some(base_key) = key_str.strip_suffix('+') {
                let merged = match adjusted.get(&Value::from(base_key)) {
                    Some(previous) => merge_values(previous, value),
                    None => value.clone(),
                };
                adjusted.insert(Value::from(base_key), merged);
            } else {
                adjusted.insert(key.clone(), value.clone());
            }
        }

        if !entry.continue_ {
            break;
        }
    }

    Ok(adjusted)
}

/// `+` suffix merge: append lists, deep-merge mappings, concatenate
/// strings, replace everything else
fn merge_values(previous: &Value, update: &Value) -> Value {
    match (previous, update) {
        (Value::Sequence(old), Value::Sequence(new)) => {
            let mut merged = old.clone();
            merged.extend(new.iter().cloned());
            Value::Sequence(merged)
        }
        (Value::Sequence(old), new) => {
            let mut merged = old.clone();
            merged.push(new.clone());
            Value::Sequence(merged)
        }
        (Value::Mapping(old), Value::Mapping(new)) => {
            let mut merged = old.clone();
            for (key, value) in new {
                let combined = match merged.get(key) {
                    Some(previous) => merge_values(previous, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), combined);
            }
            Value::Mapping(merged)
        }
        (Value::String(old), Value::String(new)) => Value::String(format!("{old}{new}")),
        (_, new) => new.clone(),
    }
}

#[cfg(test)]
#[path = "adjust_tests.rs"]
mod tests;
