// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Phases: configured actions within a step.
//!
//! Phases are selected by `when` rules, ordered by `order` (source
//! order breaking ties, then the phase name so inherited duplicates
//! stay deterministic) and targeted via `where` at guests or roles.

use crate::context::{any_matches, Context, Rule, RuleError};
use crate::result::GuestIdentity;
use serde_yaml::{Mapping, Value};

/// Priority band for phases that must run before regular ones
pub const PHASE_ORDER_EARLY: i32 = 30;
/// Default phase order
pub const PHASE_ORDER_DEFAULT: i32 = 50;
/// Priority band for installing required packages
pub const PHASE_ORDER_REQUIRES: i32 = 70;
/// Priority band for installing recommended packages
pub const PHASE_ORDER_RECOMMENDS: i32 = 75;

/// One configured action within a step
#[derive(Debug, Clone, PartialEq)]
pub struct Phase {
    /// Plugin variant selector
    pub how: String,
    /// Stable identifier inside the step
    pub name: String,
    pub order: i32,
    /// Guest and role names this phase targets; empty means all
    pub where_: Vec<String>,
    /// Context predicates; the phase is active iff any matches
    pub when: Vec<Rule>,
    pub enabled: bool,
    /// Serial execution requested even with several guests
    pub sequential: bool,
    /// Plugin-specific options
    pub options: Mapping,
    /// Position within the step configuration
    pub source_index: usize,
}

impl Phase {
    /// Parse one phase from its YAML mapping.
    ///
    /// Known keys are lifted into fields; everything else stays in
    /// `options` for the plugin to interpret.
    pub fn from_value(
        value: &Value,
        source_index: usize,
        default_how: &str,
    ) -> Result<Self, PhaseParseError> {
        let mapping = value
            .as_mapping()
            .ok_or(PhaseParseError::NotAMapping { source_index })?;

        let mut phase = Phase {
            how: default_how.to_string(),
            name: format!("default-{source_index}"),
            order: PHASE_ORDER_DEFAULT,
            where_: Vec::new(),
            when: Vec::new(),
            enabled: true,
            sequential: false,
            options: Mapping::new(),
            source_index,
        };

        for (key, value) in mapping {
            let Some(key) = key.as_str() else {
                continue;
            };
            match key {
                "how" => {
                    if let Some(how) = value.as_str() {
                        phase.how = how.to_string();
                    }
                }
                "name" => {
                    if let Some(name) = value.as_str() {
                        phase.name = name.to_string();
                    }
                }
                "order" => {
                    phase.order = value
                        .as_i64()
                        .and_then(|o| i32::try_from(o).ok())
                        .ok_or_else(|| PhaseParseError::BadOrder {
                            phase: phase.name.clone(),
                            value: format!("{value:?}"),
                        })?;
                }
                "where" => phase.where_ = string_list(value),
                "when" => {
                    for rule in string_list(value) {
                        phase.when.push(Rule::parse(&rule)?);
                    }
                }
                "enabled" => phase.enabled = value.as_bool().unwrap_or(true),
                "sequential" => phase.sequential = value.as_bool().unwrap_or(false),
                _ => {
                    phase.options.insert(Value::from(key), value.clone());
                }
            }
        }

        Ok(phase)
    }

    /// Active iff enabled and `when` is empty or any rule matches
    pub fn is_active(&self, context: &Context) -> Result<bool, RuleError> {
        if !self.enabled {
            return Ok(false);
        }
        if self.when.is_empty() {
            return Ok(true);
        }
        any_matches(&self.when, context)
    }

    /// Resolve `where` into the concrete guest set.
    ///
    /// Entries match guest names and roles; an empty `where` selects
    /// every guest.
    pub fn resolve_where<'a>(&self, guests: &'a [GuestIdentity]) -> Vec<&'a GuestIdentity> {
        if self.where_.is_empty() {
            return guests.iter().collect();
        }
        guests
            .iter()
            .filter(|guest| {
                self.where_.iter().any(|target| {
                    target == &guest.name || guest.role.as_deref() == Some(target.as_str())
                })
            })
            .collect()
    }
}

/// Errors raised while parsing a phase configuration
#[derive(Debug, thiserror::Error)]
pub enum PhaseParseError {
    #[error("phase {source_index} is not a mapping")]
    NotAMapping { source_index: usize },
    #[error("phase '{phase}' has a non-integer order: {value}")]
    BadOrder { phase: String, value: String },
    #[error(transparent)]
    Rule(#[from] RuleError),
}

/// Ordered list of phases configuring one step
pub type StepConfig = Vec<Phase>;

/// Parse a step configuration: either a single phase mapping or a
/// list of them
pub fn parse_step_config(
    value: &Value,
    default_how: &str,
) -> Result<StepConfig, PhaseParseError> {
    match value {
        Value::Sequence(phases) => phases
            .iter()
            .enumerate()
            .map(|(index, phase)| Phase::from_value(phase, index, default_how))
            .collect(),
        other => Ok(vec![Phase::from_value(other, 0, default_how)?]),
    }
}

/// Active phases in execution order: `(order, source index, name)`
pub fn select_phases<'a>(
    phases: &'a [Phase],
    context: &Context,
) -> Result<Vec<&'a Phase>, RuleError> {
    let mut active = Vec::new();
    for phase in phases {
        if phase.is_active(context)? {
            active.push(phase);
        }
    }
    active.sort_by(|a, b| {
        (a.order, a.source_index, &a.name).cmp(&(b.order, b.source_index, &b.name))
    });
    Ok(active)
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Sequence(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
#[path = "phase_tests.rs"]
mod tests;
