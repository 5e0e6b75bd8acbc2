// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plans: materialized pipelines of six ordered steps.
//!
//! A plan is built from a metadata node. Materialization applies the
//! node's `adjust` entries against the effective context, then parses
//! the core attributes and one configuration per step. Schema
//! violations surface here, before any guest is provisioned.

mod phase;

pub use phase::{
    parse_step_config, select_phases, Phase, PhaseParseError, StepConfig, PHASE_ORDER_DEFAULT,
    PHASE_ORDER_EARLY, PHASE_ORDER_RECOMMENDS, PHASE_ORDER_REQUIRES,
};

use crate::context::{apply_adjust, AdjustEntry, Context, RuleError};
use crate::env::Environment;
use crate::metadata::{Node, NodeId};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use thiserror::Error;

/// The six steps of a plan, in fixed execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Discover,
    Provision,
    Prepare,
    Execute,
    Finish,
    Report,
}

impl StepKind {
    /// All steps in execution order
    pub const ALL: [StepKind; 6] = [
        StepKind::Discover,
        StepKind::Provision,
        StepKind::Prepare,
        StepKind::Execute,
        StepKind::Finish,
        StepKind::Report,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StepKind::Discover => "discover",
            StepKind::Provision => "provision",
            StepKind::Prepare => "prepare",
            StepKind::Execute => "execute",
            StepKind::Finish => "finish",
            StepKind::Report => "report",
        }
    }

    /// Default plugin variant when a phase does not set `how`
    pub fn default_how(self) -> &'static str {
        match self {
            StepKind::Discover => "fmf",
            StepKind::Provision => "local",
            StepKind::Prepare => "shell",
            StepKind::Execute => "tmt",
            StepKind::Finish => "shell",
            StepKind::Report => "display",
        }
    }

    pub fn parse(name: &str) -> Option<StepKind> {
        StepKind::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised during plan materialization
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("plan {plan}: {source}")]
    Phase {
        plan: NodeId,
        #[source]
        source: PhaseParseError,
    },
    #[error("plan {plan}: step '{step}' must be a mapping or a list of mappings")]
    BadStep { plan: NodeId, step: StepKind },
    #[error("plan {plan}: {source}")]
    Rule {
        plan: NodeId,
        #[source]
        source: RuleError,
    },
    #[error("plan {plan}: {message}")]
    Schema { plan: NodeId, message: String },
}

/// A materialized plan
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub id: NodeId,
    pub summary: Option<String>,
    pub enabled: bool,
    /// Plan-level context overrides, already overlaid on the run
    /// context
    pub context: Context,
    pub environment: Environment,
    pub environment_files: Vec<String>,
    pub link: Vec<String>,
    discover: StepConfig,
    provision: StepConfig,
    prepare: StepConfig,
    execute: StepConfig,
    finish: StepConfig,
    report: StepConfig,
}

impl Plan {
    /// Materialize a plan from a metadata node.
    ///
    /// The node's own `context` attribute is overlaid on the run
    /// context, `adjust` entries are applied against the result, and
    /// the six step configurations are parsed.
    pub fn from_node(node: &Node, run_context: &Context) -> Result<Plan, PlanError> {
        let rule_err = |source| PlanError::Rule {
            plan: node.id.clone(),
            source,
        };

        // Plan context first: adjust rules see the overlaid value
        let mut plan_context = Context::new();
        if let Some(mapping) = node.get("context").and_then(Value::as_mapping) {
            for (key, value) in mapping {
                let Some(key) = key.as_str() else { continue };
                match value {
                    Value::String(v) => plan_context.set(key, [v.clone()]),
                    Value::Sequence(items) => plan_context.set(
                        key,
                        items
                            .iter()
                            .filter_map(|v| v.as_str().map(str::to_string)),
                    ),
                    Value::Number(n) => plan_context.set(key, [n.to_string()]),
                    _ => {}
                }
            }
        }
        let context = run_context.overlay(&plan_context);

        let mut adjust_entries = Vec::new();
        if let Some(value) = node.get("adjust") {
            let values: Vec<Value> = match value {
                Value::Sequence(entries) => entries.clone(),
                other => vec![other.clone()],
            };
            for value in values {
                adjust_entries.push(AdjustEntry::from_value(&value).map_err(rule_err)?);
            }
        }

        let attributes =
            apply_adjust(&node.attributes, &adjust_entries, &context).map_err(rule_err)?;
        let adjusted = Node {
            id: node.id.clone(),
            attributes,
        };

        let mut plan = Plan {
            id: node.id.clone(),
            summary: adjusted.get_str("summary").map(str::to_string),
            enabled: adjusted.get_bool("enabled").unwrap_or(true),
            context,
            environment: Environment::new(),
            environment_files: Vec::new(),
            link: Vec::new(),
            discover: StepConfig::new(),
            provision: StepConfig::new(),
            prepare: StepConfig::new(),
            execute: StepConfig::new(),
            finish: StepConfig::new(),
            report: StepConfig::new(),
        };

        if let Some(mapping) = adjusted.get("environment").and_then(Value::as_mapping) {
            plan.environment = Environment::from_yaml(mapping);
        }
        if let Some(value) = adjusted.get("environment-file") {
            plan.environment_files = match value {
                Value::String(path) => vec![path.clone()],
                Value::Sequence(paths) => paths
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
                _ => {
                    return Err(PlanError::Schema {
                        plan: node.id.clone(),
                        message: "environment-file must be a path or list of paths".into(),
                    })
                }
            };
        }
        if let Some(value) = adjusted.get("link") {
            plan.link = match value {
                Value::String(link) => vec![link.clone()],
                Value::Sequence(links) => links
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
                _ => Vec::new(),
            };
        }

        for kind in StepKind::ALL {
            let Some(value) = adjusted.get(kind.as_str()) else {
                continue;
            };
            if !matches!(value, Value::Mapping(_) | Value::Sequence(_)) {
                return Err(PlanError::BadStep {
                    plan: node.id.clone(),
                    step: kind,
                });
            }
            let config =
                parse_step_config(value, kind.default_how()).map_err(|source| PlanError::Phase {
                    plan: node.id.clone(),
                    source,
                })?;
            *plan.step_mut(kind) = config;
        }

        Ok(plan)
    }

    /// Step configuration, possibly empty
    pub fn step(&self, kind: StepKind) -> &StepConfig {
        match kind {
            StepKind::Discover => &self.discover,
            StepKind::Provision => &self.provision,
            StepKind::Prepare => &self.prepare,
            StepKind::Execute => &self.execute,
            StepKind::Finish => &self.finish,
            StepKind::Report => &self.report,
        }
    }

    pub fn step_mut(&mut self, kind: StepKind) -> &mut StepConfig {
        match kind {
            StepKind::Discover => &mut self.discover,
            StepKind::Provision => &mut self.provision,
            StepKind::Prepare => &mut self.prepare,
            StepKind::Execute => &mut self.execute,
            StepKind::Finish => &mut self.finish,
            StepKind::Report => &mut self.report,
        }
    }
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
