// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Context map and rule evaluation.
//!
//! A context describes the environment a plan runs against (distro,
//! arch, trigger, ...). Phases carry `when` rules and nodes carry
//! `adjust` entries which are evaluated against the context to
//! enable, disable or mutate configuration.

mod adjust;
mod rule;

pub use adjust::{apply_adjust, AdjustEntry};
pub use rule::{any_matches, CmpOp, Rule, RuleError};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Dimensions with versioned values (`fedora-33`), where ordering
/// comparisons are meaningful.
pub const VERSIONED_DIMENSIONS: &[&str] = &["distro", "collection", "module"];

/// A case-insensitive map of context dimensions to their values.
///
/// A dimension may carry several values (e.g. a component list);
/// a rule matches when any value satisfies it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context {
    dimensions: BTreeMap<String, Vec<String>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a dimension, normalizing key and values to lowercase
    pub fn set(&mut self, dimension: &str, values: impl IntoIterator<Item = impl Into<String>>) {
        self.dimensions.insert(
            dimension.to_lowercase(),
            values
                .into_iter()
                .map(|v| v.into().to_lowercase())
                .collect(),
        );
    }

    pub fn get(&self, dimension: &str) -> Option<&[String]> {
        self.dimensions
            .get(&dimension.to_lowercase())
            .map(|v| v.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    /// Overlay `other` on top of this context, `other` winning on
    /// conflicting dimensions. Used when a plan provides its own
    /// `context` attribute over the run-level one.
    pub fn overlay(&self, other: &Context) -> Context {
        let mut merged = self.clone();
        for (key, values) in &other.dimensions {
            merged.dimensions.insert(key.clone(), values.clone());
        }
        merged
    }

    /// Build from a `key=value` pair list (CLI `-c` options)
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = &'a str>) -> Result<Self, RuleError> {
        let mut context = Context::new();
        for pair in pairs {
            let (key, value) = pair.split_once('=').ok_or_else(|| RuleError::Parse {
                input: pair.to_string(),
                reason: "expected key=value".to_string(),
            })?;
            context.set(key.trim(), value.split(',').map(|v| v.trim().to_string()));
        }
        Ok(context)
    }
}

/// Split a versioned value (`fedora-33`) into name and version parts.
///
/// The version part starts at the first dash followed by a digit;
/// values without one have no version (`rawhide`).
pub(crate) fn split_versioned(value: &str) -> (&str, Option<&str>) {
    let bytes = value.as_bytes();
    for (index, byte) in bytes.iter().enumerate() {
        if *byte == b'-' && bytes.get(index + 1).is_some_and(|b| b.is_ascii_digit()) {
            return (&value[..index], Some(&value[index + 1..]));
        }
    }
    (value, None)
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
