// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Metadata tree contract.
//!
//! The engine consumes hierarchical metadata (tests, plans, stories)
//! through this narrow interface. The full loader with inheritance,
//! `+` merge semantics and virtual identifiers lives outside the
//! engine; [`MemorySource`] is the built-in implementation backing
//! tests and plain single-document files.

use regex::Regex;
use serde_yaml::{Mapping, Value};
use std::fmt;
use thiserror::Error;

/// Errors raised by metadata sources
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("node not found: {0}")]
    NotFound(NodeId),
    #[error("invalid name filter '{pattern}': {source}")]
    Filter {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Hierarchical node identifier, slash separated (`/plans/smoke`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        if id.starts_with('/') {
            Self(id)
        } else {
            Self(format!("/{id}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Identifier with slashes flattened for use as a directory name
    pub fn as_path_component(&self) -> String {
        self.0.trim_start_matches('/').replace('/', ".")
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl serde::Serialize for NodeId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NodeId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(NodeId::new(String::deserialize(deserializer)?))
    }
}

/// One metadata node: identifier plus arbitrary attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub attributes: Mapping,
}

impl Node {
    pub fn new(id: impl Into<String>, attributes: Mapping) -> Self {
        Self {
            id: NodeId::new(id),
            attributes,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(&Value::from(key))
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }
}

/// Node selection filter.
///
/// `names` are anchored regular expressions matched against node ids.
/// `includes` picks nodes by exact id, preserving the include order;
/// `excludes` drops nodes by exact id. The `test` list ignores
/// ordering and keeps duplicates, matching the behavior of plain
/// `test` selection in discover phases.
#[derive(Debug, Clone, Default)]
pub struct SelectFilter {
    pub names: Vec<String>,
    pub includes: Vec<NodeId>,
    pub excludes: Vec<NodeId>,
    pub tests: Vec<NodeId>,
}

impl SelectFilter {
    pub fn by_names(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

/// Read access to a metadata tree
pub trait MetadataSource: Send + Sync {
    /// All nodes, in tree (source) order
    fn nodes(&self) -> Vec<Node>;

    /// A single node by exact identifier
    fn get(&self, id: &NodeId) -> Option<Node>;

    /// Select nodes per the filter semantics described on
    /// [`SelectFilter`]
    fn select(&self, filter: &SelectFilter) -> Result<Vec<Node>, MetadataError> {
        let mut matchers = Vec::new();
        for pattern in &filter.names {
            matchers.push(Regex::new(pattern).map_err(|source| MetadataError::Filter {
                pattern: pattern.clone(),
                source,
            })?);
        }

        let mut selected = Vec::new();

        if !filter.tests.is_empty() {
            // Plain test selection: keep request order, allow duplicates
            for id in &filter.tests {
                if let Some(node) = self.get(id) {
                    selected.push(node);
                }
            }
            return Ok(selected);
        }

        if filter.includes.is_empty() {
            for node in self.nodes() {
                if matchers.is_empty() || matchers.iter().any(|m| m.is_match(node.id.as_str())) {
                    selected.push(node);
                }
            }
        } else {
            // Include order is preserved over tree order
            for id in &filter.includes {
                match self.get(id) {
                    Some(node) => selected.push(node),
                    None => return Err(MetadataError::NotFound(id.clone())),
                }
            }
        }

        selected.retain(|node| !filter.excludes.contains(&node.id));
        Ok(selected)
    }
}

/// In-memory metadata source
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    nodes: Vec<Node>,
}

impl MemorySource {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    pub fn insert(&mut self, node: Node) {
        self.nodes.push(node);
    }
}

impl MetadataSource for MemorySource {
    fn nodes(&self) -> Vec<Node> {
        self.nodes.clone()
    }

    fn get(&self, id: &NodeId) -> Option<Node> {
        self.nodes.iter().find(|n| &n.id == id).cloned()
    }
}

#[cfg(test)]
#[path = "metadata_tests.rs"]
mod tests;
