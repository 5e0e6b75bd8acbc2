// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plain single-document metadata source.
//!
//! The full hierarchical loader (inheritance, `+` merge, virtual
//! identifiers) is an external collaborator. The CLI ships with a
//! plain reader: one YAML document mapping node identifiers to their
//! attributes, no inheritance applied.
//!
//! ```yaml
//! /plans/smoke:
//!   discover:
//!     how: fmf
//!     test: [/tests/one]
//!   provision:
//!     how: local
//!   execute:
//!     how: tmt
//! /tests/one:
//!   test: exit 0
//! ```

use anyhow::Context as _;
use rig_core::{MemorySource, Node};
use serde_yaml::{Mapping, Value};
use std::path::Path;

/// Default metadata file name under the tree root
pub const METADATA_FILENAME: &str = "rig.yaml";

/// Load the metadata document into an in-memory source
pub fn load_source(tree_root: &Path) -> anyhow::Result<MemorySource> {
    let path = tree_root.join(METADATA_FILENAME);
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("cannot read metadata file {}", path.display()))?;
    let document: Mapping = serde_yaml::from_str(&content)
        .with_context(|| format!("invalid metadata in {}", path.display()))?;

    let mut source = MemorySource::default();
    for (key, value) in document {
        let Some(id) = key.as_str() else {
            anyhow::bail!("node identifiers must be strings in {}", path.display());
        };
        let attributes = match value {
            Value::Mapping(mapping) => mapping,
            Value::Null => Mapping::new(),
            _ => anyhow::bail!("node '{id}' must map to attributes in {}", path.display()),
        };
        source.insert(Node::new(id, attributes));
    }
    Ok(source)
}

#[cfg(test)]
#[path = "metadata_tests.rs"]
mod tests;
