// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment variable layering.
//!
//! Per-test environments are built by stacking layers, lowest first:
//! plan `environment`, sourced `environment-file`s, test
//! `environment`, then the variables injected by the engine.

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while reading an environment file
#[derive(Debug, Error)]
pub enum EnvFileError {
    #[error("cannot read environment file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed line {line} in {path}: expected KEY=VALUE")]
    Malformed { path: PathBuf, line: usize },
}

/// An ordered set of environment variables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Environment {
    variables: BTreeMap<String, String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Layer `other` on top, `other` winning on conflicts
    pub fn extend(&mut self, other: &Environment) {
        for (key, value) in &other.variables {
            self.variables.insert(key.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.variables
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Pairs suitable for `tokio::process::Command::envs`
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        self.variables
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Build from a YAML mapping, stringifying scalar values
    pub fn from_yaml(mapping: &serde_yaml::Mapping) -> Self {
        let mut environment = Environment::new();
        for (key, value) in mapping {
            let Some(key) = key.as_str() else { continue };
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => continue,
            };
            environment.set(key, value);
        }
        environment
    }

    /// Read a dotenv-style file: `KEY=VALUE` lines, `#` comments,
    /// optional `export ` prefix
    pub fn from_file(path: &Path) -> Result<Self, EnvFileError> {
        let content = std::fs::read_to_string(path).map_err(|source| EnvFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut environment = Environment::new();
        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=').ok_or(EnvFileError::Malformed {
                path: path.to_path_buf(),
                line: index + 1,
            })?;
            let value = value.trim().trim_matches('"').trim_matches('\'');
            environment.set(key.trim(), value);
        }

        Ok(environment)
    }
}

impl FromIterator<(String, String)> for Environment {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            variables: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
