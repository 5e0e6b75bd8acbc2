// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Guest specifications and the provisioner registry.
//!
//! Provisioners are named factories keyed by their `how` value; the
//! provision step resolves each configured phase into a factory call.
//! The same record round-trips through `guests.yaml` so later steps
//! (or a resumed run) can reconnect without provisioning again.

use crate::guest::{Guest, GuestError};
use crate::local::LocalGuest;
use crate::ssh::SshGuest;
use rig_core::Phase;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Provisioner configuration, as found in a provision phase
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct GuestSpec {
    pub how: String,
    pub role: Option<String>,
    pub host: Option<String>,
    pub user: Option<String>,
    pub port: Option<u16>,
    /// Run commands under privilege escalation
    #[serde(rename = "become")]
    pub become_root: bool,
    /// Image or distro hint, passed through to provisioners that
    /// understand it
    pub image: Option<String>,
}

impl GuestSpec {
    /// Extract the guest configuration from a provision phase
    pub fn from_phase(phase: &Phase) -> Result<GuestSpec, GuestError> {
        let mut spec: GuestSpec =
            serde_yaml::from_value(Value::Mapping(phase.options.clone()))
                .map_err(|e| GuestError::Spawn(format!("invalid provision config: {e}")))?;
        spec.how = phase.how.clone();
        Ok(spec)
    }
}

/// Reconnect data persisted into `guests.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GuestRecord {
    pub name: String,
    #[serde(flatten)]
    pub spec: GuestSpec,
}

impl GuestRecord {
    pub fn new(name: impl Into<String>, spec: GuestSpec) -> Self {
        Self {
            name: name.into(),
            spec,
        }
    }
}

type GuestFactory =
    Box<dyn Fn(&GuestRecord, &Path) -> Result<Box<dyn Guest>, GuestError> + Send + Sync>;

/// Named guest factories keyed by `how`
pub struct ProvisionerRegistry {
    factories: HashMap<String, GuestFactory>,
}

impl ProvisionerRegistry {
    /// Registry with the built-in provisioners (`local`, `connect`)
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };

        registry.register("local", |record, _control_dir| {
            Ok(Box::new(LocalGuest::new(
                record.name.clone(),
                record.spec.role.clone(),
            )) as Box<dyn Guest>)
        });

        registry.register("connect", |record, control_dir| {
            let host = record.spec.host.clone().ok_or_else(|| {
                GuestError::Spawn(format!("guest '{}': connect requires a host", record.name))
            })?;
            Ok(Box::new(SshGuest::new(
                record.name.clone(),
                record.spec.role.clone(),
                host,
                record.spec.user.clone(),
                record.spec.port,
                record.spec.become_root,
                control_dir,
            )) as Box<dyn Guest>)
        });

        registry
    }

    pub fn register(
        &mut self,
        how: impl Into<String>,
        factory: impl Fn(&GuestRecord, &Path) -> Result<Box<dyn Guest>, GuestError>
            + Send
            + Sync
            + 'static,
    ) {
        self.factories.insert(how.into(), Box::new(factory));
    }

    /// Instantiate (or reconnect) a guest from its record.
    ///
    /// `control_dir` hosts per-guest connection state such as SSH
    /// control sockets.
    pub fn acquire(
        &self,
        record: &GuestRecord,
        control_dir: &Path,
    ) -> Result<Box<dyn Guest>, GuestError> {
        let factory = self.factories.get(&record.spec.how).ok_or_else(|| {
            GuestError::UnknownProvisioner {
                how: record.spec.how.clone(),
            }
        })?;
        factory(record, control_dir)
    }

    pub fn knows(&self, how: &str) -> bool {
        self.factories.contains_key(how)
    }
}

impl Default for ProvisionerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Load guest records from a `guests.yaml` document
pub fn load_records(path: &Path) -> Result<Vec<GuestRecord>, GuestError> {
    let content = std::fs::read_to_string(path)?;
    serde_yaml::from_str(&content)
        .map_err(|e| GuestError::Spawn(format!("invalid guests file {}: {e}", path.display())))
}

/// Persist guest records; written by provision, read by every later
/// step
pub fn save_records(path: &PathBuf, records: &[GuestRecord]) -> Result<(), GuestError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_yaml::to_string(records)
        .map_err(|e| GuestError::Spawn(format!("cannot serialize guests: {e}")))?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
#[path = "spec_tests.rs"]
mod tests;
