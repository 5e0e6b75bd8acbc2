// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Topology files exposed to tests.
//!
//! Tests learn about all guests of a plan through two equivalent
//! renderings: a shell-sourcable file and a YAML document, reachable
//! via `TMT_TOPOLOGY_BASH` and `TMT_TOPOLOGY_YAML`.

use crate::guest::{Guest, GuestError};
use minijinja::Environment as TemplateEnvironment;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Shell rendering of the topology
const BASH_TEMPLATE: &str = r#"TMT_GUESTS="{{ names | join(' ') }}"
{% for guest in guests -%}
TMT_GUEST_{{ guest.var }}_NAME="{{ guest.name }}"
TMT_GUEST_{{ guest.var }}_HOSTNAME="{{ guest.hostname }}"
TMT_GUEST_{{ guest.var }}_ROLE="{{ guest.role }}"
{% endfor -%}
TMT_ROLES="{{ roles | join(' ') }}"
{% for role in role_members -%}
TMT_ROLE_{{ role.var }}="{{ role.names | join(' ') }}"
{% endfor -%}
"#;

/// One guest as seen by the topology
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyGuest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

/// Plan-wide guest topology
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    pub guests: BTreeMap<String, TopologyGuest>,
    pub roles: BTreeMap<String, Vec<String>>,
}

impl Topology {
    /// Collect the topology of all ready guests
    pub fn from_guests(guests: &[&dyn Guest]) -> Self {
        let mut topology = Topology::default();
        for guest in guests {
            let facts = guest.facts();
            topology.guests.insert(
                guest.name().to_string(),
                TopologyGuest {
                    role: guest.role().map(str::to_string),
                    hostname: facts.hostname,
                },
            );
            if let Some(role) = guest.role() {
                topology
                    .roles
                    .entry(role.to_string())
                    .or_default()
                    .push(guest.name().to_string());
            }
        }
        topology
    }

    /// Render the shell-sourcable form
    pub fn to_bash(&self) -> String {
        #[derive(Serialize)]
        struct GuestVars {
            var: String,
            name: String,
            hostname: String,
            role: String,
        }
        #[derive(Serialize)]
        struct RoleVars {
            var: String,
            names: Vec<String>,
        }

        let guests: Vec<GuestVars> = self
            .guests
            .iter()
            .map(|(name, guest)| GuestVars {
                var: shell_var(name),
                name: name.clone(),
                hostname: guest.hostname.clone().unwrap_or_default(),
                role: guest.role.clone().unwrap_or_default(),
            })
            .collect();
        let role_members: Vec<RoleVars> = self
            .roles
            .iter()
            .map(|(role, names)| RoleVars {
                var: shell_var(role),
                names: names.clone(),
            })
            .collect();

        let mut templates = TemplateEnvironment::new();
        templates
            .add_template("topology", BASH_TEMPLATE)
            .expect("static template parses");
        let template = templates
            .get_template("topology")
            .expect("template registered");
        template
            .render(minijinja::context! {
                names => self.guests.keys().collect::<Vec<_>>(),
                guests => guests,
                roles => self.roles.keys().collect::<Vec<_>>(),
                role_members => role_members,
            })
            .expect("topology rendering is infallible")
    }

    /// Render the YAML form
    pub fn to_yaml(&self) -> String {
        serde_yaml::to_string(self).expect("topology serializes")
    }

    /// Write both renderings into a directory.
    ///
    /// Returns the bash and YAML paths, in that order.
    pub fn save(&self, directory: &Path) -> Result<(PathBuf, PathBuf), GuestError> {
        std::fs::create_dir_all(directory)?;
        let bash_path = directory.join("topology.sh");
        let yaml_path = directory.join("topology.yaml");
        std::fs::write(&bash_path, self.to_bash())?;
        std::fs::write(&yaml_path, self.to_yaml())?;
        Ok((bash_path, yaml_path))
    }
}

/// Uppercase and sanitize a name for use inside a shell variable
fn shell_var(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "topology_tests.rs"]
mod tests;
