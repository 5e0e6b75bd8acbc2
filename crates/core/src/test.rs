// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test specifications and invocations.
//!
//! A [`TestSpec`] is the materialized metadata of one test; a
//! [`TestInvocation`] is one instance of that test assigned to one
//! guest, carrying the serial number and the reboot/restart counters.

use crate::env::Environment;
use crate::metadata::Node;
use crate::result::{CheckInterpret, CheckSpec, GuestIdentity, ResultInterpret};
use crate::RunId;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::path::PathBuf;

/// Default test duration when metadata does not set one
pub const DEFAULT_DURATION: &str = "5m";

/// Test framework driving the invocation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    #[default]
    Shell,
    Beakerlib,
}

/// Materialized test metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct TestSpec {
    #[serde(skip)]
    pub name: String,
    /// The test script
    pub test: String,
    /// Directory the test runs from, relative to the tree root
    pub path: Option<PathBuf>,
    pub summary: Option<String>,
    pub framework: Framework,
    pub duration: String,
    pub environment: Environment,
    #[serde(deserialize_with = "string_or_vec")]
    pub require: Vec<String>,
    #[serde(deserialize_with = "string_or_vec")]
    pub recommend: Vec<String>,
    pub result: ResultInterpret,
    pub restart_on_exit_code: Vec<i32>,
    pub restart_max_count: u32,
    pub tty: bool,
    #[serde(rename = "where", deserialize_with = "string_or_vec")]
    pub where_: Vec<String>,
    #[serde(deserialize_with = "checks")]
    pub check: Vec<CheckSpec>,
    pub manual: bool,
}

impl Default for TestSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            test: String::new(),
            path: None,
            summary: None,
            framework: Framework::default(),
            duration: DEFAULT_DURATION.to_string(),
            environment: Environment::new(),
            require: Vec::new(),
            recommend: Vec::new(),
            result: ResultInterpret::default(),
            restart_on_exit_code: Vec::new(),
            restart_max_count: 1,
            tty: false,
            where_: Vec::new(),
            check: Vec::new(),
            manual: false,
        }
    }
}

impl TestSpec {
    /// Materialize from a metadata node
    pub fn from_node(node: &Node) -> Result<Self, serde_yaml::Error> {
        let mut spec: TestSpec =
            serde_yaml::from_value(Value::Mapping(node.attributes.clone()))?;
        spec.name = node.id.as_str().to_string();
        Ok(spec)
    }

    /// Flat filesystem-safe name (`/tests/core/smoke` becomes
    /// `tests-core-smoke`)
    pub fn pathless_safe_name(&self) -> String {
        self.name.trim_matches('/').replace('/', "-")
    }
}

/// One instance of a test on one guest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestInvocation {
    pub test: TestSpec,
    pub guest: GuestIdentity,
    pub serial_number: u64,
    #[serde(default)]
    pub reboot_count: u32,
    #[serde(default)]
    pub restart_count: u32,
}

impl TestInvocation {
    pub fn new(test: TestSpec, guest: GuestIdentity, serial_number: u64) -> Self {
        Self {
            test,
            guest,
            serial_number,
            reboot_count: 0,
            restart_count: 0,
        }
    }

    /// Stable for the lifetime of the invocation, across reboots and
    /// restarts
    pub fn iteration_id(&self, run_id: &RunId) -> String {
        format!("{}-{}", run_id, self.serial_number)
    }

    /// Directory name for this invocation's data under the per-guest
    /// data tree
    pub fn data_dir_name(&self) -> String {
        format!("{}-{}", self.test.pathless_safe_name(), self.serial_number)
    }
}

/// Accept either a single string or a list of strings
fn string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    struct StringOrVec;

    impl<'de> de::Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a string or array of strings")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![v.to_owned()])
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: de::SeqAccess<'de>,
        {
            let mut vec = Vec::new();
            while let Some(item) = seq.next_element()? {
                vec.push(item);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(StringOrVec)
}

/// Accept check entries as either plain kind names or full mappings
fn checks<'de, D>(deserializer: D) -> Result<Vec<CheckSpec>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values: Vec<Value> = Vec::deserialize(deserializer)?;
    let mut specs = Vec::with_capacity(values.len());
    for value in values {
        match value {
            Value::String(how) => specs.push(CheckSpec {
                how,
                result: CheckInterpret::default(),
            }),
            other => {
                specs.push(serde_yaml::from_value(other).map_err(serde::de::Error::custom)?);
            }
        }
    }
    Ok(specs)
}

#[cfg(test)]
#[path = "test_tests.rs"]
mod tests;
