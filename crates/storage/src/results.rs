// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable result store.
//!
//! A process-wide map keyed by (serial number, guest name). Updates
//! arrive concurrently from per-guest test invokers; each one is
//! serialized behind the mutex and `results.yaml` is rewritten before
//! the lock is released, so readers always observe a consistent
//! snapshot and an interrupted engine never loses a completed result.

use crate::atomic::{atomic_write_yaml, read_yaml, StorageError};
use rig_core::{merge_results, TestResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;

/// Record written to `failures.yaml` when a guest dies mid-test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FailureRecord {
    pub name: String,
    pub serial_number: u64,
    pub guest: String,
    pub message: String,
}

/// Mutex-guarded result map with durable flush on every mutation
pub struct ResultStore {
    path: PathBuf,
    failures_path: PathBuf,
    entries: Mutex<Vec<TestResult>>,
}

impl ResultStore {
    /// Open the store, loading any previously persisted results
    pub fn open(path: PathBuf, failures_path: PathBuf) -> Result<ResultStore, StorageError> {
        let entries: Vec<TestResult> = read_yaml(&path)?.unwrap_or_default();
        Ok(ResultStore {
            path,
            failures_path,
            entries: Mutex::new(entries),
        })
    }

    /// Insert or replace a result by its (serial, guest) key
    pub fn insert(&self, result: TestResult) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.iter_mut().find(|e| e.key() == result.key()) {
            Some(existing) => *existing = result,
            None => entries.push(result),
        }
        atomic_write_yaml(&self.path, &*entries)
    }

    /// Mutate the result with the given key; true when it existed
    pub fn update(
        &self,
        serial_number: u64,
        guest: &str,
        mutate: impl FnOnce(&mut TestResult),
    ) -> Result<bool, StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let Some(entry) = entries
            .iter_mut()
            .find(|e| e.serial_number == serial_number && e.guest.name == guest)
        else {
            return Ok(false);
        };
        mutate(entry);
        atomic_write_yaml(&self.path, &*entries)?;
        Ok(true)
    }

    /// Merge a partial rerun into the stored results
    pub fn merge(&self, new: &[TestResult]) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        *entries = merge_results(&entries, new);
        atomic_write_yaml(&self.path, &*entries)
    }

    /// Consistent snapshot of all results
    pub fn snapshot(&self) -> Vec<TestResult> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Append to `failures.yaml`, preserving previous records
    pub fn record_failure(&self, record: FailureRecord) -> Result<(), StorageError> {
        let mut failures: Vec<FailureRecord> =
            read_yaml(&self.failures_path)?.unwrap_or_default();
        failures.push(record);
        atomic_write_yaml(&self.failures_path, &failures)
    }
}

#[cfg(test)]
#[path = "results_tests.rs"]
mod tests;
