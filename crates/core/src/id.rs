// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run identifiers and invocation serial numbers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Stable identifier of a run.
///
/// Doubles as the workdir directory name, so it must stay
/// filesystem-safe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Generate a fresh random run id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hands out invocation serial numbers, monotonic within a run.
///
/// The same test discovered by several phases receives a distinct
/// serial from each, so results never collide in the store.
#[derive(Clone)]
pub struct SerialAllocator {
    next: Arc<AtomicU64>,
}

impl SerialAllocator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Resume allocation after a prior run already assigned serials.
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: Arc::new(AtomicU64::new(first)),
        }
    }

    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    /// Make sure future serials stay above an already-persisted one
    pub fn raise_to(&self, floor: u64) {
        self.next.fetch_max(floor, Ordering::SeqCst);
    }
}

impl Default for SerialAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
