// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the run engine

use rig_core::{MetadataError, NodeId, PlanError, StepKind};
use thiserror::Error;

/// Errors that can occur while driving a run
#[derive(Debug, Error)]
pub enum EngineError {
    /// Metadata violates the schema or references missing nodes;
    /// surfaced before provisioning
    #[error("specification error: {0}")]
    Specification(String),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error("guest error: {0}")]
    Guest(#[from] rig_guest::GuestError),
    #[error(transparent)]
    Storage(#[from] rig_storage::StorageError),
    #[error("plan {plan}: step {step} failed: {message}")]
    Step {
        plan: NodeId,
        step: StepKind,
        message: String,
    },
    #[error("invalid duration for test '{test}': {message}")]
    Duration { test: String, message: String },
    #[error(transparent)]
    Rule(#[from] rig_core::RuleError),
    #[error("internal engine error: {0}")]
    Internal(String),
}
