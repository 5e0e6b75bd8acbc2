// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rig-storage: workdir layout and durable state.
//!
//! Every artifact the engine keeps open is written via write-rename,
//! so an interruption at any point leaves either the previous or the
//! new version on disk, never a torn one.

pub mod atomic;
pub mod lock;
pub mod results;
pub mod state;
pub mod workdir;

pub use atomic::{atomic_write_yaml, StorageError};
pub use lock::RunLock;
pub use results::{FailureRecord, ResultStore};
pub use state::{PlanRunState, PlanStatus, RunState, StepState, StepStatus};
pub use workdir::Workdir;
