// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rig-core: data model for the rig test-orchestration engine

pub mod clock;
pub mod context;
pub mod duration;
pub mod env;
pub mod id;
pub mod metadata;
pub mod plan;
pub mod result;
pub mod test;

pub use clock::{Clock, FakeClock, SystemClock};
pub use context::{AdjustEntry, Context, Rule, RuleError};
pub use duration::{parse_duration, DurationError};
pub use env::{EnvFileError, Environment};
pub use id::{RunId, SerialAllocator};
pub use metadata::{MemorySource, MetadataError, MetadataSource, Node, NodeId, SelectFilter};
pub use plan::{select_phases, Phase, Plan, PlanError, StepConfig, StepKind};
pub use result::{
    format_duration, merge_results, CheckEvent, CheckInterpret, CheckResult, CheckSpec,
    GuestIdentity, Outcome, ResultInterpret, SubResult, TestResult,
};
pub use test::{Framework, TestInvocation, TestSpec};
