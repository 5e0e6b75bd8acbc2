// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration.
//!
//! One explicit value threaded through all components; nothing in
//! the engine reads mutable global state.

use rig_core::{Context, StepKind};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration of one engine invocation
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory holding run workdirs
    pub workdir_root: PathBuf,
    /// Root of the metadata tree, exposed to tests as `TMT_TREE`
    pub tree_root: PathBuf,
    /// Run-level context (plans may overlay their own)
    pub context: Context,
    /// Debug level, exported as `TMT_DEBUG` when non-zero
    pub debug: u8,
    /// Stop executing after the first failed or errored test
    pub exit_first: bool,
    /// Honor a zero duration as "no timeout"
    pub ignore_duration: bool,
    /// Fail when `where` resolves to zero guests instead of skipping
    /// the phase
    pub strict_where: bool,
    /// Restrict discover to tests whose prior result failed
    pub failed_only: bool,
    /// Steps to re-execute, preserving their output directories
    pub again: Vec<StepKind>,
    /// Steps to re-execute from scratch, discarding downstream state
    pub force: Vec<StepKind>,
    /// Plan name regular expressions to select
    pub plan_names: Vec<String>,
    /// Base URL advertised to tests via `TMT_REPORT_ARTIFACTS_URL`
    pub artifacts_url: Option<String>,
    /// Reconnect deadline after a reboot (`TMT_REBOOT_TIMEOUT`)
    pub reboot_timeout: Option<Duration>,
    /// Where helper scripts land on guests (`TMT_SCRIPTS_DIR`)
    pub scripts_dir: Option<PathBuf>,
    /// Root for per-guest pidfile directories
    /// (`TMT_TEST_PIDFILE_ROOT`)
    pub pidfile_root: Option<PathBuf>,
}

impl EngineConfig {
    pub fn new(workdir_root: PathBuf, tree_root: PathBuf) -> Self {
        Self {
            workdir_root,
            tree_root,
            context: Context::new(),
            debug: 0,
            exit_first: false,
            ignore_duration: false,
            strict_where: false,
            failed_only: false,
            again: Vec::new(),
            force: Vec::new(),
            plan_names: Vec::new(),
            artifacts_url: None,
            reboot_timeout: None,
            scripts_dir: None,
            pidfile_root: None,
        }
    }

    /// Whether the step was named by `--again` or `--force`
    pub fn rerun_requested(&self, step: StepKind) -> bool {
        self.again.contains(&step) || self.force.contains(&step)
    }
}
