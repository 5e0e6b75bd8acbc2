// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The guest capability trait

use async_trait::async_trait;
use rig_core::Environment;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// How long to wait for a rebooted guest to come back
pub const DEFAULT_REBOOT_TIMEOUT: Duration = Duration::from_secs(600);

/// Errors raised by guest operations
#[derive(Debug, Error)]
pub enum GuestError {
    #[error("failed to spawn command: {0}")]
    Spawn(String),
    /// Transient execution failure, worth retrying
    #[error("command failed on guest '{guest}': {message}")]
    Command { guest: String, message: String },
    #[error("command timed out after {timeout:?}")]
    Timeout { timeout: Duration },
    #[error("guest '{guest}' did not come back within {timeout:?} after reboot")]
    RebootTimeout { guest: String, timeout: Duration },
    #[error("guest '{guest}' does not support reboot")]
    RebootUnsupported { guest: String },
    #[error("guest '{guest}' is unreachable: {message}")]
    Unreachable { guest: String, message: String },
    #[error("file transfer failed: {0}")]
    Transfer(String),
    #[error("unknown provisioner '{how}'")]
    UnknownProvisioner { how: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GuestError {
    /// Whether retrying within a bounded window makes sense
    pub fn is_transient(&self) -> bool {
        matches!(self, GuestError::Command { .. })
    }
}

/// Captured output of one command execution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Options for running a command on a guest
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub env: Environment,
    pub cwd: Option<PathBuf>,
    /// Wall-clock limit; expiry terminates the process tree
    pub timeout: Option<Duration>,
    /// Allocate a tty for the command
    pub tty: bool,
}

/// Options for a guest reboot
#[derive(Debug, Clone, Default)]
pub struct RebootOptions {
    /// Alternative reboot command requested by the test
    pub command: Option<String>,
    /// Reconnect deadline; [`DEFAULT_REBOOT_TIMEOUT`] when unset
    pub timeout: Option<Duration>,
}

/// Descriptive facts about a guest, used for topology rendering
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GuestFacts {
    pub hostname: Option<String>,
    /// Commands must be wrapped in privilege escalation
    #[serde(default)]
    pub become_root: bool,
}

/// A reachable execution target.
///
/// Created by the provision step, shared by every later step and
/// released by finish. Phases use a guest sequentially; a single
/// phase may run on disjoint guests concurrently.
#[async_trait]
pub trait Guest: Send + Sync {
    /// Unique name within the plan
    fn name(&self) -> &str;

    /// Optional role for `where` targeting
    fn role(&self) -> Option<&str>;

    fn facts(&self) -> GuestFacts;

    fn supports_reboot(&self) -> bool {
        false
    }

    /// Whether this provisioner may be acquired in parallel with its
    /// peers
    fn supports_parallel_provision(&self) -> bool {
        false
    }

    /// Run a shell script on the guest
    async fn run(&self, script: &str, options: &RunOptions) -> Result<CommandOutput, GuestError>;

    /// Copy a local path onto the guest
    async fn push(&self, source: &Path, destination: &Path) -> Result<(), GuestError>;

    /// Copy a guest path back to the engine
    async fn pull(&self, source: &Path, destination: &Path) -> Result<(), GuestError>;

    /// Reboot and wait for the guest to reconnect
    async fn reboot(&self, options: RebootOptions) -> Result<(), GuestError>;

    /// Tear down connections and free the guest
    async fn release(&self) -> Result<(), GuestError>;

    /// Identity used in result records
    fn identity(&self) -> rig_core::GuestIdentity {
        rig_core::GuestIdentity {
            name: self.name().to_string(),
            role: self.role().map(str::to_string),
        }
    }
}
