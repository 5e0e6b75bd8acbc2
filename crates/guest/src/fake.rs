// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake guest for testing.
//!
//! Runs scripts on the engine host like the local guest, but records
//! every call, accepts scripted outputs, supports reboot (counted,
//! not performed) and can be made unreachable to exercise the error
//! paths.

use crate::exec::run_with_timeout;
use crate::guest::{
    CommandOutput, Guest, GuestError, GuestFacts, RebootOptions, RunOptions,
};
use crate::local::copy_path;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::process::Command;

/// Recorded guest call
#[derive(Debug, Clone)]
pub enum GuestCall {
    Run { script: String },
    Push { source: PathBuf, destination: PathBuf },
    Pull { source: PathBuf, destination: PathBuf },
    Reboot { command: Option<String> },
    Release,
}

#[derive(Default)]
struct FakeState {
    calls: Vec<GuestCall>,
    scripted: VecDeque<CommandOutput>,
    unreachable: bool,
    fail_reboot: bool,
    reboots: u32,
}

/// Fake guest for testing
#[derive(Clone)]
pub struct FakeGuest {
    name: String,
    role: Option<String>,
    state: Arc<Mutex<FakeState>>,
}

impl FakeGuest {
    pub fn new(name: impl Into<String>, role: Option<String>) -> Self {
        Self {
            name: name.into(),
            role,
            state: Arc::new(Mutex::new(FakeState::default())),
        }
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<GuestCall> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .clone()
    }

    /// Scripts run so far, in order
    pub fn run_scripts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                GuestCall::Run { script } => Some(script),
                _ => None,
            })
            .collect()
    }

    /// Queue a scripted output; consumed before real execution
    pub fn push_output(&self, output: CommandOutput) {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .scripted
            .push_back(output);
    }

    /// Make every following call fail as unreachable
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .unreachable = unreachable;
    }

    /// Make the next reboot time out
    pub fn set_fail_reboot(&self, fail: bool) {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .fail_reboot = fail;
    }

    /// Number of reboots performed
    pub fn reboots(&self) -> u32 {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .reboots
    }
}

#[async_trait]
impl Guest for FakeGuest {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    fn facts(&self) -> GuestFacts {
        GuestFacts {
            hostname: Some(format!("{}.fake", self.name)),
            become_root: false,
        }
    }

    fn supports_reboot(&self) -> bool {
        true
    }

    fn supports_parallel_provision(&self) -> bool {
        true
    }

    async fn run(&self, script: &str, options: &RunOptions) -> Result<CommandOutput, GuestError> {
        let scripted = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.calls.push(GuestCall::Run {
                script: script.to_string(),
            });
            if state.unreachable {
                return Err(GuestError::Unreachable {
                    guest: self.name.clone(),
                    message: "fake guest marked unreachable".to_string(),
                });
            }
            state.scripted.pop_front()
        };

        if let Some(output) = scripted {
            return Ok(output);
        }

        let mut command = Command::new("sh");
        command.arg("-c").arg(script);
        if let Some(cwd) = &options.cwd {
            command.current_dir(cwd);
        }
        command.envs(options.env.to_pairs());
        run_with_timeout(command, options.timeout).await
    }

    async fn push(&self, source: &Path, destination: &Path) -> Result<(), GuestError> {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.calls.push(GuestCall::Push {
                source: source.to_path_buf(),
                destination: destination.to_path_buf(),
            });
            if state.unreachable {
                return Err(GuestError::Unreachable {
                    guest: self.name.clone(),
                    message: "fake guest marked unreachable".to_string(),
                });
            }
        }
        copy_path(source, destination).await
    }

    async fn pull(&self, source: &Path, destination: &Path) -> Result<(), GuestError> {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.calls.push(GuestCall::Pull {
                source: source.to_path_buf(),
                destination: destination.to_path_buf(),
            });
            if state.unreachable {
                return Err(GuestError::Unreachable {
                    guest: self.name.clone(),
                    message: "fake guest marked unreachable".to_string(),
                });
            }
        }
        copy_path(source, destination).await
    }

    async fn reboot(&self, options: RebootOptions) -> Result<(), GuestError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.calls.push(GuestCall::Reboot {
            command: options.command.clone(),
        });
        if state.fail_reboot {
            return Err(GuestError::RebootTimeout {
                guest: self.name.clone(),
                timeout: options
                    .timeout
                    .unwrap_or(crate::guest::DEFAULT_REBOOT_TIMEOUT),
            });
        }
        state.reboots += 1;
        Ok(())
    }

    async fn release(&self) -> Result<(), GuestError> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .push(GuestCall::Release);
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
