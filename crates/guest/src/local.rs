// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local guest: runs commands on the engine host itself.
//!
//! Push and pull are plain directory copies. Reboot is refused since
//! killing the host under the engine helps nobody.

use crate::exec::run_with_timeout;
use crate::guest::{
    CommandOutput, Guest, GuestError, GuestFacts, RebootOptions, RunOptions,
};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

/// Guest backed by the engine host
#[derive(Debug, Clone)]
pub struct LocalGuest {
    name: String,
    role: Option<String>,
}

impl LocalGuest {
    pub fn new(name: impl Into<String>, role: Option<String>) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }
}

#[async_trait]
impl Guest for LocalGuest {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    fn facts(&self) -> GuestFacts {
        GuestFacts {
            hostname: Some("localhost".to_string()),
            become_root: false,
        }
    }

    fn supports_parallel_provision(&self) -> bool {
        true
    }

    async fn run(&self, script: &str, options: &RunOptions) -> Result<CommandOutput, GuestError> {
        let mut command = Command::new("sh");
        command.arg("-c").arg(script);
        if let Some(cwd) = &options.cwd {
            command.current_dir(cwd);
        }
        command.envs(options.env.to_pairs());
        run_with_timeout(command, options.timeout).await
    }

    async fn push(&self, source: &Path, destination: &Path) -> Result<(), GuestError> {
        copy_path(source, destination).await
    }

    async fn pull(&self, source: &Path, destination: &Path) -> Result<(), GuestError> {
        copy_path(source, destination).await
    }

    async fn reboot(&self, _options: RebootOptions) -> Result<(), GuestError> {
        Err(GuestError::RebootUnsupported {
            guest: self.name.clone(),
        })
    }

    async fn release(&self) -> Result<(), GuestError> {
        Ok(())
    }
}

/// Recursive copy; a no-op when source and destination coincide
pub(crate) async fn copy_path(source: &Path, destination: &Path) -> Result<(), GuestError> {
    if source == destination {
        return Ok(());
    }
    if !source.exists() {
        return Err(GuestError::Transfer(format!(
            "source does not exist: {}",
            source.display()
        )));
    }
    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let output = Command::new("cp")
        .arg("-a")
        .arg(source)
        .arg(destination)
        .output()
        .await
        .map_err(|e| GuestError::Spawn(e.to_string()))?;
    if !output.status.success() {
        return Err(GuestError::Transfer(
            String::from_utf8_lossy(&output.stderr).into_owned(),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
