// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SSH-connected guest.
//!
//! One control master per guest is shared by every step and torn
//! down on release; leaking masters is what keeps logins stuck after
//! a run.

use crate::exec::{run_with_timeout, shell_quote};
use crate::guest::{
    CommandOutput, Guest, GuestError, GuestFacts, RebootOptions, RunOptions,
    DEFAULT_REBOOT_TIMEOUT,
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

/// How often to probe an unreachable guest while reconnecting
const RECONNECT_PROBE_INTERVAL: Duration = Duration::from_secs(5);
/// Per-probe connection limit
const RECONNECT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Guest reached over SSH
#[derive(Debug, Clone)]
pub struct SshGuest {
    name: String,
    role: Option<String>,
    host: String,
    user: Option<String>,
    port: Option<u16>,
    become_root: bool,
    control_path: PathBuf,
}

impl SshGuest {
    pub fn new(
        name: impl Into<String>,
        role: Option<String>,
        host: impl Into<String>,
        user: Option<String>,
        port: Option<u16>,
        become_root: bool,
        control_dir: &Path,
    ) -> Self {
        let name = name.into();
        let control_path = control_dir.join(format!("ssh-{name}.socket"));
        Self {
            name,
            role,
            host: host.into(),
            user,
            port,
            become_root,
            control_path,
        }
    }

    fn destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{user}@{}", self.host),
            None => self.host.clone(),
        }
    }

    /// Common options shared by ssh and scp invocations
    fn common_options(&self) -> Vec<String> {
        vec![
            "-o".into(),
            "ControlMaster=auto".into(),
            "-o".into(),
            format!("ControlPath={}", self.control_path.display()),
            "-o".into(),
            "ControlPersist=60".into(),
            "-o".into(),
            "StrictHostKeyChecking=no".into(),
            "-o".into(),
            "UserKnownHostsFile=/dev/null".into(),
            "-o".into(),
            "BatchMode=yes".into(),
            "-o".into(),
            "LogLevel=ERROR".into(),
        ]
    }

    fn ssh_command(&self, tty: bool) -> Command {
        let mut command = Command::new("ssh");
        command.args(self.common_options());
        if let Some(port) = self.port {
            command.args(["-p", &port.to_string()]);
        }
        if tty {
            command.arg("-tt");
        }
        command.arg(self.destination());
        command
    }

    /// Probe reachability with a short connection limit
    async fn probe(&self) -> Result<CommandOutput, GuestError> {
        let mut command = self.ssh_command(false);
        command.args(["-o", "ConnectTimeout=5"]);
        command.arg("cat /proc/sys/kernel/random/boot_id");
        run_with_timeout(command, Some(RECONNECT_PROBE_TIMEOUT)).await
    }
}

/// Render the script to run on the far end: change directory, export
/// the environment, then hand off to the shell
fn remote_script(script: &str, options: &RunOptions, become_root: bool) -> String {
    let mut parts = Vec::new();
    if let Some(cwd) = &options.cwd {
        parts.push(format!("cd {} &&", shell_quote(&cwd.display().to_string())));
    }
    for (key, value) in options.env.iter() {
        parts.push(format!("export {key}={} &&", shell_quote(value)));
    }
    let shell = if become_root { "sudo -E sh -c" } else { "sh -c" };
    parts.push(format!("{shell} {}", shell_quote(script)));
    parts.join(" ")
}

#[async_trait]
impl Guest for SshGuest {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    fn facts(&self) -> GuestFacts {
        GuestFacts {
            hostname: Some(self.host.clone()),
            become_root: self.become_root,
        }
    }

    fn supports_reboot(&self) -> bool {
        true
    }

    fn supports_parallel_provision(&self) -> bool {
        true
    }

    async fn run(&self, script: &str, options: &RunOptions) -> Result<CommandOutput, GuestError> {
        let mut command = self.ssh_command(options.tty);
        command.arg(remote_script(script, options, self.become_root));
        run_with_timeout(command, options.timeout).await
    }

    async fn push(&self, source: &Path, destination: &Path) -> Result<(), GuestError> {
        // Parent must exist before scp can place the file
        if let Some(parent) = destination.parent() {
            let mkdir = self
                .run(
                    &format!("mkdir -p {}", shell_quote(&parent.display().to_string())),
                    &RunOptions::default(),
                )
                .await?;
            if !mkdir.success() {
                return Err(GuestError::Transfer(mkdir.stderr));
            }
        }

        let mut command = Command::new("scp");
        command.args(self.common_options());
        if let Some(port) = self.port {
            command.args(["-P", &port.to_string()]);
        }
        command.args(["-r", "-p"]).arg(source);
        command.arg(format!("{}:{}", self.destination(), destination.display()));

        let output = run_with_timeout(command, None).await?;
        if output.exit_code != 0 {
            return Err(GuestError::Transfer(output.stderr));
        }
        Ok(())
    }

    async fn pull(&self, source: &Path, destination: &Path) -> Result<(), GuestError> {
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut command = Command::new("scp");
        command.args(self.common_options());
        if let Some(port) = self.port {
            command.args(["-P", &port.to_string()]);
        }
        command.args(["-r", "-p"]);
        command.arg(format!("{}:{}", self.destination(), source.display()));
        command.arg(destination);

        let output = run_with_timeout(command, None).await?;
        if output.exit_code != 0 {
            return Err(GuestError::Transfer(output.stderr));
        }
        Ok(())
    }

    async fn reboot(&self, options: RebootOptions) -> Result<(), GuestError> {
        let timeout = options.timeout.unwrap_or(DEFAULT_REBOOT_TIMEOUT);
        let deadline = tokio::time::Instant::now() + timeout;

        // Boot id identifies the current boot; a change proves the
        // reboot actually happened rather than a fast reconnect
        let boot_id_before = self.probe().await.ok().map(|o| o.stdout.trim().to_string());

        let reboot_command = options.command.as_deref().unwrap_or("reboot");
        tracing::info!(guest = self.name, command = reboot_command, "rebooting");

        // The connection usually dies mid-command; that is expected
        let _ = self
            .run(
                reboot_command,
                &RunOptions {
                    timeout: Some(Duration::from_secs(60)),
                    ..RunOptions::default()
                },
            )
            .await;

        loop {
            if tokio::time::Instant::now() >= deadline {
                return Err(GuestError::RebootTimeout {
                    guest: self.name.clone(),
                    timeout,
                });
            }
            tokio::time::sleep(RECONNECT_PROBE_INTERVAL).await;

            match self.probe().await {
                Ok(output) if output.success() => {
                    let boot_id_now = output.stdout.trim().to_string();
                    match &boot_id_before {
                        Some(before) if *before == boot_id_now => {
                            // Same boot, still going down
                            continue;
                        }
                        _ => {
                            tracing::info!(guest = self.name, "guest is back");
                            return Ok(());
                        }
                    }
                }
                _ => continue,
            }
        }
    }

    async fn release(&self) -> Result<(), GuestError> {
        let mut command = Command::new("ssh");
        command.args(self.common_options());
        command.args(["-O", "exit"]);
        command.arg(self.destination());
        // A dead master is as good as a closed one
        let _ = run_with_timeout(command, Some(Duration::from_secs(10))).await;
        Ok(())
    }
}

#[cfg(test)]
#[path = "ssh_tests.rs"]
mod tests;
