// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution shared by guest implementations

use crate::guest::{CommandOutput, GuestError};
use std::os::unix::process::CommandExt;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

/// Grace period between SIGTERM and SIGKILL on timeout
const KILL_GRACE: Duration = Duration::from_secs(5);

/// Run a prepared command, enforcing an optional wall-clock timeout.
///
/// On expiry the process group receives SIGTERM, then SIGKILL after a
/// short grace period, and [`GuestError::Timeout`] is returned.
pub(crate) async fn run_with_timeout(
    mut command: Command,
    timeout: Option<Duration>,
) -> Result<CommandOutput, GuestError> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    command.as_std_mut().process_group(0);

    let mut child = command
        .spawn()
        .map_err(|e| GuestError::Spawn(e.to_string()))?;
    let pid = child.id();

    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();
    let stdout_task = tokio::spawn(async move {
        let mut buffer = Vec::new();
        if let Some(pipe) = stdout_pipe.as_mut() {
            let _ = pipe.read_to_end(&mut buffer).await;
        }
        buffer
    });
    let stderr_task = tokio::spawn(async move {
        let mut buffer = Vec::new();
        if let Some(pipe) = stderr_pipe.as_mut() {
            let _ = pipe.read_to_end(&mut buffer).await;
        }
        buffer
    });

    let status = match timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                terminate_group(pid).await;
                if tokio::time::timeout(KILL_GRACE, child.wait()).await.is_err() {
                    let _ = child.kill().await;
                }
                return Err(GuestError::Timeout { timeout: limit });
            }
        },
        None => child.wait().await?,
    };

    let stdout = stdout_task.await.unwrap_or_default();
    let stderr = stderr_task.await.unwrap_or_default();

    Ok(CommandOutput {
        exit_code: status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    })
}

/// SIGTERM the whole process group so shell children die too
async fn terminate_group(pid: Option<u32>) {
    if let Some(pid) = pid {
        let _ = Command::new("kill")
            .args(["-TERM", &format!("-{pid}")])
            .output()
            .await;
    }
}

/// Single-quote a string for safe embedding in a shell command line
pub(crate) fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
#[path = "exec_tests.rs"]
mod tests;
