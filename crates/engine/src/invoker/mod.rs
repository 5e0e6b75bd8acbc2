// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test invoker.
//!
//! Runs one test invocation on one guest: builds the layered
//! environment, renders and pushes the wrappers, enforces the
//! wall-clock timeout, drives the reboot and restart loops, harvests
//! subresults and checks, interprets the outcome and persists the
//! result after every mutation.

pub mod checks;
pub mod harvest;
pub mod wrapper;

use crate::config::EngineConfig;
use crate::error::EngineError;
use harvest::Harvest;
use rig_core::{
    parse_duration, CheckEvent, Context, Environment, Framework, NodeId, Outcome,
    ResultInterpret, RunId, TestInvocation, TestResult,
};
use rig_guest::scripts::{ABORT_FILENAME, REBOOT_REQUEST_FILENAME};
use rig_guest::{Guest, GuestError, RebootOptions, RunOptions};
use rig_storage::{FailureRecord, ResultStore, Workdir};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default root for per-guest pidfile directories
const PIDFILE_ROOT: &str = "/var/tmp/tmt";

/// Verdict of one invocation as seen by the execute step
#[derive(Debug, Clone, Copy)]
pub struct InvocationReport {
    pub outcome: Outcome,
    /// The test asked to stop the whole run
    pub abort_requested: bool,
}

/// How one execution round of the wrapper ended
enum RoundEnd {
    Exited(i32),
    Failed { outcome: Outcome, note: String },
}

/// Per-guest test invoker
pub struct Invoker {
    pub config: Arc<EngineConfig>,
    pub run_id: RunId,
    pub plan_id: NodeId,
    pub plan_context: Context,
    /// Plan environment with `environment-file` layers already
    /// applied
    pub base_env: Environment,
    pub workdir: Workdir,
    pub store: Arc<ResultStore>,
    pub guest: Arc<dyn Guest>,
    pub scripts_dir: PathBuf,
    pub topology_bash: PathBuf,
    pub topology_yaml: PathBuf,
}

impl Invoker {
    /// Execute one invocation, persisting the result continuously.
    ///
    /// Engine-level failures are returned as errors; everything that
    /// is a property of the test (failure, timeout, lost guest)
    /// lands in the result instead.
    pub async fn run_test(
        &self,
        invocation: &mut TestInvocation,
    ) -> Result<InvocationReport, EngineError> {
        let test_name = invocation.test.name.clone();
        let invocation_dir = self.workdir.invocation_dir(
            &self.plan_id,
            self.guest.name(),
            &invocation.data_dir_name(),
        );
        let data_dir =
            self.workdir
                .test_data_dir(&self.plan_id, self.guest.name(), &invocation.data_dir_name());
        let checks_dir = invocation_dir.join("checks");
        let step_dir = self.workdir.step_dir(&self.plan_id, rig_core::StepKind::Execute);
        std::fs::create_dir_all(&data_dir)
            .map_err(|e| EngineError::Internal(format!("test data dir: {e}")))?;

        // A rerun reuses the data directory; stale protocol files
        // must not leak into this invocation
        use rig_guest::scripts::REPORT_RESULTS_FILENAME;
        for stale in [REPORT_RESULTS_FILENAME, ABORT_FILENAME, REBOOT_REQUEST_FILENAME] {
            let _ = std::fs::remove_file(data_dir.join(stale));
        }

        let mut result = TestResult::pending(
            test_name.clone(),
            invocation.serial_number,
            self.guest.identity(),
        );
        result.context = self.plan_context.clone();
        result.data_path = relative_to(&data_dir, &step_dir);
        self.store.insert(result.clone())?;

        let wrappers = wrapper::write_wrappers(&invocation_dir, invocation, &self.scripts_dir)?;
        self.guest.push(&invocation_dir, &invocation_dir).await?;

        let timeout = self.timeout(invocation)?;
        let start = chrono::Utc::now();

        tracing::info!(
            test = test_name,
            serial = invocation.serial_number,
            guest = self.guest.name(),
            "executing test"
        );

        let mut check_results = checks::run_checks(
            &invocation.test.check,
            CheckEvent::BeforeTest,
            self.guest.as_ref(),
            &checks_dir,
        )
        .await;

        let output_file = invocation_dir.join("output.txt");
        let end = self
            .execution_rounds(invocation, &wrappers, &invocation_dir, &data_dir, &output_file, timeout)
            .await?;

        check_results.extend(
            checks::run_checks(
                &invocation.test.check,
                CheckEvent::AfterTest,
                self.guest.as_ref(),
                &checks_dir,
            )
            .await,
        );

        // Harvest what the test reported about itself
        let mut harvest = match &end {
            RoundEnd::Exited(code) => match invocation.test.framework {
                Framework::Shell => harvest::harvest_shell(invocation, *code, &data_dir),
                Framework::Beakerlib => harvest::harvest_beakerlib(&data_dir),
            },
            RoundEnd::Failed { outcome, note } => Harvest {
                outcome: Some(*outcome),
                notes: vec![note.clone()],
                ..Harvest::default()
            },
        };

        // Restart exhaustion note
        if let RoundEnd::Exited(code) = &end {
            if invocation.test.restart_on_exit_code.contains(code)
                && invocation.restart_count >= invocation.test.restart_max_count
            {
                harvest.notes.push("restart limit reached".to_string());
            }
        }

        // Raw outcome: exit code or framework verdict, before
        // interpretation
        let raw = match (&end, invocation.test.framework) {
            (RoundEnd::Exited(code), Framework::Shell) => Outcome::from_exit_code(*code),
            (RoundEnd::Exited(_), Framework::Beakerlib) => {
                harvest.outcome.unwrap_or(Outcome::Error)
            }
            (RoundEnd::Failed { outcome, .. }, _) => *outcome,
        };

        result.result = raw;
        result.check = check_results;
        result.subresult = harvest.subresults;
        result.interpret(invocation.test.result);

        // Shell subresults reduce the effective outcome on top of
        // the interpreted one; the raw exit outcome stays visible as
        // original-result
        if matches!(end, RoundEnd::Exited(_))
            && invocation.test.framework == Framework::Shell
            && invocation.test.result != ResultInterpret::Restraint
            && !result.subresult.is_empty()
        {
            if let Some(reduced) = Outcome::reduce(
                result
                    .subresult
                    .iter()
                    .map(|s| s.result)
                    .chain([result.result]),
            ) {
                result.result = reduced;
            }
        }

        result.note.extend(harvest.notes);

        // The abort marker fails the current test and stops the run
        let abort_requested = data_dir.join(ABORT_FILENAME).exists();
        if abort_requested {
            result.result = Outcome::reduce([result.result, Outcome::Fail])
                .unwrap_or(Outcome::Fail);
            result.note.push("aborted by the test".to_string());
        }

        result.set_times(start, chrono::Utc::now());
        result.log = collect_logs(&invocation_dir, &step_dir);

        let outcome = result.result;
        self.store.insert(result)?;
        for independent in harvest.independent {
            self.store.insert(independent)?;
        }

        tracing::info!(
            test = test_name,
            guest = self.guest.name(),
            outcome = outcome.as_str(),
            "test finished"
        );

        Ok(InvocationReport {
            outcome,
            abort_requested,
        })
    }

    /// Run the wrapper until the test neither reboots nor restarts
    async fn execution_rounds(
        &self,
        invocation: &mut TestInvocation,
        wrappers: &wrapper::Wrappers,
        invocation_dir: &Path,
        data_dir: &Path,
        output_file: &Path,
        timeout: Option<Duration>,
    ) -> Result<RoundEnd, EngineError> {
        loop {
            let options = RunOptions {
                env: self.environment(invocation, data_dir),
                cwd: Some(invocation_dir.to_path_buf()),
                timeout,
                tty: invocation.test.tty,
            };

            let exit_code = match self.guest.run(&wrappers.command(), &options).await {
                Ok(output) => {
                    append_output(output_file, &output.stdout, &output.stderr);
                    output.exit_code
                }
                Err(GuestError::Timeout { timeout }) => {
                    return Ok(RoundEnd::Failed {
                        outcome: Outcome::Error,
                        note: format!("test timed out after {timeout:?}"),
                    });
                }
                Err(error @ GuestError::Unreachable { .. }) => {
                    self.record_guest_failure(invocation, &error)?;
                    return Ok(RoundEnd::Failed {
                        outcome: Outcome::Error,
                        note: format!("guest lost during test: {error}"),
                    });
                }
                Err(error) if error.is_transient() => {
                    self.record_guest_failure(invocation, &error)?;
                    return Ok(RoundEnd::Failed {
                        outcome: Outcome::Error,
                        note: format!("guest command failed: {error}"),
                    });
                }
                Err(error) => return Err(error.into()),
            };

            // Pull whatever the test produced so far; already
            // persisted data survives a dying guest
            if let Err(error) = self
                .guest
                .pull(invocation_dir, invocation_dir)
                .await
            {
                tracing::warn!(
                    guest = self.guest.name(),
                    error = %error,
                    "cannot pull test artifacts"
                );
            }

            // Reboot requested via tmt-reboot?
            let request_file = data_dir.join(REBOOT_REQUEST_FILENAME);
            if request_file.exists() {
                let reboot = parse_reboot_request(&request_file, self.config.reboot_timeout);
                let _ = std::fs::remove_file(&request_file);
                invocation.reboot_count += 1;
                tracing::info!(
                    guest = self.guest.name(),
                    reboot_count = invocation.reboot_count,
                    "test requested a reboot"
                );
                match self.guest.reboot(reboot).await {
                    Ok(()) => continue,
                    Err(error) => {
                        self.record_guest_failure(invocation, &error)?;
                        return Ok(RoundEnd::Failed {
                            outcome: Outcome::Error,
                            note: format!("reboot failed: {error}"),
                        });
                    }
                }
            }

            // Restart on the configured exit codes
            if invocation.test.restart_on_exit_code.contains(&exit_code)
                && invocation.restart_count < invocation.test.restart_max_count
            {
                invocation.restart_count += 1;
                tracing::info!(
                    test = invocation.test.name,
                    restart_count = invocation.restart_count,
                    exit_code,
                    "restarting test"
                );
                continue;
            }

            return Ok(RoundEnd::Exited(exit_code));
        }
    }

    /// Layer the per-test environment, engine variables on top
    fn environment(&self, invocation: &TestInvocation, data_dir: &Path) -> Environment {
        let mut env = self.base_env.clone();
        env.extend(&invocation.test.environment);

        let pidfile_root = self
            .config
            .pidfile_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(PIDFILE_ROOT));
        let pidfile_dir = pidfile_root.join(self.guest.name());
        let display = |path: &Path| path.display().to_string();

        env.set("TMT_TEST_NAME", invocation.test.name.clone());
        env.set("TMT_TEST_DATA", display(data_dir));
        env.set(
            "TMT_TEST_SERIAL_NUMBER",
            invocation.serial_number.to_string(),
        );
        env.set("TMT_TEST_ITERATION_ID", invocation.iteration_id(&self.run_id));
        env.set("TMT_TEST_PIDFILE", display(&pidfile_dir.join("tmt-test.pid")));
        env.set(
            "TMT_TEST_PIDFILE_LOCK",
            display(&pidfile_dir.join("tmt-test.pid.lock")),
        );
        env.set(
            "TMT_REBOOT_REQUEST",
            display(&data_dir.join(REBOOT_REQUEST_FILENAME)),
        );
        env.set("TMT_REBOOT_COUNT", invocation.reboot_count.to_string());
        env.set(
            "TMT_TEST_RESTART_COUNT",
            invocation.restart_count.to_string(),
        );
        env.set(
            "TMT_PLAN_DATA",
            display(&self.workdir.plan_data_dir(&self.plan_id)),
        );
        env.set("TMT_TREE", display(&self.config.tree_root));
        env.set("TMT_SCRIPTS_DIR", display(&self.scripts_dir));
        env.set("TMT_TOPOLOGY_BASH", display(&self.topology_bash));
        env.set("TMT_TOPOLOGY_YAML", display(&self.topology_yaml));
        if let Some(url) = &self.config.artifacts_url {
            env.set("TMT_REPORT_ARTIFACTS_URL", url.clone());
        }
        if self.config.debug > 0 {
            env.set("TMT_DEBUG", self.config.debug.to_string());
        }

        env
    }

    /// Wall-clock timeout from the test duration
    fn timeout(&self, invocation: &TestInvocation) -> Result<Option<Duration>, EngineError> {
        if self.config.ignore_duration {
            return Ok(None);
        }
        let duration =
            parse_duration(&invocation.test.duration).map_err(|e| EngineError::Duration {
                test: invocation.test.name.clone(),
                message: e.to_string(),
            })?;
        if duration.is_zero() {
            return Err(EngineError::Duration {
                test: invocation.test.name.clone(),
                message: "duration 0 needs an explicit --ignore-duration".to_string(),
            });
        }
        Ok(Some(duration))
    }

    fn record_guest_failure(
        &self,
        invocation: &TestInvocation,
        error: &GuestError,
    ) -> Result<(), EngineError> {
        self.store.record_failure(FailureRecord {
            name: invocation.test.name.clone(),
            serial_number: invocation.serial_number,
            guest: self.guest.name().to_string(),
            message: error.to_string(),
        })?;
        Ok(())
    }
}

/// Parse the reboot request written by `tmt-reboot`
fn parse_reboot_request(path: &Path, default_timeout: Option<Duration>) -> RebootOptions {
    let mut options = RebootOptions {
        command: None,
        timeout: default_timeout,
    };
    let Ok(content) = std::fs::read_to_string(path) else {
        return options;
    };
    for line in content.lines() {
        if let Some(command) = line.strip_prefix("command=") {
            if !command.is_empty() {
                options.command = Some(command.to_string());
            }
        } else if let Some(timeout) = line.strip_prefix("timeout=") {
            if let Ok(seconds) = timeout.trim().parse::<u64>() {
                options.timeout = Some(Duration::from_secs(seconds));
            }
        }
    }
    options
}

fn append_output(path: &Path, stdout: &str, stderr: &str) {
    use std::io::Write;
    let opened = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path);
    if let Ok(mut file) = opened {
        let _ = file.write_all(stdout.as_bytes());
        let _ = file.write_all(stderr.as_bytes());
    }
}

/// Every file of the invocation directory, relative to the execute
/// step directory
fn collect_logs(invocation_dir: &Path, step_dir: &Path) -> Vec<PathBuf> {
    let mut logs = Vec::new();
    collect_files(invocation_dir, &mut logs);
    logs.sort();
    logs.into_iter()
        .filter_map(|path| relative_to(&path, step_dir))
        .collect()
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, files);
        } else {
            files.push(path);
        }
    }
}

fn relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    path.strip_prefix(base).ok().map(Path::to_path_buf)
}

#[cfg(test)]
#[path = "invoker_tests.rs"]
mod tests;
