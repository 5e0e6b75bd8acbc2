// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `rig run` command

use crate::metadata;
use clap::Args;
use rig_core::{Context, StepKind};
use rig_engine::{EngineConfig, EngineError, RunRequest, Runner};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Exit code for internal engine errors
const EXIT_INTERNAL_ERROR: i32 = 3;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Run directory (absolute path)
    #[arg(long, value_name = "PATH")]
    pub id: Option<PathBuf>,

    /// Reuse the previous run
    #[arg(long, conflicts_with = "id")]
    pub last: bool,

    /// Purge the run directory before starting
    #[arg(long)]
    pub scratch: bool,

    /// Remove the workdir after a fully successful run
    #[arg(long, conflicts_with = "keep")]
    pub remove: bool,

    /// Cancel a previously recorded removal intent
    #[arg(long)]
    pub keep: bool,

    /// Re-execute a step, preserving its output directory
    #[arg(long, value_name = "STEP", value_parser = parse_step)]
    pub again: Vec<StepKind>,

    /// Re-execute a step from scratch, discarding downstream state
    #[arg(long, value_name = "STEP", value_parser = parse_step)]
    pub force: Vec<StepKind>,

    /// Run only tests whose previous result was fail or error
    #[arg(long)]
    pub failed_only: bool,

    /// Disable test duration timeouts
    #[arg(long)]
    pub ignore_duration: bool,

    /// Stop executing after the first failed or errored test
    #[arg(long)]
    pub exit_first: bool,

    /// Fail when a phase's `where` matches no guest
    #[arg(long)]
    pub strict_where: bool,

    /// Select plans by name (regular expression, repeatable)
    #[arg(short, long, value_name = "REGEX")]
    pub name: Vec<String>,

    /// Metadata tree root
    #[arg(long, value_name = "PATH", default_value = ".")]
    pub root: PathBuf,

    /// Workdir root holding run directories
    #[arg(long, value_name = "PATH", default_value = "/var/tmp/rig")]
    pub workdir_root: PathBuf,

    /// Context dimension (key=value, repeatable)
    #[arg(short, long, value_name = "KEY=VALUE")]
    pub context: Vec<String>,
}

fn parse_step(value: &str) -> Result<StepKind, String> {
    StepKind::parse(value).ok_or_else(|| format!("unknown step '{value}'"))
}

pub async fn handle(args: RunArgs, verbosity: u8) -> i32 {
    match run(args, verbosity).await {
        Ok(code) => code,
        Err(error) => {
            report_internal_error(&error);
            EXIT_INTERNAL_ERROR
        }
    }
}

async fn run(args: RunArgs, verbosity: u8) -> anyhow::Result<i32> {
    let tree_root = args
        .root
        .canonicalize()
        .unwrap_or_else(|_| args.root.clone());
    let source = metadata::load_source(&tree_root)?;

    let mut config = EngineConfig::new(args.workdir_root.clone(), tree_root);
    config.context = Context::from_pairs(args.context.iter().map(String::as_str))
        .map_err(|e| anyhow::anyhow!("invalid context: {e}"))?;
    config.debug = verbosity;
    config.exit_first = args.exit_first;
    config.ignore_duration = args.ignore_duration;
    config.strict_where = args.strict_where;
    config.failed_only = args.failed_only;
    config.again = args.again.clone();
    config.force = args.force.clone();
    config.plan_names = args.name.clone();
    config.artifacts_url = std::env::var("TMT_REPORT_ARTIFACTS_URL").ok();
    config.reboot_timeout = std::env::var("TMT_REBOOT_TIMEOUT")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs);
    config.scripts_dir = std::env::var("TMT_SCRIPTS_DIR").ok().map(PathBuf::from);
    config.pidfile_root = std::env::var("TMT_TEST_PIDFILE_ROOT").ok().map(PathBuf::from);

    let request = RunRequest {
        id: args.id,
        last: args.last,
        scratch: args.scratch,
        remove: args.remove,
        keep: args.keep,
    };

    let summary = match Runner::new(config, Arc::new(source)).run(request).await {
        Ok(summary) => summary,
        Err(error) => {
            report_engine_error(&error);
            return Ok(EXIT_INTERNAL_ERROR);
        }
    };

    println!("run: {}", summary.run_root.display());
    for result in &summary.results {
        println!(
            "{:>5}  {} (on {})",
            result.result.as_str(),
            result.name,
            result.guest.name
        );
    }
    Ok(summary.exit_code())
}

fn report_engine_error(error: &EngineError) {
    eprintln!("error: {error}");
    print_traceback(error as &dyn std::error::Error);
}

fn report_internal_error(error: &anyhow::Error) {
    eprintln!("error: {error}");
    print_traceback(error.as_ref());
}

/// Honor `TMT_SHOW_TRACEBACK`: `0` message only, `1` the error
/// chain, `2` the debug representation as well
fn print_traceback(error: &dyn std::error::Error) {
    let level = std::env::var("TMT_SHOW_TRACEBACK").unwrap_or_default();
    if matches!(level.as_str(), "1" | "2") {
        let mut source = error.source();
        while let Some(cause) = source {
            eprintln!("caused by: {cause}");
            source = cause.source();
        }
    }
    if level == "2" {
        eprintln!("{error:?}");
    }
}
