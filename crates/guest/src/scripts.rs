// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Helper scripts installed on every guest.
//!
//! Tests talk back to the engine through small shell helpers placed
//! into the scripts directory: requesting a reboot, reporting partial
//! results, aborting the run and submitting files. The file-based
//! protocol is what the test invoker inspects after every exit.

use crate::guest::{Guest, GuestError, RunOptions};
use std::path::Path;

/// Default directory for helper scripts on a guest
pub const DEFAULT_SCRIPTS_DIR: &str = "/usr/local/bin";

/// Reboot request file inside the test data directory
pub const REBOOT_REQUEST_FILENAME: &str = "reboot-request";
/// Reported subresults file inside the test data directory
pub const REPORT_RESULTS_FILENAME: &str = "tmt-report-results.yaml";
/// Abort marker file inside the test data directory
pub const ABORT_FILENAME: &str = "tmt-abort";
/// Log of submitted files inside the test data directory
pub const SUBMITTED_FILES_FILENAME: &str = "tmt-submitted-files.log";

/// One helper script
#[derive(Debug, Clone, Copy)]
pub struct HelperScript {
    pub name: &'static str,
    pub content: &'static str,
}

/// Request a guest reboot from inside a test.
///
/// Writes the reboot request under the pidfile lock, then kills the
/// test wrapper so the invoker regains control.
pub const TMT_REBOOT: HelperScript = HelperScript {
    name: "tmt-reboot",
    content: r#"#!/bin/sh
set -eu

REBOOT_COMMAND=""
REBOOT_TIMEOUT=""
SKIP_EFI=0

while getopts "c:t:e" option; do
    case "$option" in
        c) REBOOT_COMMAND="$OPTARG" ;;
        t) REBOOT_TIMEOUT="$OPTARG" ;;
        e) SKIP_EFI=1 ;;
        *) echo "usage: tmt-reboot [-c command] [-t timeout] [-e]" >&2; exit 2 ;;
    esac
done

if [ -z "${TMT_TEST_PIDFILE:-}" ]; then
    echo "tmt-reboot can only be used during test execution" >&2
    exit 1
fi

export REBOOT_COMMAND REBOOT_TIMEOUT SKIP_EFI

mkdir -p "$(dirname "$TMT_TEST_PIDFILE_LOCK")"
flock "$TMT_TEST_PIDFILE_LOCK" sh -eu -c '
    read -r pid request < "$TMT_TEST_PIDFILE"
    mkdir -p "$(dirname "$request")"
    {
        echo "command=$REBOOT_COMMAND"
        echo "timeout=$REBOOT_TIMEOUT"
        echo "efi=$SKIP_EFI"
    } > "$request"
    kill "$pid" || echo "tmt-reboot: test already finished, try again later" >&2
'
"#,
};

/// Report one named result from inside a shell test
pub const TMT_REPORT_RESULT: HelperScript = HelperScript {
    name: "tmt-report-result",
    content: r#"#!/bin/sh
set -eu

OUTPUT_FILE=""
while getopts "o:" option; do
    case "$option" in
        o) OUTPUT_FILE="$OPTARG" ;;
        *) echo "usage: tmt-report-result [-o file] NAME RESULT" >&2; exit 2 ;;
    esac
done
shift $((OPTIND - 1))

if [ "$#" -lt 2 ]; then
    echo "usage: tmt-report-result [-o file] NAME RESULT" >&2
    exit 2
fi

if [ -z "${TMT_TEST_DATA:-}" ]; then
    echo "tmt-report-result can only be used during test execution" >&2
    exit 1
fi

name="$1"
result=$(echo "$2" | tr '[:upper:]' '[:lower:]')

mkdir -p "$TMT_TEST_DATA"
{
    printf -- '- name: "%s"\n' "$name"
    printf '  result: "%s"\n' "$result"
    if [ -n "$OUTPUT_FILE" ]; then
        printf '  log: ["%s"]\n' "$OUTPUT_FILE"
    fi
} >> "$TMT_TEST_DATA/tmt-report-results.yaml"
"#,
};

/// Abort the whole run from inside a test
pub const TMT_ABORT: HelperScript = HelperScript {
    name: "tmt-abort",
    content: r#"#!/bin/sh
set -eu

if [ -z "${TMT_TEST_DATA:-}" ]; then
    echo "tmt-abort can only be used during test execution" >&2
    exit 1
fi

mkdir -p "$TMT_TEST_DATA"
touch "$TMT_TEST_DATA/tmt-abort"
"#,
};

/// Archive a file into the test data directory
pub const TMT_FILE_SUBMIT: HelperScript = HelperScript {
    name: "tmt-file-submit",
    content: r#"#!/bin/sh
set -eu

if [ "$#" -lt 1 ]; then
    echo "usage: tmt-file-submit FILE..." >&2
    exit 2
fi

if [ -z "${TMT_TEST_DATA:-}" ]; then
    echo "tmt-file-submit can only be used during test execution" >&2
    exit 1
fi

mkdir -p "$TMT_TEST_DATA"
for file in "$@"; do
    cp "$file" "$TMT_TEST_DATA/"
    basename "$file" >> "$TMT_TEST_DATA/tmt-submitted-files.log"
done
"#,
};

/// Every helper in installation order
pub const ALL: [HelperScript; 4] = [TMT_REBOOT, TMT_REPORT_RESULT, TMT_ABORT, TMT_FILE_SUBMIT];

/// Install the helper scripts into `scripts_dir` on the guest.
///
/// The scripts are staged locally first so a plain `push` suffices.
pub async fn install(
    guest: &dyn Guest,
    staging_dir: &Path,
    scripts_dir: &Path,
) -> Result<(), GuestError> {
    std::fs::create_dir_all(staging_dir)?;
    for script in ALL {
        let local_path = staging_dir.join(script.name);
        std::fs::write(&local_path, script.content)?;
        let remote_path = scripts_dir.join(script.name);
        guest.push(&local_path, &remote_path).await?;
        let chmod = guest
            .run(
                &format!("chmod 755 '{}'", remote_path.display()),
                &RunOptions::default(),
            )
            .await?;
        if !chmod.success() {
            return Err(GuestError::Transfer(format!(
                "cannot mark {} executable: {}",
                remote_path.display(),
                chmod.stderr
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "scripts_tests.rs"]
mod tests;
