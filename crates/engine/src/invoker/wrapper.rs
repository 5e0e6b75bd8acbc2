// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test wrapper scripts.
//!
//! Two wrappers envelop every test. The inner one holds the test
//! script itself, giving the engine a single executable to invoke
//! regardless of how complicated the script is. The outer one
//! maintains the pidfile under its flock (the contract `tmt-reboot`
//! relies on), arranges tty or no-tty execution and propagates the
//! original exit code.

use crate::error::EngineError;
use minijinja::Environment as TemplateEnvironment;
use rig_core::{Framework, TestInvocation};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Exit code of the outer wrapper when the pidfile cannot be created
pub const PIDFILE_ENTER_FAILED: i32 = 122;
/// Exit code of the outer wrapper when the pidfile cannot be removed
pub const PIDFILE_EXIT_FAILED: i32 = 123;

const OUTER_TEMPLATE: &str = r#"#!/bin/bash
# Make sure the helper scripts are on the path
case ":$PATH:" in
    *":{{ scripts_dir }}:"*) ;;
    *) export PATH="{{ scripts_dir }}:$PATH" ;;
esac

[ -n "${TMT_DEBUG:-}" ] && set -x

test_pid="$$"

# Updating the test pid file
mkdir -p "$(dirname "$TMT_TEST_PIDFILE_LOCK")"
flock "$TMT_TEST_PIDFILE_LOCK" -c "echo \"$test_pid $TMT_REBOOT_REQUEST\" > \"$TMT_TEST_PIDFILE\"" || exit {{ enter_failed }}

{% if tty -%}
set -o pipefail
./{{ inner }} 2>&1
_exit_code="$?"
{%- else -%}
set -o pipefail
./{{ inner }} </dev/null 2>&1 | cat
_exit_code="$?"
{%- endif %}

# Updating the test pid file
flock "$TMT_TEST_PIDFILE_LOCK" -c "rm -f \"$TMT_TEST_PIDFILE\"" || exit {{ exit_failed }}

# Return the original exit code of the test script
exit $_exit_code
"#;

/// Paths of the two wrapper scripts written for one invocation
#[derive(Debug, Clone)]
pub struct Wrappers {
    pub outer: PathBuf,
    pub inner: PathBuf,
}

impl Wrappers {
    /// The command the invoker runs on the guest
    pub fn command(&self) -> String {
        match self.outer.file_name().and_then(|n| n.to_str()) {
            Some(name) => format!("./{name}"),
            None => self.outer.display().to_string(),
        }
    }
}

/// Inner wrapper content for the test's framework
fn inner_content(invocation: &TestInvocation) -> String {
    let script = &invocation.test.test;
    match invocation.test.framework {
        Framework::Shell => format!("#!/bin/bash\n{script}\n"),
        // Beakerlib keeps its journal under the test data directory
        Framework::Beakerlib => format!(
            "#!/bin/bash\nexport BEAKERLIB_DIR=\"$TMT_TEST_DATA/beakerlib\"\n\
             mkdir -p \"$BEAKERLIB_DIR\"\n{script}\n"
        ),
    }
}

/// Write both wrappers into the invocation directory.
///
/// Filenames carry the test name and serial number so concurrent
/// guests handling the same discover phase never share a wrapper.
pub fn write_wrappers(
    invocation_dir: &Path,
    invocation: &TestInvocation,
    scripts_dir: &Path,
) -> Result<Wrappers, EngineError> {
    let safe_name = invocation.test.pathless_safe_name();
    let serial = invocation.serial_number;
    let inner_name = format!("test-wrapper-inner.sh-{safe_name}-{serial}");
    let outer_name = format!("test-wrapper-outer.sh-{safe_name}-{serial}");

    let mut templates = TemplateEnvironment::new();
    templates
        .add_template("outer", OUTER_TEMPLATE)
        .map_err(|e| EngineError::Internal(format!("outer wrapper template: {e}")))?;
    let outer_content = templates
        .get_template("outer")
        .and_then(|template| {
            template.render(minijinja::context! {
                scripts_dir => scripts_dir.display().to_string(),
                inner => inner_name,
                tty => invocation.test.tty,
                enter_failed => PIDFILE_ENTER_FAILED,
                exit_failed => PIDFILE_EXIT_FAILED,
            })
        })
        .map_err(|e| EngineError::Internal(format!("outer wrapper render: {e}")))?;

    std::fs::create_dir_all(invocation_dir)
        .map_err(|e| EngineError::Internal(format!("invocation dir: {e}")))?;

    let inner = invocation_dir.join(&inner_name);
    let outer = invocation_dir.join(&outer_name);
    write_executable(&inner, &inner_content(invocation))?;
    write_executable(&outer, &outer_content)?;

    Ok(Wrappers { outer, inner })
}

fn write_executable(path: &Path, content: &str) -> Result<(), EngineError> {
    std::fs::write(path, content)
        .map_err(|e| EngineError::Internal(format!("write {}: {e}", path.display())))?;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .map_err(|e| EngineError::Internal(format!("chmod {}: {e}", path.display())))?;
    Ok(())
}

#[cfg(test)]
#[path = "wrapper_tests.rs"]
mod tests;
