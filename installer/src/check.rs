//! Post-install self-test.
//!
//! The installed binary is run once with a single flag (normally
//! `--version`). A prebuilt binary passes if it exits zero; a source build
//! must additionally print the expected version, as a whole token, in its
//! combined output.

use crate::install::installed_binary_path;
use crate::process::{CommandExecutor, combined_output};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use std::time::Duration;

/// Time limit for the post-install check.
pub const CHECK_TIMEOUT: Duration = Duration::from_secs(30);

/// What the check observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    /// Path of the binary that was run.
    pub binary: Utf8PathBuf,
    /// Whether the binary satisfied the check.
    pub passed: bool,
    /// Exit code, or `None` if the binary could not be run to completion.
    pub status: Option<i32>,
    /// Combined stdout and stderr, or the reason the binary could not run.
    pub output: String,
}

/// Run `binary flag` and judge the result.
///
/// With `expected_version` set, the combined output must mention that
/// version as a whole token; otherwise any zero exit passes. Failing to run
/// the binary at all is a failed check, not an error.
#[must_use]
pub fn run_check(
    executor: &dyn CommandExecutor,
    binary: &Utf8Path,
    flag: &str,
    expected_version: Option<&str>,
) -> CheckOutcome {
    debug!("checking {binary} {flag}");
    let outcome = match executor.run(binary.as_str(), &[flag]) {
        Ok(output) => {
            let text = combined_output(&output);
            let version_seen =
                expected_version.is_none_or(|version| mentions_version(&text, version));
            CheckOutcome {
                binary: binary.to_owned(),
                passed: output.status.success() && version_seen,
                status: output.status.code(),
                output: text,
            }
        }
        Err(err) => CheckOutcome {
            binary: binary.to_owned(),
            passed: false,
            status: None,
            output: err.to_string(),
        },
    };
    if !outcome.passed {
        warn!("post-install check of {binary} failed: {}", outcome.output.trim());
    }
    outcome
}

/// Whether `text` contains `version` as a whole token, optionally prefixed
/// with `v`. `0.1.1` does not match `0.1.18`.
fn mentions_version(text: &str, version: &str) -> bool {
    text.split(|c: char| !(c.is_alphanumeric() || matches!(c, '.' | '-' | '+' | '_')))
        .map(|token| token.strip_prefix('v').unwrap_or(token))
        .any(|token| token == version)
}

/// Run the binary installed as `<prefix>/bin/<name>` and report whether it
/// passed.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use tarts_installer::check::check;
/// use tarts_installer::process::SystemCommandExecutor;
///
/// let executor = SystemCommandExecutor::default();
/// assert!(!check(&executor, Utf8Path::new("/nonexistent"), "tarts", "--version", None));
/// ```
#[must_use]
pub fn check(
    executor: &dyn CommandExecutor,
    prefix: &Utf8Path,
    name: &str,
    flag: &str,
    expected_version: Option<&str>,
) -> bool {
    run_check(
        executor,
        &installed_binary_path(prefix, name),
        flag,
        expected_version,
    )
    .passed
}
