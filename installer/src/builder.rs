//! Source builds.
//!
//! Building from source is delegated to a [`BuildToolchain`]. The default
//! implementation drives `cargo install`, which compiles the package and
//! places its binaries under `<prefix>/bin`.

use crate::error::Result;
use crate::process::{CommandExecutor, SystemCommandExecutor};
use camino::Utf8PathBuf;
use std::process::Output;
use std::time::Duration;

/// Time limit for a single source build.
pub const BUILD_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Everything a toolchain needs to build and install one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    /// Directory holding the unpacked sources (the one with `Cargo.toml`).
    pub source_dir: Utf8PathBuf,
    /// Install prefix; binaries must land in `<prefix>/bin`.
    pub prefix: Utf8PathBuf,
    /// Scratch directory for intermediate build output.
    pub target_dir: Utf8PathBuf,
    /// Whether to insist on the versions pinned in the lock file.
    pub locked: bool,
}

/// Builds a source tree into an install prefix.
#[cfg_attr(test, mockall::automock)]
pub trait BuildToolchain {
    /// Build and install the package described by `request`.
    ///
    /// A non-zero exit is reported through `Output::status`, not as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the toolchain cannot be started or times out.
    fn build(&self, request: &BuildRequest) -> Result<Output>;
}

/// Builds with `cargo install`.
///
/// `--force` lets a rebuild replace a binary already in the prefix, and
/// `--target-dir` keeps intermediate output inside the staging area.
#[derive(Debug, Clone)]
pub struct CargoToolchain<E = SystemCommandExecutor> {
    executor: E,
    cargo: String,
}

impl Default for CargoToolchain {
    fn default() -> Self {
        Self::new(SystemCommandExecutor::with_timeout(BUILD_TIMEOUT))
    }
}

impl<E: CommandExecutor> CargoToolchain<E> {
    /// Create a toolchain that runs `cargo` through `executor`.
    #[must_use]
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            cargo: "cargo".to_owned(),
        }
    }

    /// Use a specific cargo executable instead of the one on `PATH`.
    #[must_use]
    pub fn with_cargo(mut self, cargo: impl Into<String>) -> Self {
        self.cargo = cargo.into();
        self
    }
}

impl<E: CommandExecutor> BuildToolchain for CargoToolchain<E> {
    fn build(&self, request: &BuildRequest) -> Result<Output> {
        log::info!(
            "building {} into {}{}",
            request.source_dir,
            request.prefix,
            if request.locked { " (locked)" } else { "" }
        );
        self.executor.run(&self.cargo, &cargo_install_args(request))
    }
}

/// Return the arguments passed to `cargo` for `request`.
///
/// # Examples
///
/// ```
/// use camino::Utf8PathBuf;
/// use tarts_installer::builder::{BuildRequest, cargo_install_args};
///
/// let request = BuildRequest {
///     source_dir: Utf8PathBuf::from("/tmp/src"),
///     prefix: Utf8PathBuf::from("/opt/tarts"),
///     target_dir: Utf8PathBuf::from("/opt/tarts/.staging/target"),
///     locked: true,
/// };
/// assert_eq!(
///     cargo_install_args(&request),
///     [
///         "install", "--root", "/opt/tarts", "--path", "/tmp/src",
///         "--target-dir", "/opt/tarts/.staging/target", "--force", "--locked",
///     ]
/// );
/// ```
#[must_use]
pub fn cargo_install_args(request: &BuildRequest) -> Vec<&str> {
    let mut args = vec![
        "install",
        "--root",
        request.prefix.as_str(),
        "--path",
        request.source_dir.as_str(),
        "--target-dir",
        request.target_dir.as_str(),
        "--force",
    ];
    if request.locked {
        args.push("--locked");
    }
    args
}
