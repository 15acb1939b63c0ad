//! Shared test utilities for the installer crate.

use crate::error::{InstallerError, Result};
use crate::process::CommandExecutor;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::process::{ExitStatus, Output};

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code.cast_unsigned())
}

/// Creates a successful command `Output` with empty stdout and stderr.
#[must_use]
pub fn success_output() -> Output {
    output_with(0, "", "")
}

/// Creates a failed command `Output` with the given stderr message.
#[must_use]
pub fn failure_output(stderr: &str) -> Output {
    output_with(1, "", stderr)
}

/// Creates a command `Output` with the given exit code and streams.
#[must_use]
pub fn output_with(code: i32, stdout: &str, stderr: &str) -> Output {
    Output {
        status: exit_status(code),
        stdout: stdout.as_bytes().to_vec(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Represents an expected command invocation for testing.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The command to execute (e.g., "cargo").
    pub cmd: String,
    /// The arguments to pass to the command.
    pub args: Vec<String>,
    /// The result to return when this command is invoked.
    pub result: Result<Output>,
}

impl ExpectedCall {
    /// Creates an expectation for `cmd args...` returning `result`.
    #[must_use]
    pub fn new(cmd: impl Into<String>, args: &[&str], result: Result<Output>) -> Self {
        Self {
            cmd: cmd.into(),
            args: args.iter().map(|&arg| arg.to_owned()).collect(),
            result,
        }
    }
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Records expected command invocations and returns predefined results,
/// allowing tests to verify command execution without side effects.
#[derive(Debug)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    #[must_use]
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
        }
    }

    /// Creates a `StubExecutor` that expects no invocations at all.
    #[must_use]
    pub fn unused() -> Self {
        Self::new(Vec::new())
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        assert!(
            self.expected.borrow().is_empty(),
            "expected no further command invocations"
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        let mut expected = self.expected.borrow_mut();
        let Some(call) = expected.pop_front() else {
            return Err(InstallerError::StubMismatch {
                message: format!("unexpected invocation: {cmd} {}", args.join(" ")),
            });
        };

        if call.cmd != cmd || call.args != args {
            return Err(InstallerError::StubMismatch {
                message: format!(
                    "expected `{} {}`, got `{cmd} {}`",
                    call.cmd,
                    call.args.join(" "),
                    args.join(" ")
                ),
            });
        }

        call.result
    }
}

/// Returns the lowercase hex SHA-256 digest of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    crate::artefact::sha256_digest::Sha256Digest::of_bytes(bytes)
        .as_str()
        .to_owned()
}

/// One entry of an in-memory tarball.
#[derive(Debug, Clone)]
pub struct TarEntry {
    /// Path of the entry inside the archive.
    pub path: String,
    /// File contents.
    pub contents: Vec<u8>,
    /// Unix permission bits.
    pub mode: u32,
}

impl TarEntry {
    /// A regular, non-executable file.
    #[must_use]
    pub fn file(path: &str, contents: &[u8]) -> Self {
        Self {
            path: path.to_owned(),
            contents: contents.to_vec(),
            mode: 0o644,
        }
    }

    /// An executable file.
    #[must_use]
    pub fn executable(path: &str, contents: &[u8]) -> Self {
        Self {
            mode: 0o755,
            ..Self::file(path, contents)
        }
    }
}

/// Builds an uncompressed tar stream from `entries`.
///
/// # Panics
///
/// Panics if an entry path cannot be encoded in a tar header.
#[must_use]
pub fn tarball(entries: &[TarEntry]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for entry in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(entry.contents.len() as u64);
        header.set_mode(entry.mode);
        header.set_entry_type(tar::EntryType::Regular);
        builder
            .append_data(&mut header, &entry.path, entry.contents.as_slice())
            .unwrap_or_else(|err| panic!("append {}: {err}", entry.path));
    }
    builder
        .into_inner()
        .unwrap_or_else(|err| panic!("finish tarball: {err}"))
}

/// Builds a gzip-compressed tarball from `entries`.
///
/// # Panics
///
/// Panics if compression fails.
#[must_use]
pub fn gzip_tarball(entries: &[TarEntry]) -> Vec<u8> {
    use std::io::Write;

    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder
        .write_all(&tarball(entries))
        .unwrap_or_else(|err| panic!("gzip tarball: {err}"));
    encoder
        .finish()
        .unwrap_or_else(|err| panic!("finish gzip: {err}"))
}

/// Builds a zstd-compressed tarball from `entries`.
///
/// # Panics
///
/// Panics if compression fails.
#[must_use]
pub fn zstd_tarball(entries: &[TarEntry]) -> Vec<u8> {
    zstd::encode_all(tarball(entries).as_slice(), 0)
        .unwrap_or_else(|err| panic!("zstd tarball: {err}"))
}
