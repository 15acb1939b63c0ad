//! Error types for the tarts installer.
//!
//! Every terminal failure of the install workflow is a variant here, carrying
//! the context a user needs to act on it: the URL that failed to fetch or
//! verify, and for build and check failures the exit status and captured
//! output of the process.

use crate::artefact::download::DownloadError;
use crate::artefact::verification::VerificationError;
use crate::manifest::ManifestError;
use crate::pipeline::Stage;
use crate::platform::Platform;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur while resolving or installing a package.
#[derive(Debug, Error)]
pub enum InstallerError {
    /// The manifest could not be loaded.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// No artefact in the manifest is installable on this platform.
    #[error("no installable artefact for {package} on {platform}")]
    NoMatchingArtefact {
        /// Package name from the manifest.
        package: String,
        /// The platform selection ran against.
        platform: Platform,
    },

    /// The fetch collaborator could not deliver the artefact.
    #[error("failed to fetch {url}")]
    FetchFailed {
        /// URL of the selected artefact.
        url: String,
        /// Transport failure.
        #[source]
        source: DownloadError,
    },

    /// The fetched bytes did not match the expected digest, or there was no
    /// digest to match against.
    #[error("integrity verification failed for {url}: {source}")]
    VerificationFailed {
        /// URL of the rejected artefact.
        url: String,
        /// Why verification failed.
        #[source]
        source: VerificationError,
    },

    /// The artefact could not be unpacked or lacked the expected binary.
    #[error("extraction failed: {reason}")]
    ExtractFailed {
        /// Description of the failure.
        reason: String,
    },

    /// The build collaborator exited unsuccessfully.
    #[error("build failed with {}: {output}", describe_status(*status))]
    BuildFailed {
        /// Exit code, or `None` if the process was killed by a signal.
        status: Option<i32>,
        /// Combined stdout and stderr of the build.
        output: String,
    },

    /// The installed binary failed its post-install check.
    #[error("post-install check of {binary} failed with {}{}", describe_status(*status), describe_expectation(expected_version.as_deref()))]
    CheckFailed {
        /// Path of the binary that was run.
        binary: Utf8PathBuf,
        /// Exit code, or `None` if the binary could not be run to completion.
        status: Option<i32>,
        /// Combined stdout and stderr of the check.
        output: String,
        /// Version string that was required in the output, if any.
        expected_version: Option<String>,
    },

    /// An external process exceeded its time limit and was killed.
    #[error("{command} timed out after {seconds} seconds")]
    CommandTimedOut {
        /// The command that was killed.
        command: String,
        /// The limit that was exceeded.
        seconds: u64,
    },

    /// The install prefix could not be created or written.
    #[error("install prefix {path} is unavailable: {reason}")]
    PrefixUnavailable {
        /// Path of the prefix.
        path: Utf8PathBuf,
        /// Description of the underlying I/O error.
        reason: String,
    },

    /// No default prefix could be derived because the platform has no data
    /// directory.
    #[error("could not determine a default install prefix; pass --prefix")]
    NoDefaultPrefix,

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to encode a report as JSON.
    #[error("failed to encode report: {0}")]
    ReportEncoding(#[from] serde_json::Error),

    /// Failed to write output.
    #[error("failed to write output")]
    WriteFailed {
        /// The underlying error that caused the write to fail.
        #[source]
        source: std::io::Error,
    },

    /// Test stub received an unexpected or mismatched command invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

impl InstallerError {
    /// Return the failed workflow state this error corresponds to.
    ///
    /// Errors raised outside the workflow (manifest loading, prefix
    /// discovery, report output) have no stage.
    ///
    /// # Examples
    ///
    /// ```
    /// use tarts_installer::error::InstallerError;
    /// use tarts_installer::pipeline::Stage;
    ///
    /// let err = InstallerError::BuildFailed { status: Some(101), output: String::new() };
    /// assert_eq!(err.stage(), Some(Stage::InstallFailed));
    /// ```
    #[must_use]
    pub const fn stage(&self) -> Option<Stage> {
        match self {
            Self::NoMatchingArtefact { .. } => Some(Stage::NoMatch),
            Self::FetchFailed { .. } => Some(Stage::FetchFailed),
            Self::VerificationFailed { .. } => Some(Stage::VerifyFailed),
            Self::ExtractFailed { .. }
            | Self::BuildFailed { .. }
            | Self::CommandTimedOut { .. }
            | Self::PrefixUnavailable { .. }
            | Self::Io(_) => Some(Stage::InstallFailed),
            Self::CheckFailed { .. } => Some(Stage::CheckFailed),
            Self::Manifest(_)
            | Self::NoDefaultPrefix
            | Self::ReportEncoding(_)
            | Self::WriteFailed { .. } => None,
            #[cfg(any(test, feature = "test-support"))]
            Self::StubMismatch { .. } => None,
        }
    }
}

fn describe_status(status: Option<i32>) -> String {
    status.map_or_else(|| "no exit code".to_owned(), |code| format!("exit code {code}"))
}

fn describe_expectation(expected_version: Option<&str>) -> String {
    expected_version.map_or_else(String::new, |version| {
        format!(" (output did not mention version {version})")
    })
}

/// Result type alias using [`InstallerError`].
pub type Result<T> = std::result::Result<T, InstallerError>;
