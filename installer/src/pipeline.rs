//! The resolve, fetch, verify, install and check workflow.
//!
//! One run moves through a fixed sequence of [`Stage`]s:
//!
//! ```text
//! Start → Probed → Selected | NoMatch → Fetched | FetchFailed
//!       → Verified | VerifyFailed → Installed | InstallFailed
//!       → Checked | CheckFailed
//! ```
//!
//! `Checked` is the only successful terminal state; every `*Failed` state
//! (and `NoMatch`) ends the run with an error. Nothing is retried, and
//! verification always completes before the first write to the prefix.

use crate::artefact::descriptor::ArtefactDescriptor;
use crate::artefact::download::{Fetcher, HttpFetcher};
use crate::artefact::extraction::{ArchiveExtractor, TarballExtractor};
use crate::artefact::sha256_digest::Sha256Digest;
use crate::artefact::verification::check_integrity;
use crate::builder::{BuildToolchain, CargoToolchain};
use crate::check::{CHECK_TIMEOUT, run_check};
use crate::error::{InstallerError, Result};
use crate::install::{InstallStrategy, Installer};
use crate::manifest::PackageManifest;
use crate::output::{InstallReport, write_stderr_line};
use crate::platform::Platform;
use crate::process::{CommandExecutor, SystemCommandExecutor};
use crate::selector::{Resolution, select, select_source};
use camino::Utf8Path;
use log::{debug, info};
use serde::Serialize;
use std::fmt;
use std::io::Write;

/// A state of the install workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// Nothing has happened yet.
    Start,
    /// The platform is known.
    Probed,
    /// An artefact was chosen.
    Selected,
    /// No artefact is installable on this platform.
    NoMatch,
    /// The artefact bytes are in memory.
    Fetched,
    /// The fetch collaborator failed.
    FetchFailed,
    /// The bytes matched the expected digest.
    Verified,
    /// The bytes did not match, or there was no digest.
    VerifyFailed,
    /// The binary is in the prefix.
    Installed,
    /// Extraction, copying or building failed.
    InstallFailed,
    /// The installed binary passed its self-test.
    Checked,
    /// The installed binary failed its self-test.
    CheckFailed,
}

impl Stage {
    /// Return the kebab-case name of the stage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Probed => "probed",
            Self::Selected => "selected",
            Self::NoMatch => "no-match",
            Self::Fetched => "fetched",
            Self::FetchFailed => "fetch-failed",
            Self::Verified => "verified",
            Self::VerifyFailed => "verify-failed",
            Self::Installed => "installed",
            Self::InstallFailed => "install-failed",
            Self::Checked => "checked",
            Self::CheckFailed => "check-failed",
        }
    }

    /// Whether the workflow stops in this state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        self.is_failure() || matches!(self, Self::Checked)
    }

    /// Whether this state ends the run unsuccessfully.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(
            self,
            Self::NoMatch
                | Self::FetchFailed
                | Self::VerifyFailed
                | Self::InstallFailed
                | Self::CheckFailed
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to install, where, and how.
#[derive(Debug, Clone)]
pub struct InstallRequest<'a> {
    /// The package to install.
    pub manifest: &'a PackageManifest,
    /// Platform to select artefacts for.
    pub platform: Platform,
    /// Directory to install into.
    pub prefix: &'a Utf8Path,
    /// Skip prebuilt binaries and build the source archive.
    pub build_from_source: bool,
    /// Digest to require instead of the manifest's.
    pub digest_override: Option<Sha256Digest>,
    /// Suppress progress output.
    pub quiet: bool,
}

/// The external collaborators a run depends on.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    /// Retrieves artefact bytes.
    pub fetcher: &'a dyn Fetcher,
    /// Unpacks archives.
    pub extractor: &'a dyn ArchiveExtractor,
    /// Builds source archives.
    pub toolchain: &'a dyn BuildToolchain,
    /// Runs the post-install check.
    pub checker: &'a dyn CommandExecutor,
}

/// Select the artefact a run would install, without fetching anything.
#[must_use]
pub fn resolve(
    manifest: &PackageManifest,
    platform: Platform,
    build_from_source: bool,
) -> Resolution<'_> {
    if build_from_source {
        select_source(manifest)
    } else {
        select(manifest, platform)
    }
}

/// Run the workflow with the production collaborators.
///
/// # Errors
///
/// As [`run_install`].
pub fn install(request: &InstallRequest<'_>, stderr: &mut dyn Write) -> Result<InstallReport> {
    let toolchain = CargoToolchain::default();
    let checker = SystemCommandExecutor::with_timeout(CHECK_TIMEOUT);
    let collaborators = Collaborators {
        fetcher: &HttpFetcher,
        extractor: &TarballExtractor,
        toolchain: &toolchain,
        checker: &checker,
    };
    run_install(request, collaborators, stderr)
}

/// Run the workflow with injected collaborators.
///
/// # Errors
///
/// Returns the error for whichever terminal failure state the run reached;
/// [`InstallerError::stage`] names that state.
pub fn run_install(
    request: &InstallRequest<'_>,
    collaborators: Collaborators<'_>,
    stderr: &mut dyn Write,
) -> Result<InstallReport> {
    let mut run = Run::new(stderr, request.quiet);
    let result = run.execute(request, collaborators);
    match &result {
        Ok(report) => info!(
            "{} {} installed to {}",
            report.package, report.version, report.binary
        ),
        Err(err) => {
            if let Some(stage) = err.stage() {
                run.advance(stage);
            }
            info!("install of {} failed: {err}", request.manifest.name());
        }
    }
    result
}

struct Run<'w> {
    stage: Stage,
    stderr: &'w mut dyn Write,
    quiet: bool,
}

impl<'w> Run<'w> {
    fn new(stderr: &'w mut dyn Write, quiet: bool) -> Self {
        Self {
            stage: Stage::Start,
            stderr,
            quiet,
        }
    }

    fn advance(&mut self, next: Stage) {
        debug!("stage {} -> {next}", self.stage);
        self.stage = next;
    }

    fn say(&mut self, message: impl fmt::Display) {
        if !self.quiet {
            write_stderr_line(&mut *self.stderr, message);
        }
    }

    fn execute(
        &mut self,
        request: &InstallRequest<'_>,
        collaborators: Collaborators<'_>,
    ) -> Result<InstallReport> {
        let manifest = request.manifest;
        self.advance(Stage::Probed);
        self.say(format_args!(
            "Installing {} {} for {}",
            manifest.name(),
            manifest.version(),
            request.platform
        ));

        let descriptor = self.select(request)?;
        let strategy = InstallStrategy::for_descriptor(&descriptor, manifest.binary());

        self.say(format_args!("Fetching {}", descriptor.url()));
        let bytes = collaborators
            .fetcher
            .fetch(descriptor.url())
            .map_err(|source| InstallerError::FetchFailed {
                url: descriptor.url().to_owned(),
                source,
            })?;
        self.advance(Stage::Fetched);
        debug!("fetched {} bytes", bytes.len());

        let digest = check_integrity(&bytes, descriptor.expected_digest()).map_err(|source| {
            InstallerError::VerificationFailed {
                url: descriptor.url().to_owned(),
                source,
            }
        })?;
        self.advance(Stage::Verified);
        self.say(format_args!("Verified sha256 {}", digest.short()));

        self.say(format_args!("Installing {strategy} into {}", request.prefix));
        let installed = Installer::new(collaborators.extractor, collaborators.toolchain)
            .install(&strategy, &bytes, request.prefix)?;
        self.advance(Stage::Installed);

        let expected_version = strategy.is_source_build().then_some(manifest.version());
        let outcome = run_check(
            collaborators.checker,
            &installed.binary,
            &manifest.metadata().check_flag,
            expected_version,
        );
        if !outcome.passed {
            return Err(InstallerError::CheckFailed {
                binary: outcome.binary,
                status: outcome.status,
                output: outcome.output,
                expected_version: expected_version.map(str::to_owned),
            });
        }
        self.advance(Stage::Checked);
        self.say(format_args!("Installed {}", installed.binary));

        Ok(InstallReport {
            package: manifest.name().to_owned(),
            version: manifest.version().to_owned(),
            platform: request.platform,
            url: descriptor.url().to_owned(),
            strategy: strategy.to_string(),
            sha256: digest,
            binary: installed.binary,
            stage: self.stage,
        })
    }

    fn select(&mut self, request: &InstallRequest<'_>) -> Result<ArtefactDescriptor> {
        let manifest = request.manifest;
        let Resolution::Selected(descriptor) =
            resolve(manifest, request.platform, request.build_from_source)
        else {
            return Err(InstallerError::NoMatchingArtefact {
                package: manifest.name().to_owned(),
                platform: request.platform,
            });
        };
        self.advance(Stage::Selected);

        Ok(match &request.digest_override {
            Some(digest) => {
                debug!("expected digest overridden with {digest}");
                descriptor.with_expected_digest(digest.clone())
            }
            None => descriptor.clone(),
        })
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
