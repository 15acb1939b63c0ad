//! Output formatting for the installer CLI.
//!
//! Progress lines go to stderr; reports of what was resolved or installed
//! go to stdout, either as text or, for `resolve --json`, as JSON.

use crate::artefact::descriptor::{ArtefactDescriptor, ArtefactKind};
use crate::artefact::sha256_digest::Sha256Digest;
use crate::pipeline::Stage;
use crate::platform::Platform;
use crate::selector::Resolution;
use camino::Utf8PathBuf;
use serde::Serialize;
use std::fmt::Display;
use std::io::Write;

/// Write one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort progress output; ignore write failures.
    }
}

/// Summary of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Package name.
    pub package: String,
    /// Package version.
    pub version: String,
    /// Platform the artefact was selected for.
    pub platform: Platform,
    /// URL the artefact was fetched from.
    pub url: String,
    /// How the binary was produced.
    pub strategy: String,
    /// Digest the fetched bytes were verified against.
    pub sha256: Sha256Digest,
    /// Path of the installed executable.
    pub binary: Utf8PathBuf,
    /// Final workflow state.
    pub stage: Stage,
}

impl InstallReport {
    /// Format the report for display.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8PathBuf;
    /// use tarts_installer::artefact::sha256_digest::Sha256Digest;
    /// use tarts_installer::output::InstallReport;
    /// use tarts_installer::pipeline::Stage;
    /// use tarts_installer::platform::{Arch, OsFamily, Platform};
    ///
    /// let report = InstallReport {
    ///     package: "tarts".to_owned(),
    ///     version: "0.1.18".to_owned(),
    ///     platform: Platform::new(OsFamily::Macos, Arch::Arm64),
    ///     url: "https://example.test/tarts.tar.gz".to_owned(),
    ///     strategy: "prebuilt binary".to_owned(),
    ///     sha256: Sha256Digest::of_bytes(b"tarts"),
    ///     binary: Utf8PathBuf::from("/opt/tarts/bin/tarts"),
    ///     stage: Stage::Checked,
    /// };
    /// assert!(report.display_text().contains("/opt/tarts/bin/tarts"));
    /// ```
    #[must_use]
    pub fn display_text(&self) -> String {
        [
            format!("Installed {} {} ({})", self.package, self.version, self.platform),
            format!("  binary:   {}", self.binary),
            format!("  strategy: {}", self.strategy),
            format!("  source:   {}", self.url),
            format!("  sha256:   {}", self.sha256),
            format!("  stage:    {}", self.stage),
        ]
        .join("\n")
    }
}

/// What `resolve` found, without fetching anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolveReport {
    /// Package name.
    pub package: String,
    /// Package version.
    pub version: String,
    /// Platform selection ran against.
    pub platform: Platform,
    /// Rust target triple of the platform, when it has one.
    pub target: Option<&'static str>,
    /// The chosen artefact, or `None` for no match.
    pub selected: Option<ArtefactDescriptor>,
}

impl ResolveReport {
    /// Build a report from a selection result.
    #[must_use]
    pub fn new(package: &str, version: &str, platform: Platform, resolution: Resolution<'_>) -> Self {
        Self {
            package: package.to_owned(),
            version: version.to_owned(),
            platform,
            target: platform.target_triple(),
            selected: resolution.descriptor().cloned(),
        }
    }

    /// Format the report for display.
    #[must_use]
    pub fn display_text(&self) -> String {
        let mut lines = vec![
            format!("Package:  {} {}", self.package, self.version),
            format!("Platform: {}", self.platform),
        ];
        if let Some(target) = self.target {
            lines.push(format!("Target:   {target}"));
        }

        let Some(descriptor) = &self.selected else {
            lines.push("Selected: no match".to_owned());
            return lines.join("\n");
        };
        let strategy = match descriptor.kind() {
            ArtefactKind::PrebuiltBinary { .. } => "install prebuilt binary",
            ArtefactKind::SourceArchive => "build from source",
        };
        lines.push(format!("Selected: {}", descriptor.kind()));
        lines.push(format!("Action:   {strategy}"));
        lines.push(format!("URL:      {}", descriptor.url()));
        lines.push(match descriptor.expected_digest() {
            Some(digest) => format!("SHA-256:  {digest}"),
            None => "SHA-256:  missing (installation will fail verification)".to_owned(),
        });
        lines.join("\n")
    }
}
