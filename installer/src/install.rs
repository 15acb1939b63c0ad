//! Installing a verified artefact into a prefix.
//!
//! The strategy follows from the descriptor kind: a prebuilt binary is
//! unpacked and copied to `<prefix>/bin/<binary>`, a source archive is
//! unpacked and handed to the build toolchain. Either way the archive is
//! staged in a temporary directory inside the prefix, so nothing is written
//! outside it, and the staging directory is removed when installation ends.

use crate::artefact::descriptor::ArtefactDescriptor;
use crate::artefact::extraction::ArchiveExtractor;
use crate::builder::{BuildRequest, BuildToolchain};
use crate::error::{InstallerError, Result};
use crate::process::combined_output;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use std::fmt;
use std::path::PathBuf;

/// Prefix of the staging directory created inside the install prefix.
const STAGING_PREFIX: &str = ".tarts-staging-";

/// How a descriptor is turned into an installed binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallStrategy {
    /// Copy a ready-made executable out of the archive.
    PrebuiltBinary {
        /// File name of the executable inside the archive.
        binary: String,
    },
    /// Build the unpacked sources with the toolchain.
    SourceBuild {
        /// File name of the executable the build produces.
        binary: String,
        /// Whether to request a build pinned to the lock file.
        locked: bool,
    },
}

impl InstallStrategy {
    /// Choose the strategy for `descriptor`.
    ///
    /// # Examples
    ///
    /// ```
    /// use tarts_installer::artefact::descriptor::ArtefactDescriptor;
    /// use tarts_installer::install::InstallStrategy;
    ///
    /// let source = ArtefactDescriptor::source("https://example.test/src.tar.gz", None);
    /// assert_eq!(
    ///     InstallStrategy::for_descriptor(&source, "tarts"),
    ///     InstallStrategy::SourceBuild { binary: "tarts".to_owned(), locked: true },
    /// );
    /// ```
    #[must_use]
    pub fn for_descriptor(descriptor: &ArtefactDescriptor, binary: &str) -> Self {
        if descriptor.is_source() {
            Self::SourceBuild {
                binary: binary.to_owned(),
                locked: true,
            }
        } else {
            Self::PrebuiltBinary {
                binary: binary.to_owned(),
            }
        }
    }

    /// Return the executable's file name.
    #[must_use]
    pub fn binary(&self) -> &str {
        match self {
            Self::PrebuiltBinary { binary } | Self::SourceBuild { binary, .. } => binary,
        }
    }

    /// Whether the binary is produced by a source build.
    #[must_use]
    pub const fn is_source_build(&self) -> bool {
        matches!(self, Self::SourceBuild { .. })
    }
}

impl fmt::Display for InstallStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrebuiltBinary { .. } => f.write_str("prebuilt binary"),
            Self::SourceBuild { locked: true, .. } => f.write_str("source build (locked)"),
            Self::SourceBuild { locked: false, .. } => f.write_str("source build"),
        }
    }
}

/// A binary that has been placed in the prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installed {
    /// Absolute path of the installed executable.
    pub binary: Utf8PathBuf,
}

/// Result of installing one artefact.
pub type InstallOutcome = Result<Installed>;

/// Return `<prefix>/bin/<binary>`.
#[must_use]
pub fn installed_binary_path(prefix: &Utf8Path, binary: &str) -> Utf8PathBuf {
    prefix.join("bin").join(binary)
}

/// Installs verified archives using injected collaborators.
pub struct Installer<'a> {
    extractor: &'a dyn ArchiveExtractor,
    toolchain: &'a dyn BuildToolchain,
}

impl<'a> Installer<'a> {
    /// Create an installer.
    #[must_use]
    pub fn new(extractor: &'a dyn ArchiveExtractor, toolchain: &'a dyn BuildToolchain) -> Self {
        Self {
            extractor,
            toolchain,
        }
    }

    /// Install `archive` into `prefix` using `strategy`.
    ///
    /// `archive` must already have passed integrity verification.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::PrefixUnavailable`] if the prefix cannot be
    /// prepared, [`InstallerError::ExtractFailed`] if the archive is invalid
    /// or lacks the expected content, and [`InstallerError::BuildFailed`] if
    /// the toolchain exits unsuccessfully.
    pub fn install(
        &self,
        strategy: &InstallStrategy,
        archive: &[u8],
        prefix: &Utf8Path,
    ) -> InstallOutcome {
        let staging = Staging::create(prefix)?;
        let files = self
            .extractor
            .extract(archive, staging.path().as_std_path())
            .map_err(|err| InstallerError::ExtractFailed {
                reason: err.to_string(),
            })?;
        debug!("unpacked {} files into {}", files.len(), staging.path());

        let binary = match strategy {
            InstallStrategy::PrebuiltBinary { binary } => {
                install_prebuilt(&staging, &files, binary, prefix)?
            }
            InstallStrategy::SourceBuild { binary, locked } => {
                self.build_from_source(&staging, binary, *locked, prefix)?
            }
        };
        info!("installed {binary}");
        Ok(Installed { binary })
    }

    fn build_from_source(
        &self,
        staging: &Staging,
        binary: &str,
        locked: bool,
        prefix: &Utf8Path,
    ) -> Result<Utf8PathBuf> {
        let request = BuildRequest {
            source_dir: find_source_root(staging.path())?,
            prefix: prefix.to_owned(),
            target_dir: staging.path().join("target"),
            locked,
        };
        let output = self.toolchain.build(&request)?;
        if !output.status.success() {
            return Err(InstallerError::BuildFailed {
                status: output.status.code(),
                output: combined_output(&output),
            });
        }
        Ok(installed_binary_path(prefix, binary))
    }
}

fn install_prebuilt(
    staging: &Staging,
    files: &[PathBuf],
    binary: &str,
    prefix: &Utf8Path,
) -> Result<Utf8PathBuf> {
    let found = files
        .iter()
        .filter(|path| path.file_name().is_some_and(|name| name == binary))
        .min_by_key(|path| path.components().count())
        .ok_or_else(|| InstallerError::ExtractFailed {
            reason: format!("archive does not contain `{binary}`"),
        })?;

    let destination = installed_binary_path(prefix, binary);
    if let Some(bin_dir) = destination.parent() {
        std::fs::create_dir_all(bin_dir)?;
    }
    // `fs::copy` carries the permission bits over, including the executable bit.
    std::fs::copy(staging.path().as_std_path().join(found), &destination)?;
    Ok(destination)
}

/// Locate the directory holding `Cargo.toml`: either the staging root or its
/// single top-level directory.
fn find_source_root(staging: &Utf8Path) -> Result<Utf8PathBuf> {
    if staging.join("Cargo.toml").is_file() {
        return Ok(staging.to_owned());
    }

    let mut dirs = Vec::new();
    for entry in staging.read_dir_utf8()? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.into_path());
        }
    }

    match dirs.as_slice() {
        [only] if only.join("Cargo.toml").is_file() => Ok(only.clone()),
        _ => Err(InstallerError::ExtractFailed {
            reason: "source archive has no Cargo.toml at its root or in a single \
                     top-level directory"
                .to_owned(),
        }),
    }
}

/// Temporary directory inside the prefix, removed on drop.
struct Staging {
    path: Utf8PathBuf,
    _dir: tempfile::TempDir,
}

impl Staging {
    fn create(prefix: &Utf8Path) -> Result<Self> {
        let unavailable = |err: &dyn fmt::Display| InstallerError::PrefixUnavailable {
            path: prefix.to_owned(),
            reason: err.to_string(),
        };
        std::fs::create_dir_all(prefix).map_err(|err| unavailable(&err))?;
        let dir = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(prefix)
            .map_err(|err| unavailable(&err))?;
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .map_err(|path| unavailable(&path.display()))?;
        Ok(Self { path, _dir: dir })
    }

    fn path(&self) -> &Utf8Path {
        &self.path
    }
}

#[cfg(test)]
#[path = "install_tests.rs"]
mod tests;
