//! Package manifests: the declarative description of one installable package.
//!
//! Manifests are TOML documents. Every field is validated while loading, so
//! the resulting [`PackageManifest`] is immutable and internally consistent:
//! URLs are expanded, digests are well formed, and no two prebuilt artefacts
//! claim the same `(os, arch)` pair.
//!
//! ```toml
//! name = "tarts"
//! version = "0.1.18"
//! license = "MIT"
//!
//! [check]
//! flag = "--version"
//!
//! [[artefact]]
//! kind = "prebuilt-binary"
//! os = "macos"
//! arch = "arm64"
//! url = "https://example.test/v{version}/{name}-aarch64-apple-darwin.tar.gz"
//! sha256 = ""
//!
//! [[artefact]]
//! kind = "source-archive"
//! url = "https://example.test/v{version}.tar.gz"
//! sha256 = ""
//! ```

use crate::artefact::descriptor::{
    ArchPattern, ArtefactDescriptor, ArtefactKind, expand_url_template,
};
use crate::artefact::error::ArtefactError;
use crate::artefact::sha256_digest::Sha256Digest;
use crate::platform::OsFamily;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::collections::HashSet;
use thiserror::Error;

/// Manifest for the tarts screensaver collection, compiled into the binary.
pub const BUNDLED_MANIFEST: &str = include_str!("../formula/tarts.toml");

/// Flag passed to the installed binary when none is configured.
const DEFAULT_CHECK_FLAG: &str = "--version";

/// Errors arising from loading or validating a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest file could not be read.
    #[error("failed to read manifest {path}: {source}")]
    Read {
        /// Path of the manifest file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The manifest is not valid TOML or does not match the schema.
    #[error("manifest parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// A required text field is blank.
    #[error("manifest field `{field}` must not be empty")]
    EmptyField {
        /// Name of the blank field.
        field: &'static str,
    },

    /// A field used as a path component is not a single plain segment.
    ///
    /// `binary` becomes `<prefix>/bin/<binary>`, and `name` and `version`
    /// become directories of the default prefix.
    #[error("manifest field `{field}` must be a plain path segment, got {value:?}")]
    InvalidPathSegment {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: String,
    },

    /// The manifest lists no artefacts at all.
    #[error("manifest declares no artefacts")]
    NoArtefacts,

    /// An artefact entry failed validation.
    #[error("artefact #{index}: {source}")]
    InvalidArtefact {
        /// One-based position of the entry in the manifest.
        index: usize,
        /// What was wrong with it.
        #[source]
        source: ArtefactError,
    },

    /// Two prebuilt artefacts claim the same platform.
    #[error("more than one prebuilt artefact for {os}/{arch}")]
    DuplicatePlatform {
        /// Operating system family of the clash.
        os: OsFamily,
        /// Architecture pattern of the clash.
        arch: ArchPattern,
    },
}

/// Pass-through descriptive metadata plus the names the installer acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMetadata {
    /// Package name.
    pub name: String,
    /// Package version, already free of placeholders.
    pub version: String,
    /// One-line description.
    pub description: Option<String>,
    /// SPDX licence expression.
    pub license: Option<String>,
    /// Project homepage.
    pub homepage: Option<String>,
    /// File name of the installed executable.
    pub binary: String,
    /// Flag passed to the executable by the post-install check.
    pub check_flag: String,
}

impl PackageMetadata {
    /// Metadata with only a name and version; the binary is named after the
    /// package and the check flag is `--version`.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            binary: name.clone(),
            name,
            version: version.into(),
            description: None,
            license: None,
            homepage: None,
            check_flag: DEFAULT_CHECK_FLAG.to_owned(),
        }
    }
}

/// A validated, immutable package manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageManifest {
    metadata: PackageMetadata,
    artefacts: Vec<ArtefactDescriptor>,
}

impl PackageManifest {
    /// Build a manifest from already-constructed parts, enforcing the same
    /// invariants as [`PackageManifest::from_toml_str`].
    ///
    /// # Errors
    ///
    /// Returns a [`ManifestError`] describing the first violated invariant.
    pub fn new(
        metadata: PackageMetadata,
        artefacts: Vec<ArtefactDescriptor>,
    ) -> Result<Self, ManifestError> {
        validate_metadata(&metadata)?;
        validate_artefacts(&artefacts)?;
        Ok(Self {
            metadata,
            artefacts,
        })
    }

    /// Parse and validate a TOML manifest.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Parse`] for malformed TOML or unknown fields,
    /// and the validation variants for semantic problems.
    ///
    /// # Examples
    ///
    /// ```
    /// use tarts_installer::manifest::PackageManifest;
    ///
    /// let manifest = PackageManifest::from_toml_str(
    ///     r#"
    ///     name = "tarts"
    ///     version = "0.1.18"
    ///
    ///     [[artefact]]
    ///     kind = "source-archive"
    ///     url = "https://example.test/v{version}.tar.gz"
    ///     "#,
    /// )
    /// .unwrap();
    /// assert_eq!(manifest.artefacts()[0].url(), "https://example.test/v0.1.18.tar.gz");
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self, ManifestError> {
        let raw: RawManifest = toml::from_str(source)?;
        raw.into_manifest()
    }

    /// Read and validate a manifest file.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Read`] if the file cannot be read, otherwise
    /// as [`PackageManifest::from_toml_str`].
    pub fn load(path: &Utf8Path) -> Result<Self, ManifestError> {
        let source = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Return the manifest compiled into the installer.
    ///
    /// # Errors
    ///
    /// Only fails if the bundled manifest itself is invalid.
    pub fn bundled() -> Result<Self, ManifestError> {
        Self::from_toml_str(BUNDLED_MANIFEST)
    }

    /// Return the package metadata.
    #[must_use]
    pub const fn metadata(&self) -> &PackageMetadata {
        &self.metadata
    }

    /// Return the package name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Return the package version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.metadata.version
    }

    /// Return the installed executable's file name.
    #[must_use]
    pub fn binary(&self) -> &str {
        &self.metadata.binary
    }

    /// Return the artefacts in declaration (priority) order.
    #[must_use]
    pub fn artefacts(&self) -> &[ArtefactDescriptor] {
        &self.artefacts
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    name: String,
    version: String,
    description: Option<String>,
    license: Option<String>,
    homepage: Option<String>,
    binary: Option<String>,
    #[serde(default)]
    check: RawCheck,
    #[serde(default, rename = "artefact")]
    artefacts: Vec<RawArtefact>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCheck {
    flag: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum RawKind {
    PrebuiltBinary,
    SourceArchive,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawArtefact {
    kind: RawKind,
    os: Option<OsFamily>,
    arch: Option<ArchPattern>,
    url: String,
    #[serde(default)]
    sha256: String,
}

impl RawManifest {
    fn into_manifest(self) -> Result<PackageManifest, ManifestError> {
        let binary = self.binary.unwrap_or_else(|| self.name.clone());
        let metadata = PackageMetadata {
            name: self.name,
            version: self.version,
            description: self.description,
            license: self.license,
            homepage: self.homepage,
            binary,
            check_flag: self
                .check
                .flag
                .unwrap_or_else(|| DEFAULT_CHECK_FLAG.to_owned()),
        };
        validate_metadata(&metadata)?;

        let vars = [
            ("name", metadata.name.as_str()),
            ("version", metadata.version.as_str()),
        ];
        let artefacts = self
            .artefacts
            .into_iter()
            .enumerate()
            .map(|(position, raw)| {
                raw.into_descriptor(&vars)
                    .map_err(|source| ManifestError::InvalidArtefact {
                        index: position + 1,
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        PackageManifest::new(metadata, artefacts)
    }
}

impl RawArtefact {
    fn into_descriptor(self, vars: &[(&str, &str)]) -> Result<ArtefactDescriptor, ArtefactError> {
        let url = expand_url_template(&self.url, vars)?;
        let digest = parse_optional_digest(&self.sha256)?;
        match self.kind {
            RawKind::PrebuiltBinary => {
                let os = self.os.ok_or(ArtefactError::MissingOs { url: self.url })?;
                Ok(ArtefactDescriptor::prebuilt(
                    os,
                    self.arch.unwrap_or_default(),
                    url,
                    digest,
                ))
            }
            RawKind::SourceArchive => {
                if self.os.is_some() || self.arch.is_some() {
                    return Err(ArtefactError::PlatformOnSourceArchive { url: self.url });
                }
                Ok(ArtefactDescriptor::source(url, digest))
            }
        }
    }
}

/// A blank digest means "not filled in yet"; anything else must be valid.
fn parse_optional_digest(value: &str) -> Result<Option<Sha256Digest>, ArtefactError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    Sha256Digest::try_from(trimmed).map(Some)
}

fn validate_metadata(metadata: &PackageMetadata) -> Result<(), ManifestError> {
    for (field, value) in [
        ("name", &metadata.name),
        ("version", &metadata.version),
        ("check.flag", &metadata.check_flag),
    ] {
        if value.trim().is_empty() {
            return Err(ManifestError::EmptyField { field });
        }
    }

    for (field, value) in [
        ("name", &metadata.name),
        ("version", &metadata.version),
        ("binary", &metadata.binary),
    ] {
        if !is_plain_segment(value) {
            return Err(ManifestError::InvalidPathSegment {
                field,
                value: value.clone(),
            });
        }
    }
    Ok(())
}

fn is_plain_segment(value: &str) -> bool {
    !value.is_empty() && value != "." && value != ".." && !value.contains(['/', '\\'])
}

fn validate_artefacts(artefacts: &[ArtefactDescriptor]) -> Result<(), ManifestError> {
    if artefacts.is_empty() {
        return Err(ManifestError::NoArtefacts);
    }

    let mut seen = HashSet::new();
    let prebuilt_platforms = artefacts.iter().filter_map(|descriptor| match descriptor.kind() {
        ArtefactKind::PrebuiltBinary { os, arch } => Some((os, arch)),
        ArtefactKind::SourceArchive => None,
    });
    for (os, arch) in prebuilt_platforms {
        if !seen.insert((os, arch)) {
            return Err(ManifestError::DuplicatePlatform { os, arch });
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
