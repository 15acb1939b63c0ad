//! Artefact descriptors: one obtainable form of a package.
//!
//! A descriptor is either a prebuilt binary for an `(os, arch)` pair or a
//! source archive that any platform can build. The platform fields only exist
//! on the prebuilt variant, so a source archive can never be mistaken for a
//! platform match.

use super::error::{ArtefactError, Result};
use super::sha256_digest::Sha256Digest;
use crate::platform::{Arch, OsFamily, Platform};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Architecture requirement declared by a prebuilt descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArchPattern {
    /// Only 64-bit ARM hosts.
    #[serde(rename = "arm64")]
    Arm64,
    /// Only 64-bit x86 hosts.
    #[serde(rename = "x86_64")]
    X86_64,
    /// Only hosts whose architecture the probe could not classify.
    #[serde(rename = "other")]
    Other,
    /// Every architecture of the descriptor's OS family.
    #[default]
    #[serde(rename = "any")]
    Any,
}

impl ArchPattern {
    /// Whether this pattern names exactly `arch`.
    #[must_use]
    pub const fn is_exactly(self, arch: Arch) -> bool {
        matches!(
            (self, arch),
            (Self::Arm64, Arch::Arm64) | (Self::X86_64, Arch::X86_64) | (Self::Other, Arch::Other)
        )
    }

    /// Whether this pattern accepts `arch`, counting the `any` wildcard.
    #[must_use]
    pub const fn accepts(self, arch: Arch) -> bool {
        matches!(self, Self::Any) || self.is_exactly(arch)
    }

    /// Return the manifest spelling of the pattern.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Arm64 => "arm64",
            Self::X86_64 => "x86_64",
            Self::Other => "other",
            Self::Any => "any",
        }
    }
}

impl fmt::Display for ArchPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a descriptor delivers, and the fields only that form needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ArtefactKind {
    /// A compressed tarball containing a ready-to-run binary.
    PrebuiltBinary {
        /// Operating system family the binary runs on.
        os: OsFamily,
        /// Architecture requirement.
        arch: ArchPattern,
    },
    /// A compressed tarball of the package sources.
    SourceArchive,
}

impl fmt::Display for ArtefactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrebuiltBinary { os, arch } => write!(f, "prebuilt binary ({os}/{arch})"),
            Self::SourceArchive => f.write_str("source archive"),
        }
    }
}

/// One candidate artefact from a package manifest.
///
/// The URL is stored fully expanded; placeholders are substituted once when
/// the manifest is loaded.
///
/// # Examples
///
/// ```
/// use tarts_installer::artefact::descriptor::{ArchPattern, ArtefactDescriptor};
/// use tarts_installer::platform::{Arch, OsFamily, Platform};
///
/// let descriptor = ArtefactDescriptor::prebuilt(
///     OsFamily::Macos,
///     ArchPattern::Arm64,
///     "https://example.test/tarts.tar.gz",
///     None,
/// );
/// assert!(descriptor.matches_exactly(Platform::new(OsFamily::Macos, Arch::Arm64)));
/// assert!(!descriptor.matches_exactly(Platform::new(OsFamily::Macos, Arch::X86_64)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtefactDescriptor {
    #[serde(flatten)]
    kind: ArtefactKind,
    url: String,
    sha256: Option<Sha256Digest>,
}

impl ArtefactDescriptor {
    /// Create a prebuilt binary descriptor.
    #[must_use]
    pub fn prebuilt(
        os: OsFamily,
        arch: ArchPattern,
        url: impl Into<String>,
        sha256: Option<Sha256Digest>,
    ) -> Self {
        Self {
            kind: ArtefactKind::PrebuiltBinary { os, arch },
            url: url.into(),
            sha256,
        }
    }

    /// Create a source archive descriptor.
    #[must_use]
    pub fn source(url: impl Into<String>, sha256: Option<Sha256Digest>) -> Self {
        Self {
            kind: ArtefactKind::SourceArchive,
            url: url.into(),
            sha256,
        }
    }

    /// Return the descriptor kind.
    #[must_use]
    pub const fn kind(&self) -> ArtefactKind {
        self.kind
    }

    /// Return the fully expanded download URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Return the expected digest, or `None` when the manifest left it blank.
    #[must_use]
    pub const fn expected_digest(&self) -> Option<&Sha256Digest> {
        self.sha256.as_ref()
    }

    /// Return a copy of this descriptor with `digest` as its expected digest.
    #[must_use]
    pub fn with_expected_digest(&self, digest: Sha256Digest) -> Self {
        Self {
            sha256: Some(digest),
            ..self.clone()
        }
    }

    /// Whether this is a prebuilt binary descriptor.
    #[must_use]
    pub const fn is_prebuilt(&self) -> bool {
        matches!(self.kind, ArtefactKind::PrebuiltBinary { .. })
    }

    /// Whether this is a source archive descriptor.
    #[must_use]
    pub const fn is_source(&self) -> bool {
        matches!(self.kind, ArtefactKind::SourceArchive)
    }

    /// Whether this prebuilt descriptor names exactly `platform`.
    #[must_use]
    pub fn matches_exactly(&self, platform: Platform) -> bool {
        match self.kind {
            ArtefactKind::PrebuiltBinary { os, arch } => {
                os == platform.os && arch.is_exactly(platform.arch)
            }
            ArtefactKind::SourceArchive => false,
        }
    }

    /// Whether this prebuilt descriptor accepts `platform`, counting an
    /// `any` architecture as a match.
    #[must_use]
    pub fn accepts(&self, platform: Platform) -> bool {
        match self.kind {
            ArtefactKind::PrebuiltBinary { os, arch } => {
                os == platform.os && arch.accepts(platform.arch)
            }
            ArtefactKind::SourceArchive => false,
        }
    }
}

/// Substitute `{name}`-style placeholders in a URL template.
///
/// Every placeholder must appear in `vars`; unknown or unterminated
/// placeholders are errors rather than being left in the URL.
///
/// # Errors
///
/// Returns [`ArtefactError::UnknownPlaceholder`] or
/// [`ArtefactError::UnterminatedPlaceholder`].
///
/// # Examples
///
/// ```
/// use tarts_installer::artefact::descriptor::expand_url_template;
///
/// let url = expand_url_template(
///     "https://example.test/v{version}/{name}.tar.gz",
///     &[("name", "tarts"), ("version", "0.1.18")],
/// )
/// .unwrap();
/// assert_eq!(url, "https://example.test/v0.1.18/tarts.tar.gz");
/// ```
pub fn expand_url_template(template: &str, vars: &[(&str, &str)]) -> Result<String> {
    let mut expanded = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let (literal, tail) = rest.split_at(open);
        expanded.push_str(literal);
        let Some(close) = tail.find('}') else {
            return Err(ArtefactError::UnterminatedPlaceholder {
                template: template.to_owned(),
            });
        };
        let key = tail.get(1..close).unwrap_or_default();
        let value = vars
            .iter()
            .find_map(|(name, value)| (*name == key).then_some(*value))
            .ok_or_else(|| ArtefactError::UnknownPlaceholder {
                template: template.to_owned(),
                placeholder: key.to_owned(),
            })?;
        expanded.push_str(value);
        rest = tail.get(close + 1..).unwrap_or_default();
    }

    expanded.push_str(rest);
    Ok(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const MACOS_ARM: Platform = Platform::new(OsFamily::Macos, Arch::Arm64);
    const MACOS_X86: Platform = Platform::new(OsFamily::Macos, Arch::X86_64);
    const LINUX_ARM: Platform = Platform::new(OsFamily::Linux, Arch::Arm64);

    #[rstest]
    #[case::exact(ArchPattern::Arm64, MACOS_ARM, true, true)]
    #[case::other_arch(ArchPattern::Arm64, MACOS_X86, false, false)]
    #[case::other_os(ArchPattern::Arm64, LINUX_ARM, false, false)]
    #[case::wildcard(ArchPattern::Any, MACOS_X86, false, true)]
    #[case::wildcard_other_os(ArchPattern::Any, LINUX_ARM, false, false)]
    fn prebuilt_matching(
        #[case] arch: ArchPattern,
        #[case] platform: Platform,
        #[case] exact: bool,
        #[case] accepted: bool,
    ) {
        let descriptor = ArtefactDescriptor::prebuilt(OsFamily::Macos, arch, "u", None);
        assert_eq!(descriptor.matches_exactly(platform), exact);
        assert_eq!(descriptor.accepts(platform), accepted);
    }

    #[test]
    fn source_archive_never_matches_a_platform() {
        let descriptor = ArtefactDescriptor::source("u", None);
        assert!(!descriptor.matches_exactly(MACOS_ARM));
        assert!(!descriptor.accepts(MACOS_ARM));
        assert!(descriptor.is_source());
    }

    #[test]
    fn with_expected_digest_replaces_digest_only() {
        let descriptor = ArtefactDescriptor::source("https://example.test/src.tar.gz", None);
        let digest = Sha256Digest::of_bytes(b"src");
        let updated = descriptor.with_expected_digest(digest.clone());
        assert_eq!(updated.expected_digest(), Some(&digest));
        assert_eq!(updated.url(), descriptor.url());
    }

    #[test]
    fn expands_repeated_placeholders() {
        let url = expand_url_template(
            "v{version}/tarts-v{version}.tar.gz",
            &[("version", "0.1.18")],
        )
        .expect("expands");
        assert_eq!(url, "v0.1.18/tarts-v0.1.18.tar.gz");
    }

    #[test]
    fn template_without_placeholders_is_unchanged() {
        let url = expand_url_template("https://example.test/a.tar.gz", &[]).expect("expands");
        assert_eq!(url, "https://example.test/a.tar.gz");
    }

    #[rstest]
    #[case::unknown("v{release}.tar.gz")]
    #[case::empty("v{}.tar.gz")]
    fn rejects_unknown_placeholders(#[case] template: &str) {
        let err = expand_url_template(template, &[("version", "1")]).expect_err("rejected");
        assert!(matches!(err, ArtefactError::UnknownPlaceholder { .. }));
    }

    #[test]
    fn rejects_unterminated_placeholder() {
        let err = expand_url_template("v{version.tar.gz", &[("version", "1")])
            .expect_err("rejected");
        assert!(matches!(err, ArtefactError::UnterminatedPlaceholder { .. }));
    }

    #[test]
    fn kind_serialises_with_tag() {
        let descriptor = ArtefactDescriptor::prebuilt(OsFamily::Linux, ArchPattern::X86_64, "u", None);
        let json = serde_json::to_string(&descriptor).expect("serialise");
        assert!(json.contains(r#""kind":"prebuilt-binary""#), "{json}");
        assert!(json.contains(r#""arch":"x86_64""#), "{json}");
    }
}
