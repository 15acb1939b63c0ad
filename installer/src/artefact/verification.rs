//! Integrity verification for fetched artefacts.
//!
//! Fetched bytes are hashed with SHA-256 and compared against the digest the
//! manifest records. A blank digest never verifies: it is reported as
//! [`VerificationError::MissingDigest`] so the caller stops before anything is
//! written to the install prefix.

use super::sha256_digest::Sha256Digest;
use thiserror::Error;

/// Reasons an artefact failed verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// The manifest has no digest for this artefact.
    #[error("no expected SHA-256 digest is recorded for this artefact")]
    MissingDigest,

    /// The fetched bytes hash to a different digest.
    #[error("checksum mismatch: expected {expected}, actual {actual}")]
    Mismatch {
        /// Digest recorded in the manifest.
        expected: Sha256Digest,
        /// Digest of the fetched bytes.
        actual: Sha256Digest,
    },
}

/// Return whether `artefact_bytes` hash to `expected_digest`.
///
/// The comparison is case-insensitive on the hex encoding. An empty or
/// malformed expected digest always yields `false`.
///
/// # Examples
///
/// ```
/// use tarts_installer::artefact::verification::verify;
///
/// let empty = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
/// assert!(verify(b"", empty));
/// assert!(verify(b"", &empty.to_uppercase()));
/// assert!(!verify(b"", ""));
/// ```
#[must_use]
pub fn verify(artefact_bytes: &[u8], expected_digest: &str) -> bool {
    let expected = expected_digest.trim();
    if expected.is_empty() {
        return false;
    }
    Sha256Digest::try_from(expected)
        .is_ok_and(|digest| check_integrity(artefact_bytes, Some(&digest)).is_ok())
}

/// Verify `artefact_bytes` against an optional expected digest.
///
/// Returns the computed digest on success so callers can report what was
/// verified.
///
/// # Errors
///
/// Returns [`VerificationError::MissingDigest`] when `expected` is `None`,
/// and [`VerificationError::Mismatch`] when the digests differ.
pub fn check_integrity(
    artefact_bytes: &[u8],
    expected: Option<&Sha256Digest>,
) -> Result<Sha256Digest, VerificationError> {
    let expected = expected.ok_or(VerificationError::MissingDigest)?;
    let actual = Sha256Digest::of_bytes(artefact_bytes);
    if actual.as_str() != expected.as_str() {
        return Err(VerificationError::Mismatch {
            expected: expected.clone(),
            actual,
        });
    }
    Ok(actual)
}
