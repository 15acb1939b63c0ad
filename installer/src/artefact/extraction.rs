//! Archive extraction for fetched artefacts.
//!
//! Unpacks gzip- or zstd-compressed tarballs into a destination directory
//! with path traversal protection to prevent zip-slip attacks. The
//! compression format is chosen from the payload's magic bytes, not from the
//! URL, because release URLs are not guaranteed to carry an extension.

use log::trace;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

/// Leading bytes of a gzip stream.
const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];

/// Leading bytes of a zstd frame.
const ZSTD_MAGIC: &[u8] = &[0x28, 0xb5, 0x2f, 0xfd];

/// Trait for extracting artefact archives, enabling test mocking.
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveExtractor {
    /// Extract the archive held in `archive` into `dest_dir`.
    ///
    /// Returns the relative paths of the regular files that were written.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::UnsupportedFormat`] if the payload is not a
    /// recognised compressed tarball, [`ExtractionError::PathTraversal`] if
    /// any entry attempts to escape the destination directory,
    /// [`ExtractionError::EmptyArchive`] if no files are found, and
    /// [`ExtractionError::Io`] on I/O failures.
    fn extract(&self, archive: &[u8], dest_dir: &Path) -> Result<Vec<PathBuf>, ExtractionError>;
}

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// I/O error during extraction, including corrupt archive data.
    #[error("extraction I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The payload is neither a gzip nor a zstd stream.
    #[error("payload is not a gzip or zstd compressed tarball")]
    UnsupportedFormat,

    /// A path in the archive attempts to traverse outside the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path from the archive entry.
        path: String,
    },

    /// The archive contains no files.
    #[error("archive contains no files")]
    EmptyArchive,
}

/// Compression wrapped around a tarball.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// `.tar.gz`
    Gzip,
    /// `.tar.zst`
    Zstd,
}

impl Compression {
    /// Identify the compression of `payload` from its magic bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use tarts_installer::artefact::extraction::Compression;
    ///
    /// assert_eq!(Compression::sniff(&[0x1f, 0x8b, 0x08]), Some(Compression::Gzip));
    /// assert_eq!(Compression::sniff(b"PK\x03\x04"), None);
    /// ```
    #[must_use]
    pub fn sniff(payload: &[u8]) -> Option<Self> {
        if payload.starts_with(GZIP_MAGIC) {
            Some(Self::Gzip)
        } else if payload.starts_with(ZSTD_MAGIC) {
            Some(Self::Zstd)
        } else {
            None
        }
    }
}

/// Default extractor using the `tar`, `flate2`, and `zstd` crates.
///
/// Validates each entry path before extraction to guard against path
/// traversal. Unix permission bits recorded in the archive are kept, so
/// executables stay executable.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarballExtractor;

impl ArchiveExtractor for TarballExtractor {
    fn extract(&self, archive: &[u8], dest_dir: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
        match Compression::sniff(archive).ok_or(ExtractionError::UnsupportedFormat)? {
            Compression::Gzip => unpack(flate2::read::GzDecoder::new(archive), dest_dir),
            Compression::Zstd => unpack(zstd::Decoder::new(archive)?, dest_dir),
        }
    }
}

/// Unpack a decompressed tar stream into `dest_dir`.
fn unpack(reader: impl Read, dest_dir: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
    let mut archive = tar::Archive::new(reader);
    let mut extracted = Vec::new();

    for entry_result in archive.entries()? {
        let mut entry = entry_result?;
        let entry_path = entry.path()?.into_owned();

        validate_entry_path(&entry_path)?;

        trace!("unpacking {}", entry_path.display());
        // `unpack_in` also refuses to write through symlinks that leave `dest_dir`.
        if !entry.unpack_in(dest_dir)? {
            return Err(ExtractionError::PathTraversal {
                path: entry_path.display().to_string(),
            });
        }

        if entry.header().entry_type().is_file() {
            extracted.push(entry_path);
        }
    }

    if extracted.is_empty() {
        return Err(ExtractionError::EmptyArchive);
    }

    Ok(extracted)
}

/// Validate that a tar entry path does not escape the destination
/// directory via `..` components or absolute paths.
fn validate_entry_path(path: &Path) -> Result<(), ExtractionError> {
    let escapes = path.is_absolute()
        || path
            .components()
            .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)));
    if escapes {
        return Err(ExtractionError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TarEntry, gzip_tarball, zstd_tarball};
    use rstest::rstest;

    fn dest() -> tempfile::TempDir {
        tempfile::tempdir().expect("temp dir")
    }

    #[rstest]
    #[case::gzip(gzip_tarball(&[TarEntry::file("hello.txt", b"hello world")]))]
    #[case::zstd(zstd_tarball(&[TarEntry::file("hello.txt", b"hello world")]))]
    fn extracts_supported_formats(#[case] archive: Vec<u8>) {
        let out = dest();
        let files = TarballExtractor
            .extract(&archive, out.path())
            .expect("extract");
        assert_eq!(files, vec![PathBuf::from("hello.txt")]);
        let contents = std::fs::read(out.path().join("hello.txt")).expect("read extracted");
        assert_eq!(contents, b"hello world");
    }

    #[test]
    fn reports_nested_paths_relative_to_destination() {
        let archive = gzip_tarball(&[TarEntry::file("tarts-v0.1.18/bin/tarts", b"bin")]);
        let out = dest();
        let files = TarballExtractor
            .extract(&archive, out.path())
            .expect("extract");
        assert_eq!(files, vec![PathBuf::from("tarts-v0.1.18/bin/tarts")]);
    }

    #[cfg(unix)]
    #[test]
    fn preserves_executable_bits() {
        use std::os::unix::fs::PermissionsExt;

        let archive = gzip_tarball(&[TarEntry::executable("tarts", b"#!/bin/sh\n")]);
        let out = dest();
        TarballExtractor
            .extract(&archive, out.path())
            .expect("extract");
        let mode = std::fs::metadata(out.path().join("tarts"))
            .expect("metadata")
            .permissions()
            .mode();
        assert_eq!(mode & 0o111, 0o111, "mode {mode:o}");
    }

    #[rstest]
    #[case::plain_text(b"just some text".to_vec())]
    #[case::zip(b"PK\x03\x04rest".to_vec())]
    #[case::empty(Vec::new())]
    fn rejects_unrecognised_payloads(#[case] payload: Vec<u8>) {
        let out = dest();
        let result = TarballExtractor.extract(&payload, out.path());
        assert!(matches!(result, Err(ExtractionError::UnsupportedFormat)));
    }

    #[test]
    fn truncated_gzip_is_an_io_error() {
        let mut archive = gzip_tarball(&[TarEntry::file("hello.txt", b"hello world")]);
        archive.truncate(archive.len() / 2);
        let out = dest();
        let result = TarballExtractor.extract(&archive, out.path());
        assert!(matches!(result, Err(ExtractionError::Io(_))), "{result:?}");
    }

    #[test]
    fn extract_empty_archive() {
        let archive = gzip_tarball(&[]);
        let out = dest();
        let result = TarballExtractor.extract(&archive, out.path());
        assert!(matches!(result, Err(ExtractionError::EmptyArchive)));
    }

    #[rstest]
    #[case::parent_dir("../escape.txt")]
    #[case::nested_parent("foo/../../escape.txt")]
    #[case::absolute("/etc/passwd")]
    fn rejects_path_traversal(#[case] bad_path: &str) {
        let result = validate_entry_path(Path::new(bad_path));
        assert!(
            matches!(result, Err(ExtractionError::PathTraversal { .. })),
            "expected PathTraversal for {bad_path}"
        );
    }

    #[test]
    fn accepts_normal_paths() {
        assert!(validate_entry_path(Path::new("bin/tarts")).is_ok());
    }
}
