//! Artefact descriptors, retrieval, integrity, and unpacking.
//!
//! # Sub-modules
//!
//! - [`descriptor`] - Candidate artefacts (`ArtefactDescriptor`) and URL
//!   template expansion.
//! - [`download`] - Fetch trait and HTTP/local implementation.
//! - [`error`] - Semantic error types for descriptor validation failures.
//! - [`extraction`] - Tarball extraction with path traversal protection.
//! - [`sha256_digest`] - SHA-256 digest newtype (`Sha256Digest`).
//! - [`verification`] - Digest comparison for fetched bytes.

pub mod descriptor;
pub mod download;
pub mod error;
pub mod extraction;
pub mod sha256_digest;
pub mod verification;
