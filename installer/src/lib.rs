//! tarts installer library.
//!
//! This crate resolves a package manifest against the host platform, fetches
//! the matching artefact, verifies its SHA-256 digest, installs it under a
//! prefix and runs a post-install self-test. It is used by the
//! `tarts-installer` CLI binary and can be consumed programmatically for
//! testing or custom installation workflows.
//!
//! # Modules
//!
//! - [`artefact`] - Artefact descriptors, digests, download and extraction
//! - [`builder`] - Cargo build collaborator for source archives
//! - [`check`] - Post-install self-test of the installed binary
//! - [`cli`] - Command-line argument definitions
//! - [`dirs`] - Directory resolution abstraction for platform-specific paths
//! - [`error`] - Semantic error types mapped to workflow stages
//! - [`install`] - Prebuilt and source-build install strategies
//! - [`manifest`] - Package manifest loading and validation
//! - [`output`] - Progress lines and install/resolve reports
//! - [`pipeline`] - The resolve, fetch, verify, install and check workflow
//! - [`platform`] - Host platform detection
//! - [`process`] - Subprocess execution with timeouts
//! - [`selector`] - Artefact selection for a platform

pub mod artefact;
pub mod builder;
pub mod check;
pub mod cli;
pub mod dirs;
pub mod error;
pub mod install;
pub mod manifest;
pub mod output;
pub mod pipeline;
pub mod platform;
pub mod process;
pub mod selector;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
