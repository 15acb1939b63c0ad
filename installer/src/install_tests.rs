//! Tests for the install strategies.

use super::*;
use crate::artefact::extraction::{MockArchiveExtractor, TarballExtractor};
use crate::builder::MockBuildToolchain;
use crate::test_utils::{TarEntry, gzip_tarball, output_with, success_output};
use rstest::{fixture, rstest};
use tempfile::TempDir;

struct Prefix {
    _dir: TempDir,
    path: Utf8PathBuf,
}

#[fixture]
fn prefix() -> Prefix {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = Utf8PathBuf::from_path_buf(dir.path().join("tarts")).expect("UTF-8 path");
    Prefix { _dir: dir, path }
}

fn prebuilt() -> InstallStrategy {
    InstallStrategy::PrebuiltBinary {
        binary: "tarts".to_owned(),
    }
}

fn source(locked: bool) -> InstallStrategy {
    InstallStrategy::SourceBuild {
        binary: "tarts".to_owned(),
        locked,
    }
}

fn no_builds() -> MockBuildToolchain {
    let mut toolchain = MockBuildToolchain::new();
    toolchain.expect_build().never();
    toolchain
}

fn leftover_entries(prefix: &Utf8Path) -> Vec<String> {
    let mut names: Vec<String> = prefix
        .read_dir_utf8()
        .expect("read prefix")
        .map(|entry| entry.expect("entry").file_name().to_owned())
        .collect();
    names.sort();
    names
}

#[rstest]
#[case::flat(gzip_tarball(&[TarEntry::executable("tarts", b"#!/bin/sh\necho tarts\n")]))]
#[case::nested(gzip_tarball(&[
    TarEntry::file("tarts-v0.1.18/README.md", b"readme"),
    TarEntry::executable("tarts-v0.1.18/tarts", b"#!/bin/sh\necho tarts\n"),
]))]
fn prebuilt_binary_lands_in_prefix_bin(prefix: Prefix, #[case] archive: Vec<u8>) {
    let toolchain = no_builds();
    let installer = Installer::new(&TarballExtractor, &toolchain);

    let installed = installer
        .install(&prebuilt(), &archive, &prefix.path)
        .expect("installs");

    assert_eq!(installed.binary, prefix.path.join("bin").join("tarts"));
    let contents = std::fs::read(&installed.binary).expect("read binary");
    assert_eq!(contents, b"#!/bin/sh\necho tarts\n");
    assert_eq!(leftover_entries(&prefix.path), ["bin"]);
}

#[cfg(unix)]
#[rstest]
fn prebuilt_binary_keeps_executable_bits(prefix: Prefix) {
    use std::os::unix::fs::PermissionsExt;

    let archive = gzip_tarball(&[TarEntry::executable("tarts", b"bin")]);
    let toolchain = no_builds();
    let installed = Installer::new(&TarballExtractor, &toolchain)
        .install(&prebuilt(), &archive, &prefix.path)
        .expect("installs");

    let mode = std::fs::metadata(&installed.binary)
        .expect("metadata")
        .permissions()
        .mode();
    assert_eq!(mode & 0o755, 0o755, "mode {mode:o}");
}

#[rstest]
fn prebuilt_without_expected_binary_is_extract_failed(prefix: Prefix) {
    let archive = gzip_tarball(&[TarEntry::executable("other-tool", b"bin")]);
    let toolchain = no_builds();

    let err = Installer::new(&TarballExtractor, &toolchain)
        .install(&prebuilt(), &archive, &prefix.path)
        .expect_err("binary missing");

    assert!(
        matches!(err, InstallerError::ExtractFailed { ref reason } if reason.contains("tarts")),
        "{err}"
    );
    assert!(!prefix.path.join("bin").exists());
}

#[rstest]
fn invalid_archive_is_extract_failed(prefix: Prefix) {
    let toolchain = no_builds();

    let err = Installer::new(&TarballExtractor, &toolchain)
        .install(&prebuilt(), b"<html>not found</html>", &prefix.path)
        .expect_err("not an archive");

    assert!(matches!(err, InstallerError::ExtractFailed { .. }), "{err}");
    assert!(leftover_entries(&prefix.path).is_empty());
}

#[rstest]
#[case::locked(true)]
#[case::unlocked(false)]
fn source_build_requests_prefix_and_lock(prefix: Prefix, #[case] locked: bool) {
    let archive = gzip_tarball(&[
        TarEntry::file("tui-screen-savers-rs-0.1.18/Cargo.toml", b"[package]\n"),
        TarEntry::file("tui-screen-savers-rs-0.1.18/src/main.rs", b"fn main() {}\n"),
    ]);
    let expected_prefix = prefix.path.clone();
    let mut toolchain = MockBuildToolchain::new();
    toolchain
        .expect_build()
        .withf(move |request| {
            request.prefix == expected_prefix
                && request.locked == locked
                && request.source_dir.ends_with("tui-screen-savers-rs-0.1.18")
                && request.source_dir.join("Cargo.toml").is_file()
                && request.target_dir.starts_with(&expected_prefix)
        })
        .times(1)
        .returning(|_| Ok(success_output()));

    let installed = Installer::new(&TarballExtractor, &toolchain)
        .install(&source(locked), &archive, &prefix.path)
        .expect("builds");

    assert_eq!(installed.binary, prefix.path.join("bin").join("tarts"));
}

#[rstest]
fn source_at_archive_root_is_built_in_place(prefix: Prefix) {
    let archive = gzip_tarball(&[TarEntry::file("Cargo.toml", b"[package]\n")]);
    let mut toolchain = MockBuildToolchain::new();
    toolchain
        .expect_build()
        .withf(|request| request.source_dir.join("Cargo.toml").is_file())
        .times(1)
        .returning(|_| Ok(success_output()));

    Installer::new(&TarballExtractor, &toolchain)
        .install(&source(true), &archive, &prefix.path)
        .expect("builds");
}

#[rstest]
fn build_failure_carries_status_and_output(prefix: Prefix) {
    let archive = gzip_tarball(&[TarEntry::file("Cargo.toml", b"[package]\n")]);
    let mut toolchain = MockBuildToolchain::new();
    toolchain
        .expect_build()
        .times(1)
        .returning(|_| Ok(output_with(101, "Compiling tarts\n", "toolchain missing")));

    let err = Installer::new(&TarballExtractor, &toolchain)
        .install(&source(true), &archive, &prefix.path)
        .expect_err("build fails");

    match err {
        InstallerError::BuildFailed { status, output } => {
            assert_eq!(status, Some(101));
            assert!(output.contains("toolchain missing"), "{output}");
            assert!(output.contains("Compiling tarts"), "{output}");
        }
        other => panic!("expected BuildFailed, got {other}"),
    }
}

#[rstest]
fn source_without_manifest_is_extract_failed(prefix: Prefix) {
    let archive = gzip_tarball(&[
        TarEntry::file("a/README.md", b"a"),
        TarEntry::file("b/README.md", b"b"),
    ]);
    let toolchain = no_builds();

    let err = Installer::new(&TarballExtractor, &toolchain)
        .install(&source(true), &archive, &prefix.path)
        .expect_err("no Cargo.toml");

    assert!(matches!(err, InstallerError::ExtractFailed { .. }), "{err}");
}

#[rstest]
fn extraction_happens_inside_the_prefix(prefix: Prefix) {
    let expected_prefix = prefix.path.clone();
    let mut extractor = MockArchiveExtractor::new();
    extractor
        .expect_extract()
        .withf(move |_, dest| dest.starts_with(&expected_prefix) && dest.is_dir())
        .times(1)
        .returning(|_, _| Ok(Vec::new()));
    let toolchain = no_builds();

    let err = Installer::new(&extractor, &toolchain)
        .install(&prebuilt(), b"payload", &prefix.path)
        .expect_err("nothing extracted");

    assert!(matches!(err, InstallerError::ExtractFailed { .. }), "{err}");
    assert!(leftover_entries(&prefix.path).is_empty());
}

#[rstest]
fn toolchain_errors_propagate(prefix: Prefix) {
    let archive = gzip_tarball(&[TarEntry::file("Cargo.toml", b"[package]\n")]);
    let mut toolchain = MockBuildToolchain::new();
    toolchain.expect_build().returning(|_| {
        Err(InstallerError::CommandTimedOut {
            command: "cargo".to_owned(),
            seconds: 1800,
        })
    });

    let err = Installer::new(&TarballExtractor, &toolchain)
        .install(&source(true), &archive, &prefix.path)
        .expect_err("times out");

    assert!(matches!(err, InstallerError::CommandTimedOut { .. }), "{err}");
}

#[test]
fn strategy_follows_descriptor_kind() {
    use crate::artefact::descriptor::ArchPattern;
    use crate::platform::OsFamily;

    let prebuilt_descriptor =
        ArtefactDescriptor::prebuilt(OsFamily::Macos, ArchPattern::Arm64, "u", None);
    let strategy = InstallStrategy::for_descriptor(&prebuilt_descriptor, "tarts");
    assert_eq!(strategy, prebuilt());
    assert!(!strategy.is_source_build());
    assert_eq!(strategy.binary(), "tarts");
    assert_eq!(source(true).to_string(), "source build (locked)");
}
