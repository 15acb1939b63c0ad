//! Tests for manifest loading and validation.

use super::*;
use crate::platform::{Arch, Platform};
use rstest::{fixture, rstest};

const SOURCE_ONLY: &str = r#"
name = "tarts"
version = "0.1.18"

[[artefact]]
kind = "source-archive"
url = "https://example.test/v{version}.tar.gz"
"#;

#[fixture]
fn bundled() -> PackageManifest {
    PackageManifest::bundled().expect("bundled manifest is valid")
}

fn with_artefacts(artefacts: &str) -> String {
    format!("name = \"tarts\"\nversion = \"0.1.18\"\n{artefacts}")
}

#[rstest]
fn bundled_manifest_describes_tarts(bundled: PackageManifest) {
    assert_eq!(bundled.name(), "tarts");
    assert_eq!(bundled.version(), "0.1.18");
    assert_eq!(bundled.binary(), "tarts");
    assert_eq!(bundled.metadata().license.as_deref(), Some("MIT"));
    assert_eq!(bundled.metadata().check_flag, "--version");
    assert_eq!(bundled.artefacts().len(), 3);
}

#[rstest]
fn bundled_manifest_expands_release_urls(bundled: PackageManifest) {
    let arm = bundled
        .artefacts()
        .iter()
        .find(|a| a.matches_exactly(Platform::new(OsFamily::Macos, Arch::Arm64)))
        .expect("arm64 artefact");
    assert_eq!(
        arm.url(),
        "https://github.com/oiwn/tui-screen-savers-rs/releases/download/v0.1.18/\
         tarts-v0.1.18-aarch64-apple-darwin.tar.gz"
    );
    assert!(arm.expected_digest().is_none());
}

#[rstest]
fn bundled_manifest_ends_with_source_archive(bundled: PackageManifest) {
    let last = bundled.artefacts().last().expect("artefacts");
    assert!(last.is_source());
    assert!(!last.url().contains('{'));
}

#[test]
fn binary_defaults_to_package_name() {
    let manifest = PackageManifest::from_toml_str(SOURCE_ONLY).expect("valid");
    assert_eq!(manifest.binary(), "tarts");
    assert_eq!(manifest.metadata().check_flag, DEFAULT_CHECK_FLAG);
}

#[test]
fn prebuilt_without_arch_is_a_wildcard() {
    let manifest = PackageManifest::from_toml_str(&with_artefacts(
        r#"
        [[artefact]]
        kind = "prebuilt-binary"
        os = "linux"
        url = "https://example.test/linux.tar.gz"
        "#,
    ))
    .expect("valid");
    assert_eq!(
        manifest.artefacts()[0].kind(),
        ArtefactKind::PrebuiltBinary {
            os: OsFamily::Linux,
            arch: ArchPattern::Any,
        }
    );
}

#[test]
fn digests_are_parsed_and_normalised() {
    let upper = "AB".repeat(32);
    let manifest = PackageManifest::from_toml_str(&with_artefacts(&format!(
        r#"
        [[artefact]]
        kind = "source-archive"
        url = "https://example.test/src.tar.gz"
        sha256 = "{upper}"
        "#
    )))
    .expect("valid");
    let digest = manifest.artefacts()[0]
        .expected_digest()
        .expect("digest present");
    assert_eq!(digest.as_str(), "ab".repeat(32));
}

#[rstest]
#[case::unknown_top_level("name = \"t\"\nversion = \"1\"\nrevision = 2\n")]
#[case::missing_version("name = \"t\"\n")]
#[case::unknown_kind(
    "name = \"t\"\nversion = \"1\"\n[[artefact]]\nkind = \"wheel\"\nurl = \"u\"\n"
)]
#[case::unknown_os(
    "name = \"t\"\nversion = \"1\"\n[[artefact]]\nkind = \"prebuilt-binary\"\nos = \"windows\"\nurl = \"u\"\n"
)]
fn schema_violations_are_parse_errors(#[case] source: &str) {
    let err = PackageManifest::from_toml_str(source).expect_err("rejected");
    assert!(matches!(err, ManifestError::Parse(_)), "{err}");
}

#[rstest]
#[case::name("name = \" \"\nversion = \"1\"\n", "name")]
#[case::version("name = \"t\"\nversion = \"\"\n", "version")]
#[case::flag("name = \"t\"\nversion = \"1\"\n[check]\nflag = \"\"\n", "check.flag")]
fn blank_fields_are_rejected(#[case] source: &str, #[case] expected: &str) {
    let err = PackageManifest::from_toml_str(source).expect_err("rejected");
    assert!(
        matches!(err, ManifestError::EmptyField { field } if field == expected),
        "{err}"
    );
}

#[rstest]
#[case::nested("bin/tarts")]
#[case::parent("..")]
#[case::windows("tarts\\tarts.exe")]
fn binary_must_be_a_plain_file_name(#[case] binary: &str) {
    let source = format!(
        "name = \"tarts\"\nversion = \"1\"\nbinary = {binary:?}\n{}",
        "[[artefact]]\nkind = \"source-archive\"\nurl = \"u\"\n"
    );
    let err = PackageManifest::from_toml_str(&source).expect_err("rejected");
    assert!(
        matches!(err, ManifestError::InvalidPathSegment { field: "binary", .. }),
        "{err}"
    );
}

#[rstest]
#[case::name_escapes_upwards("../../../../etc", "0.1.18", "name")]
#[case::name_nested("tarts/evil", "0.1.18", "name")]
#[case::name_parent("..", "0.1.18", "name")]
#[case::version_escapes_upwards("tarts", "../../x", "version")]
#[case::version_nested("tarts", "0.1/18", "version")]
#[case::version_windows("tarts", "0.1\\18", "version")]
fn name_and_version_must_be_plain_segments(
    #[case] name: &str,
    #[case] version: &str,
    #[case] field: &str,
) {
    let source = format!(
        "name = {name:?}\nversion = {version:?}\nbinary = \"tarts\"\n{}",
        "[[artefact]]\nkind = \"source-archive\"\nurl = \"u\"\n"
    );
    let err = PackageManifest::from_toml_str(&source).expect_err("rejected");
    assert!(
        matches!(err, ManifestError::InvalidPathSegment { field: rejected, .. } if rejected == field),
        "{err}"
    );
}

#[test]
fn manifest_without_artefacts_is_rejected() {
    let err = PackageManifest::from_toml_str("name = \"t\"\nversion = \"1\"\n").expect_err("rejected");
    assert!(matches!(err, ManifestError::NoArtefacts));
}

#[test]
fn duplicate_platforms_are_rejected() {
    let source = with_artefacts(
        r#"
        [[artefact]]
        kind = "prebuilt-binary"
        os = "macos"
        arch = "arm64"
        url = "https://example.test/a.tar.gz"

        [[artefact]]
        kind = "prebuilt-binary"
        os = "macos"
        arch = "arm64"
        url = "https://example.test/b.tar.gz"
        "#,
    );
    let err = PackageManifest::from_toml_str(&source).expect_err("rejected");
    assert!(matches!(
        err,
        ManifestError::DuplicatePlatform {
            os: OsFamily::Macos,
            arch: ArchPattern::Arm64,
        }
    ));
}

#[rstest]
#[case::missing_os(
    "[[artefact]]\nkind = \"prebuilt-binary\"\narch = \"arm64\"\nurl = \"u\"\n",
    1
)]
#[case::source_with_os(
    "[[artefact]]\nkind = \"source-archive\"\nurl = \"u\"\n\
     [[artefact]]\nkind = \"source-archive\"\nos = \"linux\"\nurl = \"u\"\n",
    2
)]
#[case::bad_digest(
    "[[artefact]]\nkind = \"source-archive\"\nurl = \"u\"\nsha256 = \"xyz\"\n",
    1
)]
#[case::unknown_placeholder(
    "[[artefact]]\nkind = \"source-archive\"\nurl = \"v{release}.tar.gz\"\n",
    1
)]
fn invalid_artefacts_report_their_position(#[case] artefacts: &str, #[case] expected: usize) {
    let err = PackageManifest::from_toml_str(&with_artefacts(artefacts)).expect_err("rejected");
    assert!(
        matches!(err, ManifestError::InvalidArtefact { index, .. } if index == expected),
        "{err}"
    );
}

#[test]
fn load_reads_from_disk() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("tarts.toml");
    std::fs::write(&path, SOURCE_ONLY).expect("write manifest");
    let utf8 = Utf8PathBuf::from_path_buf(path).expect("UTF-8 path");

    let manifest = PackageManifest::load(&utf8).expect("loads");
    assert_eq!(manifest.artefacts()[0].url(), "https://example.test/v0.1.18.tar.gz");
}

#[test]
fn load_reports_missing_file() {
    let err = PackageManifest::load(Utf8Path::new("/nonexistent/tarts.toml")).expect_err("missing");
    assert!(matches!(err, ManifestError::Read { .. }));
}

#[test]
fn new_enforces_invariants() {
    let err = PackageManifest::new(PackageMetadata::new("tarts", "1"), Vec::new())
        .expect_err("rejected");
    assert!(matches!(err, ManifestError::NoArtefacts));
}
