//! tarts installer CLI entrypoint.
//!
//! This binary resolves the package manifest against the host platform and
//! installs the matching artefact, or reports what it would install.

use camino::Utf8PathBuf;
use clap::Parser;
use log::LevelFilter;
use std::error::Error as _;
use std::io::Write;
use tarts_installer::cli::{Cli, Command, InstallArgs, ResolveArgs};
use tarts_installer::dirs::{BaseDirs, SystemBaseDirs, default_prefix};
use tarts_installer::error::{InstallerError, Result};
use tarts_installer::output::{ResolveReport, write_stderr_line};
use tarts_installer::pipeline::{self, InstallRequest};
use tarts_installer::platform::Platform;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbosity);
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &SystemBaseDirs, &mut stdout, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Logs go to stderr at `warn` unless `-v` raises the level; `RUST_LOG`
/// takes precedence over both.
fn init_logging(verbosity: u8) {
    env_logger::Builder::new()
        .filter_level(level_for_verbosity(verbosity))
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

const fn level_for_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn run(
    cli: &Cli,
    dirs: &dyn BaseDirs,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<()> {
    match &cli.command {
        Some(Command::Resolve(args)) => run_resolve(args, stdout),
        Some(Command::Install(_)) | None => {
            run_install(cli.install_args(), cli.quiet, dirs, stdout, stderr)
        }
    }
}

/// Prints the artefact that would be installed, without fetching it.
fn run_resolve(args: &ResolveArgs, stdout: &mut dyn Write) -> Result<()> {
    let manifest = args.target.load_manifest()?;
    let platform = args.target.platform(Platform::detect());
    let resolution = pipeline::resolve(&manifest, platform, args.target.build_from_source);
    let report = ResolveReport::new(manifest.name(), manifest.version(), platform, resolution);

    let text = if args.json {
        serde_json::to_string_pretty(&report)?
    } else {
        report.display_text()
    };
    write_stdout_line(stdout, &text)
}

/// Runs the full install workflow and prints the install report.
fn run_install(
    args: &InstallArgs,
    quiet: bool,
    dirs: &dyn BaseDirs,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<()> {
    let manifest = args.target.load_manifest()?;
    let platform = args.target.platform(Platform::detect());
    let prefix = determine_prefix(args.prefix.clone(), dirs, manifest.name(), manifest.version())?;

    let request = InstallRequest {
        manifest: &manifest,
        platform,
        prefix: &prefix,
        build_from_source: args.target.build_from_source,
        digest_override: args.sha256.clone(),
        quiet,
    };
    let report = pipeline::install(&request, stderr)?;
    write_stdout_line(stdout, &report.display_text())
}

/// Determines the prefix from the CLI or falls back to the default.
fn determine_prefix(
    cli_prefix: Option<Utf8PathBuf>,
    dirs: &dyn BaseDirs,
    name: &str,
    version: &str,
) -> Result<Utf8PathBuf> {
    match cli_prefix {
        Some(prefix) => Ok(prefix),
        None => default_prefix(dirs, name, version),
    }
}

fn write_stdout_line(stdout: &mut dyn Write, text: &str) -> Result<()> {
    writeln!(stdout, "{text}").map_err(|source| InstallerError::WriteFailed { source })
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format_args!("error: {err}"));
            let mut source = err.source();
            while let Some(cause) = source {
                write_stderr_line(stderr, format_args!("  caused by: {cause}"));
                source = cause.source();
            }
            if let Some(stage) = err.stage() {
                write_stderr_line(stderr, format_args!("install stopped at stage: {stage}"));
            }
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tarts_installer::artefact::verification::VerificationError;
    use tarts_installer::cli::TargetArgs;
    use tarts_installer::platform::{Arch, OsFamily};

    struct NoDataDir;

    impl BaseDirs for NoDataDir {
        fn data_dir(&self) -> Option<Utf8PathBuf> {
            None
        }
    }

    fn stdout_text(stdout: Vec<u8>) -> String {
        String::from_utf8(stdout).expect("stdout was not UTF-8")
    }

    #[test]
    fn exit_code_for_run_result_returns_zero_on_success() {
        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Ok(()), &mut stderr);
        assert_eq!(exit_code, 0);
        assert!(stderr.is_empty());
    }

    #[test]
    fn exit_code_for_run_result_prints_chain_and_stage() {
        let err = InstallerError::VerificationFailed {
            url: "https://example.test/tarts.tar.gz".to_owned(),
            source: VerificationError::MissingDigest,
        };

        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Err(err), &mut stderr);
        assert_eq!(exit_code, 1);

        let stderr_text = String::from_utf8(stderr).expect("stderr was not UTF-8");
        assert!(stderr_text.starts_with("error: "), "{stderr_text}");
        assert!(stderr_text.contains("caused by:"), "{stderr_text}");
        assert!(stderr_text.contains("stage: verify-failed"), "{stderr_text}");
    }

    #[test]
    fn exit_code_for_errors_outside_the_workflow_omits_stage() {
        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Err(InstallerError::NoDefaultPrefix), &mut stderr);
        assert_eq!(exit_code, 1);

        let stderr_text = String::from_utf8(stderr).expect("stderr was not UTF-8");
        assert!(!stderr_text.contains("stage"), "{stderr_text}");
    }

    #[rstest]
    #[case::quiet_by_default(0, LevelFilter::Warn)]
    #[case::debug(1, LevelFilter::Debug)]
    #[case::trace(2, LevelFilter::Trace)]
    #[case::saturates(7, LevelFilter::Trace)]
    fn verbosity_raises_log_level(#[case] verbosity: u8, #[case] expected: LevelFilter) {
        assert_eq!(level_for_verbosity(verbosity), expected);
    }

    fn resolve_args(arch: Arch, json: bool) -> ResolveArgs {
        ResolveArgs {
            target: TargetArgs {
                os: Some(OsFamily::Macos),
                arch: Some(arch),
                ..TargetArgs::default()
            },
            json,
        }
    }

    #[test]
    fn resolve_prints_the_bundled_selection() {
        let mut stdout = Vec::new();
        run_resolve(&resolve_args(Arch::Arm64, false), &mut stdout).expect("resolves");

        let text = stdout_text(stdout);
        assert!(text.contains("tarts 0.1.18"), "{text}");
        assert!(text.contains("aarch64-apple-darwin"), "{text}");
        assert!(text.contains("install prebuilt binary"), "{text}");
    }

    #[test]
    fn resolve_json_falls_back_to_source() {
        let mut stdout = Vec::new();
        run_resolve(&resolve_args(Arch::Other, true), &mut stdout).expect("resolves");

        let json: serde_json::Value =
            serde_json::from_slice(&stdout).expect("stdout was not JSON");
        assert_eq!(json["package"], "tarts");
        assert_eq!(json["selected"]["kind"], "source-archive");
        assert_eq!(json["target"], serde_json::Value::Null);
    }

    #[test]
    fn install_without_prefix_or_data_dir_fails_before_fetching() {
        let cli = Cli::parse_from(["tarts-installer", "--quiet"]);
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        let err = run(&cli, &NoDataDir, &mut stdout, &mut stderr).expect_err("no prefix");

        assert!(matches!(err, InstallerError::NoDefaultPrefix), "{err}");
        assert!(stdout.is_empty());
        assert!(stderr.is_empty());
    }

    #[test]
    fn explicit_prefix_wins_over_default() {
        let prefix = determine_prefix(
            Some(Utf8PathBuf::from("/opt/tarts")),
            &NoDataDir,
            "tarts",
            "0.1.18",
        )
        .expect("prefix");
        assert_eq!(prefix, Utf8PathBuf::from("/opt/tarts"));
    }

    #[test]
    fn install_with_missing_manifest_reports_read_error() {
        let cli = Cli::parse_from([
            "tarts-installer",
            "install",
            "--manifest",
            "/nonexistent/formula.toml",
            "--prefix",
            "/tmp/unused",
        ]);
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        let err = run(&cli, &NoDataDir, &mut stdout, &mut stderr).expect_err("no manifest");

        assert!(matches!(err, InstallerError::Manifest(_)), "{err}");
        assert_eq!(err.stage(), None);
    }
}
