//! CLI argument definitions for the tarts installer.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use crate::artefact::sha256_digest::Sha256Digest;
use crate::manifest::{ManifestError, PackageManifest};
use crate::platform::{Arch, OsFamily, Platform};
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// Install the tarts terminal screensaver for this platform.
#[derive(Parser, Debug)]
#[command(name = "tarts-installer")]
#[command(version, about)]
#[command(long_about = concat!(
    "Install the tarts terminal screensaver for this platform.\n\n",
    "The installer reads a package manifest (a bundled one for tarts by ",
    "default), picks the prebuilt binary matching the host operating system ",
    "and CPU architecture, verifies its SHA-256 digest, installs it under ",
    "<prefix>/bin and runs it once with --version. When no prebuilt binary ",
    "matches, the source archive is fetched, verified and built with ",
    "`cargo install --locked`.\n\n",
    "Nothing is written to the prefix until the downloaded bytes have been ",
    "verified. An artefact without a recorded digest is refused; supply one ",
    "with --sha256.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Show what would be installed on this machine:\n",
    "    $ tarts-installer resolve\n\n",
    "  Install with a known digest into a custom prefix:\n",
    "    $ tarts-installer --sha256 <HEX> --prefix ~/.local\n\n",
    "  Build from source instead of using a prebuilt binary:\n",
    "    $ tarts-installer install --build-from-source --sha256 <HEX>\n\n",
    "  Install from a custom manifest:\n",
    "    $ tarts-installer install --manifest ./formula.toml\n\n",
    "For more information, see: https://github.com/oiwn/tui-screen-savers-rs",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Install arguments (used when no subcommand is given).
    #[command(flatten)]
    pub install: InstallArgs,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Install the package (default when no subcommand given).
    Install(InstallArgs),

    /// Show which artefact would be installed, without fetching it.
    Resolve(ResolveArgs),
}

/// Options shared by every command that selects an artefact.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetArgs {
    /// Package manifest to read [default: bundled tarts manifest].
    #[arg(short, long, value_name = "FILE")]
    pub manifest: Option<Utf8PathBuf>,

    /// Select artefacts for this operating system instead of the host's.
    #[arg(long, value_name = "OS")]
    pub os: Option<OsFamily>,

    /// Select artefacts for this architecture instead of the host's.
    #[arg(long, value_name = "ARCH")]
    pub arch: Option<Arch>,

    /// Skip prebuilt binaries and build the source archive.
    #[arg(long)]
    pub build_from_source: bool,
}

/// Arguments for the install command.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallArgs {
    /// Manifest and platform selection.
    #[command(flatten)]
    pub target: TargetArgs,

    /// Directory to install into [default: platform-specific].
    #[arg(short, long, value_name = "DIR")]
    pub prefix: Option<Utf8PathBuf>,

    /// Expected SHA-256 of the selected artefact, replacing the manifest's.
    #[arg(long, value_name = "HEX")]
    pub sha256: Option<Sha256Digest>,
}

/// Arguments for the resolve command.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveArgs {
    /// Manifest and platform selection.
    #[command(flatten)]
    pub target: TargetArgs,

    /// Output in JSON format for scripting.
    #[arg(long)]
    pub json: bool,
}

impl TargetArgs {
    /// Apply the `--os` and `--arch` overrides to a detected platform.
    ///
    /// # Examples
    ///
    /// ```
    /// use tarts_installer::cli::TargetArgs;
    /// use tarts_installer::platform::{Arch, OsFamily, Platform};
    ///
    /// let args = TargetArgs {
    ///     arch: Some(Arch::X86_64),
    ///     ..TargetArgs::default()
    /// };
    /// let host = Platform::new(OsFamily::Macos, Arch::Arm64);
    /// assert_eq!(args.platform(host), Platform::new(OsFamily::Macos, Arch::X86_64));
    /// ```
    #[must_use]
    pub fn platform(&self, detected: Platform) -> Platform {
        Platform::new(
            self.os.unwrap_or(detected.os),
            self.arch.unwrap_or(detected.arch),
        )
    }

    /// Load the manifest named by `--manifest`, or the bundled one.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] when the file cannot be read or is invalid.
    pub fn load_manifest(&self) -> Result<PackageManifest, ManifestError> {
        match &self.manifest {
            Some(path) => PackageManifest::load(path),
            None => PackageManifest::bundled(),
        }
    }
}

impl Cli {
    /// Returns the effective install arguments.
    ///
    /// If an `Install` subcommand was provided, returns those arguments.
    /// Otherwise returns the flattened install arguments.
    ///
    /// # Note
    ///
    /// When `Command::Resolve` is active, this returns the default flattened
    /// install arguments. Callers should check `self.command` first.
    #[must_use]
    pub fn install_args(&self) -> &InstallArgs {
        match &self.command {
            Some(Command::Install(args)) => args,
            Some(Command::Resolve(_)) | None => &self.install,
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
