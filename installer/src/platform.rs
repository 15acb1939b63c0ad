//! Host platform detection.
//!
//! The probe reports the operating system family and CPU architecture of the
//! running process. It never fails: anything the installer has no artefacts
//! for maps to an explicit `Other` variant so that selection can still fall
//! through to a source build.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operating system family an artefact is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    /// Apple macOS (Darwin).
    Macos,
    /// Linux with a GNU userland.
    Linux,
    /// Any other operating system.
    Other,
}

impl OsFamily {
    /// Map a `std::env::consts::OS` value to a family.
    ///
    /// # Examples
    ///
    /// ```
    /// use tarts_installer::platform::OsFamily;
    ///
    /// assert_eq!(OsFamily::from_os_name("macos"), OsFamily::Macos);
    /// assert_eq!(OsFamily::from_os_name("freebsd"), OsFamily::Other);
    /// ```
    #[must_use]
    pub fn from_os_name(name: &str) -> Self {
        match name {
            "macos" => Self::Macos,
            "linux" => Self::Linux,
            _ => Self::Other,
        }
    }

    /// Return the lowercase name used in manifests and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Macos => "macos",
            Self::Linux => "linux",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CPU architecture of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum Arch {
    /// 64-bit ARM (`aarch64`).
    #[serde(rename = "arm64")]
    #[value(name = "arm64", alias = "aarch64")]
    Arm64,
    /// 64-bit x86 (`amd64`).
    #[serde(rename = "x86_64")]
    #[value(name = "x86_64", alias = "amd64")]
    X86_64,
    /// Any other architecture.
    #[serde(rename = "other")]
    #[value(name = "other")]
    Other,
}

impl Arch {
    /// Map a `std::env::consts::ARCH` value to an architecture.
    ///
    /// # Examples
    ///
    /// ```
    /// use tarts_installer::platform::Arch;
    ///
    /// assert_eq!(Arch::from_arch_name("aarch64"), Arch::Arm64);
    /// assert_eq!(Arch::from_arch_name("riscv64"), Arch::Other);
    /// ```
    #[must_use]
    pub fn from_arch_name(name: &str) -> Self {
        match name {
            "aarch64" | "arm64" => Self::Arm64,
            "x86_64" | "amd64" => Self::X86_64,
            _ => Self::Other,
        }
    }

    /// Return the name used in manifests and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Arm64 => "arm64",
            Self::X86_64 => "x86_64",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `(os_family, arch)` pair the selector matches artefacts against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Platform {
    /// Operating system family.
    pub os: OsFamily,
    /// CPU architecture.
    pub arch: Arch,
}

impl Platform {
    /// Create a platform from its parts.
    #[must_use]
    pub const fn new(os: OsFamily, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Detect the platform of the running process.
    ///
    /// The values come from the compile-time target, so this is a pure query
    /// with no failure mode.
    #[must_use]
    pub fn detect() -> Self {
        Self::new(
            OsFamily::from_os_name(std::env::consts::OS),
            Arch::from_arch_name(std::env::consts::ARCH),
        )
    }

    /// Return the Rust target triple upstream release archives are named
    /// after, or `None` when either component is `Other`.
    ///
    /// # Examples
    ///
    /// ```
    /// use tarts_installer::platform::{Arch, OsFamily, Platform};
    ///
    /// let platform = Platform::new(OsFamily::Macos, Arch::Arm64);
    /// assert_eq!(platform.target_triple(), Some("aarch64-apple-darwin"));
    /// ```
    #[must_use]
    pub const fn target_triple(self) -> Option<&'static str> {
        match (self.os, self.arch) {
            (OsFamily::Macos, Arch::Arm64) => Some("aarch64-apple-darwin"),
            (OsFamily::Macos, Arch::X86_64) => Some("x86_64-apple-darwin"),
            (OsFamily::Linux, Arch::Arm64) => Some("aarch64-unknown-linux-gnu"),
            (OsFamily::Linux, Arch::X86_64) => Some("x86_64-unknown-linux-gnu"),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}
