//! Directory resolution abstraction for platform-specific paths.
//!
//! Only the default install prefix needs a platform directory, so the trait
//! is small; tests substitute [`MockBaseDirs`].

use crate::error::{InstallerError, Result};
use camino::Utf8PathBuf;
use directories_next::BaseDirs as SystemDirs;

/// Application directory name under the platform data directory.
pub const APP_DIR: &str = "tarts-installer";

/// Source of platform base directories.
#[cfg_attr(test, mockall::automock)]
pub trait BaseDirs {
    /// The per-user data directory, if the platform defines one.
    fn data_dir(&self) -> Option<Utf8PathBuf>;
}

/// [`BaseDirs`] backed by `directories-next`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBaseDirs;

impl BaseDirs for SystemBaseDirs {
    fn data_dir(&self) -> Option<Utf8PathBuf> {
        let dirs = SystemDirs::new()?;
        Utf8PathBuf::from_path_buf(dirs.data_dir().to_path_buf()).ok()
    }
}

/// Default install prefix: `<data dir>/tarts-installer/<name>/<version>`.
///
/// # Errors
///
/// Returns [`InstallerError::NoDefaultPrefix`] when the platform has no data
/// directory or it is not valid UTF-8.
///
/// # Examples
///
/// ```
/// use camino::Utf8PathBuf;
/// use tarts_installer::dirs::{BaseDirs, default_prefix};
///
/// struct Fixed;
///
/// impl BaseDirs for Fixed {
///     fn data_dir(&self) -> Option<Utf8PathBuf> {
///         Some(Utf8PathBuf::from("/home/ada/.local/share"))
///     }
/// }
///
/// let prefix = default_prefix(&Fixed, "tarts", "0.1.18").expect("prefix");
/// assert_eq!(prefix, "/home/ada/.local/share/tarts-installer/tarts/0.1.18");
/// ```
pub fn default_prefix(dirs: &dyn BaseDirs, name: &str, version: &str) -> Result<Utf8PathBuf> {
    dirs.data_dir()
        .map(|data| data.join(APP_DIR).join(name).join(version))
        .ok_or(InstallerError::NoDefaultPrefix)
}
