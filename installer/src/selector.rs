//! Artefact selection.
//!
//! Selection is a pure function over the manifest's priority-ordered
//! descriptor table:
//!
//! 1. the first prebuilt binary whose `(os, arch)` matches exactly;
//! 2. otherwise the first prebuilt binary for the OS that accepts any
//!    architecture;
//! 3. otherwise the first source archive;
//! 4. otherwise [`Resolution::NoMatch`].
//!
//! The tiers take precedence over declaration order: an exact prebuilt
//! match beats an `any`-arch entry or a source archive even when those are
//! declared before it. Declaration order only breaks ties within a tier.

use crate::artefact::descriptor::ArtefactDescriptor;
use crate::manifest::PackageManifest;
use crate::platform::Platform;
use log::debug;

/// Outcome of artefact selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// The descriptor to fetch and install.
    Selected(&'a ArtefactDescriptor),
    /// Nothing in the manifest is installable on this platform.
    NoMatch,
}

impl<'a> Resolution<'a> {
    /// Return the selected descriptor, if any.
    #[must_use]
    pub const fn descriptor(self) -> Option<&'a ArtefactDescriptor> {
        match self {
            Self::Selected(descriptor) => Some(descriptor),
            Self::NoMatch => None,
        }
    }
}

/// Pick the best artefact in `manifest` for `platform`.
///
/// # Examples
///
/// ```
/// use tarts_installer::manifest::PackageManifest;
/// use tarts_installer::platform::{Arch, OsFamily, Platform};
/// use tarts_installer::selector::select;
///
/// let manifest = PackageManifest::bundled().unwrap();
/// let resolution = select(&manifest, Platform::new(OsFamily::Linux, Arch::X86_64));
/// assert!(resolution.descriptor().unwrap().is_source());
/// ```
#[must_use]
pub fn select(manifest: &PackageManifest, platform: Platform) -> Resolution<'_> {
    let artefacts = manifest.artefacts();
    let chosen = artefacts
        .iter()
        .find(|descriptor| descriptor.matches_exactly(platform))
        .or_else(|| {
            artefacts
                .iter()
                .find(|descriptor| descriptor.accepts(platform))
        })
        .or_else(|| select_source_descriptor(manifest));

    match chosen {
        Some(descriptor) => {
            debug!("selected {} for {platform}", descriptor.kind());
            Resolution::Selected(descriptor)
        }
        None => {
            debug!("no artefact in {} matches {platform}", manifest.name());
            Resolution::NoMatch
        }
    }
}

/// Pick the first source archive, ignoring every prebuilt binary.
#[must_use]
pub fn select_source(manifest: &PackageManifest) -> Resolution<'_> {
    select_source_descriptor(manifest).map_or(Resolution::NoMatch, Resolution::Selected)
}

fn select_source_descriptor(manifest: &PackageManifest) -> Option<&ArtefactDescriptor> {
    manifest
        .artefacts()
        .iter()
        .find(|descriptor| descriptor.is_source())
}
