//! Publishing of manifest-declared assets next to package archives.
//!
//! Clients browse icons, fanart and screenshots without downloading the
//! archive, so each of them is mirrored to `<output>/<id>/<relative path>`
//! together with the manifest itself.

use crate::manifest::{AddonManifest, MANIFEST_FILE_NAME};
use crate::package_error::{PackageError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashSet;
use std::fs;

/// Copies a package's manifest and declared assets into the output tree.
#[derive(Debug, Clone)]
pub struct AssetPublisher {
    output_root: Utf8PathBuf,
}

impl AssetPublisher {
    /// Create a publisher writing below `output_root`.
    #[must_use]
    pub fn new(output_root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
        }
    }

    /// Copy the manifest and each declared asset of `manifest` from
    /// `package_dir`, returning the destination paths written.
    ///
    /// The manifest always comes first; each asset is copied once, in
    /// declaration order. Assets missing from the package are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::AssetCopy`] when a destination directory
    /// cannot be created or a file cannot be copied.
    pub fn publish(
        &self,
        package_dir: &Utf8Path,
        manifest: &AddonManifest,
    ) -> Result<Vec<Utf8PathBuf>> {
        let target_dir = self.output_root.join(manifest.id().as_str());
        let mut seen = HashSet::new();
        let mut published = Vec::new();

        let relatives = std::iter::once(Utf8Path::new(MANIFEST_FILE_NAME))
            .chain(manifest.assets().iter().map(Utf8PathBuf::as_path));
        for relative in relatives {
            if !seen.insert(relative) {
                continue;
            }
            let asset = package_dir.join(relative);
            if !asset.is_file() {
                log::debug!("{}: declared asset {relative} not found", manifest.id());
                continue;
            }
            let dest = target_dir.join(relative);
            copy_asset(&asset, &dest)?;
            log::trace!("published {dest}");
            published.push(dest);
        }
        Ok(published)
    }
}

fn copy_asset(asset: &Utf8Path, dest: &Utf8Path) -> Result<()> {
    let copy_error = |source| PackageError::AssetCopy {
        asset: asset.to_owned(),
        dest: dest.to_owned(),
        source,
    };
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(copy_error)?;
    }
    fs::copy(asset, dest).map_err(copy_error)?;
    Ok(())
}
