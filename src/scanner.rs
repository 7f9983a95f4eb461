//! Package discovery inside a release directory.
//!
//! The release layout is:
//! ```text
//! {release}/{package}/addon.xml
//! {release}/zips/...            (reserved output, never scanned)
//! ```
//! Hidden directories and directories without a manifest are not packages
//! and are skipped silently.

use crate::manifest::MANIFEST_FILE_NAME;
use camino::Utf8PathBuf;
use std::io;

/// Enumerates package directories directly under a release root.
#[derive(Debug, Clone)]
pub struct PackageScanner {
    release_root: Utf8PathBuf,
    reserved: String,
}

impl PackageScanner {
    /// Create a scanner for `release_root` that skips the `reserved` output
    /// directory.
    #[must_use]
    pub fn new(release_root: impl Into<Utf8PathBuf>, reserved: impl Into<String>) -> Self {
        Self {
            release_root: release_root.into(),
            reserved: reserved.into(),
        }
    }

    /// Lazily yield every package directory under the release root.
    ///
    /// The sequence is finite and restartable: each call starts a fresh
    /// directory listing. Unreadable or non-UTF-8 entries are logged and
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the release root cannot be listed.
    pub fn candidates(&self) -> io::Result<impl Iterator<Item = Utf8PathBuf> + '_> {
        let entries = self.release_root.read_dir_utf8()?;
        Ok(entries
            .filter_map(|listed| match listed {
                Ok(entry) => Some(entry),
                Err(err) => {
                    log::warn!("skipping unreadable entry in {}: {err}", self.release_root);
                    None
                }
            })
            .filter(|entry| self.is_candidate_name(entry.file_name()))
            .map(|entry| entry.into_path())
            .filter(|path| path.is_dir())
            .filter(|path| {
                let has_manifest = path.join(MANIFEST_FILE_NAME).is_file();
                if !has_manifest {
                    log::trace!("{path} has no {MANIFEST_FILE_NAME}; not a package");
                }
                has_manifest
            }))
    }

    fn is_candidate_name(&self, name: &str) -> bool {
        name != self.reserved && !name.starts_with('.')
    }
}
