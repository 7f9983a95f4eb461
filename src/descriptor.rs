//! The repository addon's own archive and landing page.
//!
//! Users install a repository by downloading `<id>-<version>.zip` from the
//! repository root, so the root also carries an `index.html` linking to the
//! current descriptor archive.

use crate::addon::{AddonId, AddonVersion, archive_filename};
use crate::archive::{ArchiveEntry, write_zip};
use crate::error::{RepoError, Result};
use crate::manifest::{MANIFEST_FILE_NAME, read_manifest};
use crate::output::human_size;
use crate::package_error::PackageError;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

/// Name of the landing page written next to the descriptor archive.
pub const INDEX_FILE_NAME: &str = "index.html";

/// The descriptor archive and index page written by [`build_descriptor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorArtifact {
    /// The repository addon identifier.
    pub id: AddonId,
    /// The repository addon version.
    pub version: AddonVersion,
    /// Location of the descriptor archive.
    pub archive_path: Utf8PathBuf,
    /// Size of the descriptor archive in bytes.
    pub byte_size: u64,
    /// Location of the rewritten index page.
    pub index_path: Utf8PathBuf,
}

/// Build `<root>/<id>-<version>.zip` from the repository addon at `root` and
/// point `index.html` at it.
///
/// Each of `files` that exists under `root` is stored as `<id>/<file>`;
/// missing files are logged and left out. Returns `None` when `root` has no
/// `addon.xml`.
///
/// # Errors
///
/// Returns [`RepoError::Package`] when the manifest is invalid or the
/// archive cannot be written, [`RepoError::Descriptor`] for a file name
/// that leaves the repository root, and [`RepoError::Io`] when the index
/// page cannot be written.
pub fn build_descriptor<S: AsRef<str>>(
    root: &Utf8Path,
    files: &[S],
) -> Result<Option<DescriptorArtifact>> {
    if !root.join(MANIFEST_FILE_NAME).is_file() {
        log::info!("Repo {MANIFEST_FILE_NAME} not found. Skipping repo zip creation.");
        return Ok(None);
    }

    let manifest = read_manifest(root)?;
    let (id, version) = (manifest.id().clone(), manifest.version().clone());
    let zip_name = archive_filename(&id, &version);
    let archive_path = root.join(&zip_name);
    log::info!("Creating repo zip: {zip_name}");

    let entries = descriptor_entries(root, &id, files, &archive_path)?;
    write_zip(&archive_path, &entries).map_err(|source| PackageError::ArchiveWrite {
        path: archive_path.clone(),
        source,
    })?;
    let byte_size = std::fs::metadata(&archive_path)?.len();
    log::info!("Created repo zip: {zip_name} - {}", human_size(byte_size));

    let index_path = root.join(INDEX_FILE_NAME);
    crate::atomic::write(&index_path, index_html(&zip_name).as_bytes())?;
    log::info!("Updated {INDEX_FILE_NAME} -> {zip_name}");

    Ok(Some(DescriptorArtifact {
        id,
        version,
        archive_path,
        byte_size,
        index_path,
    }))
}

/// Render the landing page linking to `zip_name`.
#[must_use]
pub fn index_html(zip_name: &str) -> String {
    format!("<!DOCTYPE html>\n<a href=\"{zip_name}\">{zip_name}</a>\n")
}

fn descriptor_entries<S: AsRef<str>>(
    root: &Utf8Path,
    id: &AddonId,
    files: &[S],
    archive_path: &Utf8Path,
) -> Result<Vec<ArchiveEntry>> {
    let mut entries = Vec::new();
    for file in files.iter().map(AsRef::as_ref) {
        let relative = Utf8Path::new(file);
        let contained = relative
            .components()
            .all(|component| matches!(component, Utf8Component::Normal(_)));
        if file.is_empty() || !contained {
            return Err(RepoError::Descriptor {
                reason: format!("descriptor file \"{file}\" must be a plain relative path"),
            });
        }

        let source = root.join(relative);
        if !source.is_file() {
            log::warn!("{file} not found, skipping.");
            continue;
        }
        let entry = ArchiveEntry::new(source, format!("{id}/{file}")).map_err(|err| {
            PackageError::ArchiveWrite {
                path: archive_path.to_owned(),
                source: err.into(),
            }
        })?;
        entries.push(entry);
    }
    Ok(entries)
}
