//! Versioned package archives.
//!
//! Each package version is published once as `<output>/<id>/<id>-<version>.zip`.
//! The presence of that file is the only record that the version has been
//! built, so archives are staged next to their destination and renamed into
//! place once complete.

use crate::addon::{AddonId, AddonVersion, archive_filename};
use crate::atomic;
use crate::ignore::IgnoreRules;
use crate::output::human_size;
use crate::package_error::{PackageError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io;
use walkdir::{DirEntry, WalkDir};
use zip::result::{ZipError, ZipResult};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// A freshly written package archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveArtifact {
    /// Identifier of the archived package.
    pub package_id: AddonId,
    /// Version recorded in the archive name.
    pub version: AddonVersion,
    /// Location of the archive on disk.
    pub path: Utf8PathBuf,
    /// Size of the archive in bytes.
    pub byte_size: u64,
}

/// Result of an [`Archiver::archive`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// A new archive was written.
    Built(ArchiveArtifact),
    /// An archive for this version already existed and was kept.
    Skipped {
        /// Location of the existing archive.
        path: Utf8PathBuf,
    },
}

impl ArchiveOutcome {
    /// Location of the archive, whether new or pre-existing.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        match self {
            Self::Built(artifact) => &artifact.path,
            Self::Skipped { path } => path,
        }
    }

    /// Returns `true` when this call wrote the archive.
    #[must_use]
    pub const fn was_built(&self) -> bool {
        matches!(self, Self::Built(_))
    }
}

/// A file selected for inclusion in an archive.
#[derive(Debug)]
pub(crate) struct ArchiveEntry {
    source: Utf8PathBuf,
    name: String,
    size: u64,
    mode: Option<u32>,
}

impl ArchiveEntry {
    /// Describe `source` stored under the archive-internal `name`.
    pub(crate) fn new(source: Utf8PathBuf, name: String) -> io::Result<Self> {
        let metadata = fs::metadata(&source)?;
        Ok(Self {
            source,
            name,
            size: metadata.len(),
            mode: unix_mode(&metadata),
        })
    }
}

/// Builds package archives under an output root.
#[derive(Debug, Clone)]
pub struct Archiver {
    output_root: Utf8PathBuf,
    rules: IgnoreRules,
}

impl Archiver {
    /// Create an archiver writing below `output_root` and excluding paths
    /// matched by `rules`.
    #[must_use]
    pub fn new(output_root: impl Into<Utf8PathBuf>, rules: IgnoreRules) -> Self {
        Self {
            output_root: output_root.into(),
            rules,
        }
    }

    /// Path of the archive for `id` at `version`.
    #[must_use]
    pub fn archive_path(&self, id: &AddonId, version: &AddonVersion) -> Utf8PathBuf {
        self.output_root
            .join(id.as_str())
            .join(archive_filename(id, version))
    }

    /// Archive `package_dir` as `id` at `version`.
    ///
    /// An existing archive for the same version is kept unless `force` is
    /// set. Entries are named `<id>/<relative path>`; files matched by the
    /// ignore rules are left out.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::ArchiveWrite`] when the package cannot be
    /// walked or the archive cannot be written, and
    /// [`PackageError::NonUtf8Path`] for package files with non-UTF-8
    /// names.
    pub fn archive(
        &self,
        package_dir: &Utf8Path,
        id: &AddonId,
        version: &AddonVersion,
        force: bool,
    ) -> Result<ArchiveOutcome> {
        let path = self.archive_path(id, version);
        if !force && path.exists() {
            log::info!("Skipping existing: {id} {version}");
            return Ok(ArchiveOutcome::Skipped { path });
        }

        let write_error = |source: ZipError| PackageError::ArchiveWrite {
            path: path.clone(),
            source,
        };

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|err| write_error(err.into()))?;
        }
        let entries = self.collect_entries(package_dir, id, &path)?;
        write_zip(&path, &entries).map_err(write_error)?;
        let byte_size = fs::metadata(&path)
            .map_err(|err| write_error(err.into()))?
            .len();

        log::info!("Created zip: {id} {version} - {}", human_size(byte_size));
        Ok(ArchiveOutcome::Built(ArchiveArtifact {
            package_id: id.clone(),
            version: version.clone(),
            path,
            byte_size,
        }))
    }

    /// Walk the package in file-name order and select archive entries.
    fn collect_entries(
        &self,
        package_dir: &Utf8Path,
        id: &AddonId,
        archive_path: &Utf8Path,
    ) -> Result<Vec<ArchiveEntry>> {
        // Rules see paths relative to the package's parent directory.
        let dir_name = package_dir.file_name().unwrap_or_else(|| id.as_str());
        let walk_error = |err: walkdir::Error| PackageError::ArchiveWrite {
            path: archive_path.to_owned(),
            source: ZipError::Io(io::Error::from(err)),
        };

        let mut entries = Vec::new();
        let walker = WalkDir::new(package_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_pruned(entry));
        for walked in walker {
            let dir_entry = walked.map_err(walk_error)?;
            if !is_archivable(&dir_entry) {
                continue;
            }

            let source = Utf8PathBuf::from_path_buf(dir_entry.into_path())
                .map_err(|path| PackageError::NonUtf8Path { path })?;
            let Ok(relative) = source.strip_prefix(package_dir) else {
                continue;
            };
            if self.rules.should_ignore(&Utf8Path::new(dir_name).join(relative)) {
                log::trace!("ignoring {source}");
                continue;
            }

            let name = format!("{id}/{}", archive_name(relative));
            log::trace!("adding {name}");
            let archive_entry =
                ArchiveEntry::new(source, name).map_err(|err| PackageError::ArchiveWrite {
                    path: archive_path.to_owned(),
                    source: err.into(),
                })?;
            entries.push(archive_entry);
        }
        Ok(entries)
    }

    /// Directories excluded by segment name are not descended into.
    fn is_pruned(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| self.rules.is_ignored_segment(name))
    }
}

/// Regular files, and symlinks that resolve to regular files.
fn is_archivable(entry: &DirEntry) -> bool {
    let file_type = entry.file_type();
    file_type.is_file() || (file_type.is_symlink() && entry.path().is_file())
}

/// Join the components of `relative` with `/`, whatever the host separator.
fn archive_name(relative: &Utf8Path) -> String {
    relative
        .components()
        .map(|component| component.as_str())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(unix)]
fn unix_mode(metadata: &fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(metadata.permissions().mode())
}

#[cfg(not(unix))]
fn unix_mode(_metadata: &fs::Metadata) -> Option<u32> {
    None
}

/// Write `entries` to a staged zip and move it to `path`.
pub(crate) fn write_zip(path: &Utf8Path, entries: &[ArchiveEntry]) -> ZipResult<()> {
    let mut staged = atomic::staging_file(path)?;
    {
        let mut writer = ZipWriter::new(staged.as_file_mut());
        for entry in entries {
            let mut options = SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .large_file(entry.size >= u64::from(u32::MAX));
            if let Some(mode) = entry.mode {
                options = options.unix_permissions(mode);
            }
            writer.start_file(entry.name.as_str(), options)?;
            let mut source = fs::File::open(&entry.source)?;
            io::copy(&mut source, &mut writer)?;
        }
        writer.finish()?;
    }
    atomic::persist(staged, path)?;
    Ok(())
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;
