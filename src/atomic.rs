//! Replace-by-rename file writes.
//!
//! Output files are staged in a temporary file next to their destination
//! and renamed into place, so an interrupted run never leaves a truncated
//! catalog or archive where a later run would trust it.

use camino::Utf8Path;
use std::io::{self, Write};
use tempfile::NamedTempFile;

/// Create a temporary file in the directory that will hold `path`.
pub(crate) fn staging_file(path: &Utf8Path) -> io::Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    NamedTempFile::new_in(dir)
}

/// Move a staged file to `path` with ordinary world-readable permissions.
pub(crate) fn persist(file: NamedTempFile, path: &Utf8Path) -> io::Result<()> {
    file.as_file().sync_all()?;

    // Temporary files start owner-only; published output is world-readable.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))?;
    }

    file.persist(path).map_err(|err| err.error)?;
    Ok(())
}

/// Write `bytes` to `path` through a staged temporary file.
pub(crate) fn write(path: &Utf8Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = staging_file(path)?;
    file.write_all(bytes)?;
    persist(file, path)
}
