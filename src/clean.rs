//! Removal of compiled Python artefacts from a release tree.
//!
//! Packages are distributed as source; interpreter caches left behind by
//! local testing are deleted before scanning so they never reach an
//! archive or change its contents between runs.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use walkdir::WalkDir;

const CACHE_DIR_NAME: &str = "__pycache__";
const COMPILED_EXTENSIONS: &[&str] = &["pyc", "pyo"];

/// Something removed by [`clean_compiled`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removed {
    /// A `__pycache__` directory and its contents.
    Cache(Utf8PathBuf),
    /// A single compiled file.
    Binary(Utf8PathBuf),
}

/// Delete every `__pycache__` directory and `*.pyc`/`*.pyo` file below
/// `release_root`.
///
/// Failures are logged as warnings and the walk continues.
#[must_use = "the removed paths are reported to the caller"]
pub fn clean_compiled(release_root: &Utf8Path) -> Vec<Removed> {
    let mut removed = Vec::new();
    let mut walker = WalkDir::new(release_root).sort_by_file_name().into_iter();
    while let Some(walked) = walker.next() {
        let entry = match walked {
            Ok(dir_entry) => dir_entry,
            Err(err) => {
                log::warn!("cannot inspect {release_root}: {err}");
                continue;
            }
        };
        let Ok(path) = Utf8PathBuf::from_path_buf(entry.path().to_path_buf()) else {
            continue;
        };
        let file_type = entry.file_type();

        if file_type.is_dir() && entry.depth() > 0 && entry.file_name() == CACHE_DIR_NAME {
            walker.skip_current_dir();
            match fs::remove_dir_all(&path) {
                Ok(()) => {
                    log::info!("Removed cache: {path}");
                    removed.push(Removed::Cache(path));
                }
                Err(err) => log::warn!("failed to remove {path}: {err}"),
            }
        } else if file_type.is_file() && is_compiled(&path) {
            match fs::remove_file(&path) {
                Ok(()) => {
                    log::info!("Removed binary: {path}");
                    removed.push(Removed::Binary(path));
                }
                Err(err) => log::warn!("failed to remove {path}: {err}"),
            }
        }
    }
    removed
}

fn is_compiled(path: &Utf8Path) -> bool {
    path.extension()
        .is_some_and(|extension| COMPILED_EXTENSIONS.contains(&extension))
}
