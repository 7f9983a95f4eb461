//! Shared fixtures for the release integration and behaviour tests.
//!
//! A [`ReleaseDir`] is a throwaway release directory inside a temporary
//! repository root. Packages are written as plain `addon.xml` manifests
//! with optional extra files, mirroring what a checkout of addon sources
//! looks like on disk.

use addon_repo::generator::{Generator, ReleaseReport, ReleaseSettings};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io::Read;
use tempfile::TempDir;

/// A release directory owned by a temporary repository root.
pub struct ReleaseDir {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl ReleaseDir {
    /// Creates an empty release called `omega`.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir creation succeeds");
        let repo = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("temp dir is UTF-8");
        let root = repo.join("omega");
        fs::create_dir_all(&root).expect("release dir");
        Self { _dir: dir, root }
    }

    /// The release directory.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// The output directory holding archives and the catalog.
    pub fn zips(&self) -> Utf8PathBuf {
        self.root.join("zips")
    }

    /// Writes a package whose manifest declares `id` and `version`.
    pub fn package(&self, id: &str, version: &str) -> Utf8PathBuf {
        self.package_with_manifest(
            id,
            &format!(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<addon id="{id}" name="{id}" version="{version}" provider-name="tests">
  <extension point="xbmc.python.pluginsource" library="default.py"/>
</addon>
"#
            ),
        )
    }

    /// Writes a package directory named `dir_name` with a literal manifest.
    pub fn package_with_manifest(&self, dir_name: &str, manifest: &str) -> Utf8PathBuf {
        let dir = self.root.join(dir_name);
        fs::create_dir_all(&dir).expect("package dir");
        fs::write(dir.join("addon.xml"), manifest).expect("manifest");
        fs::write(dir.join("default.py"), "print('hello')\n").expect("entry point");
        dir
    }

    /// Writes an extra file inside a package.
    pub fn file(&self, package: &str, relative: &str, contents: &str) {
        let path = self.root.join(package).join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("parent dir");
        }
        fs::write(path, contents).expect("package file");
    }

    /// Runs the release pipeline with default settings.
    pub fn build(&self, force: bool) -> ReleaseReport {
        let settings = ReleaseSettings {
            force,
            ..ReleaseSettings::default()
        };
        Generator::new(&self.root, settings)
            .run()
            .expect("release builds")
    }

    /// Reads a file under the output directory.
    pub fn read_output(&self, relative: &str) -> Vec<u8> {
        fs::read(self.zips().join(relative)).expect("output file exists")
    }
}

/// Lists entry names of a zip archive in stored order.
pub fn zip_entry_names(path: &Utf8Path) -> Vec<String> {
    let file = fs::File::open(path).expect("archive opens");
    let archive = zip::ZipArchive::new(file).expect("archive is a zip");
    archive.file_names().map(str::to_owned).collect()
}

/// Reads one entry of a zip archive as text.
pub fn zip_entry_text(path: &Utf8Path, name: &str) -> String {
    let file = fs::File::open(path).expect("archive opens");
    let mut archive = zip::ZipArchive::new(file).expect("archive is a zip");
    let mut entry = archive.by_name(name).expect("entry exists");
    let mut text = String::new();
    entry.read_to_string(&mut text).expect("entry is UTF-8");
    text
}

/// Extracts the `(id, version)` pairs listed in a catalog, in order.
pub fn catalog_entries(bytes: &[u8]) -> Vec<(String, String)> {
    let text = std::str::from_utf8(bytes).expect("catalog is UTF-8");
    let doc = roxmltree::Document::parse(text).expect("catalog is XML");
    doc.root_element()
        .children()
        .filter(|node| node.has_tag_name("addon"))
        .map(|node| {
            (
                node.attribute("id").unwrap_or_default().to_owned(),
                node.attribute("version").unwrap_or_default().to_owned(),
            )
        })
        .collect()
}
