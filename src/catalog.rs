//! The aggregate addon catalog (`addons.xml`).
//!
//! The catalog holds one manifest per addon id, always ordered by id. It is
//! loaded once per release, transformed by value with [`Catalog::with_entry`]
//! and serialised once at the end. Entries embed the exact source text of
//! each manifest's root element, so unchanged entries round-trip
//! byte-for-byte.

use crate::addon::AddonId;
use crate::manifest::{AddonManifest, parse_document, strip_bom};
use crate::package_error::PackageError;
use camino::{Utf8Path, Utf8PathBuf};
use roxmltree::Node;
use std::collections::BTreeMap;
use std::io;
use thiserror::Error;

/// File name of the catalog inside a release's output directory.
pub const CATALOG_FILE_NAME: &str = "addons.xml";

const XML_DECLARATION: &str = "<?xml version='1.0' encoding='utf-8'?>";
const ROOT_TAG: &str = "addons";

/// Errors arising while loading or persisting the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file exists but could not be read.
    #[error("failed to read catalog {path}")]
    Read {
        /// Path to the catalog file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The catalog is not a well-formed `<addons>` document.
    #[error("malformed catalog {path}: {reason}")]
    Parse {
        /// Path to the catalog file.
        path: Utf8PathBuf,
        /// Parser diagnostic.
        reason: String,
    },

    /// An entry in the catalog is not a usable manifest.
    #[error("invalid entry in catalog {path}")]
    Entry {
        /// Path to the catalog file.
        path: Utf8PathBuf,
        /// Why the entry was rejected.
        #[source]
        source: PackageError,
    },

    /// Writing the catalog or its checksum failed.
    #[error("failed to write {path}")]
    Persist {
        /// Path of the file being written.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Result type alias using [`CatalogError`].
pub type Result<T> = std::result::Result<T, CatalogError>;

/// An id-ordered set of addon manifests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: BTreeMap<AddonId, AddonManifest>,
}

impl Catalog {
    /// Create an empty catalog.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Look up the entry for `id`.
    #[must_use]
    pub fn get(&self, id: &AddonId) -> Option<&AddonManifest> {
        self.entries.get(id)
    }

    /// Return a catalog containing `manifest`, replacing any entry with the
    /// same id.
    #[must_use]
    pub fn with_entry(mut self, manifest: AddonManifest) -> Self {
        self.entries.insert(manifest.id().clone(), manifest);
        self
    }

    /// Iterate over entries in ordinal id order.
    pub fn iter(&self) -> impl Iterator<Item = &AddonManifest> {
        self.entries.values()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the catalog has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load the catalog at `path`, or an empty catalog when the file does
    /// not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Read`], [`CatalogError::Parse`] or
    /// [`CatalogError::Entry`]; a corrupt catalog invalidates every
    /// decision made against it, so nothing is recovered.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("no catalog at {path}; starting empty");
            return Ok(Self::new());
        }
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_xml(&text, path)
    }

    /// Parse catalog text; `path` is used for diagnostics only.
    ///
    /// A duplicated id keeps the last entry.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Parse`] for malformed XML or a foreign root
    /// element, and [`CatalogError::Entry`] for entries without a usable
    /// id or version.
    pub fn from_xml(text: &str, path: &Utf8Path) -> Result<Self> {
        let body = strip_bom(text);
        let document = parse_document(body).map_err(|err| CatalogError::Parse {
            path: path.to_owned(),
            reason: err.to_string(),
        })?;
        let root = document.root_element();
        if !root.has_tag_name(ROOT_TAG) {
            return Err(CatalogError::Parse {
                path: path.to_owned(),
                reason: format!(
                    "expected <{ROOT_TAG}> root element, found <{}>",
                    root.tag_name().name()
                ),
            });
        }

        root.children()
            .filter(Node::is_element)
            .try_fold(Self::new(), |catalog, node| {
                let manifest = AddonManifest::from_element(node, body, path)
                    .map_err(|source| CatalogError::Entry {
                        path: path.to_owned(),
                        source,
                    })?;
                if catalog.get(manifest.id()).is_some() {
                    log::warn!("{path}: duplicate entry for {}; keeping the last", manifest.id());
                }
                Ok(catalog.with_entry(manifest))
            })
    }

    /// Serialise the catalog: an XML declaration, then one entry per line
    /// inside `<addons>`.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str(XML_DECLARATION);
        xml.push('\n');
        xml.push('<');
        xml.push_str(ROOT_TAG);
        xml.push_str(">\n");
        for manifest in self.iter() {
            xml.push_str(manifest.raw_content());
            xml.push('\n');
        }
        xml.push_str("</");
        xml.push_str(ROOT_TAG);
        xml.push_str(">\n");
        xml
    }

    /// Write the catalog to `path`, replacing any previous file, and return
    /// the exact bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Persist`] when the file cannot be written.
    pub fn persist(&self, path: &Utf8Path) -> Result<Vec<u8>> {
        let bytes = self.to_xml().into_bytes();
        crate::atomic::write(path, &bytes).map_err(|source| CatalogError::Persist {
            path: path.to_owned(),
            source,
        })?;
        log::info!("Updated {path}");
        Ok(bytes)
    }
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
