//! Catalog integrity stamping.
//!
//! After the catalog is written, its exact bytes are hashed and the
//! lowercase hex digest is stored in a sidecar file next to it
//! (`addons.xml.md5` by default). Clients compare the sidecar with their
//! cached copy to decide whether to download the catalog again.

use crate::catalog::CatalogError;
use camino::{Utf8Path, Utf8PathBuf};
use md5::Md5;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::fmt;

/// Digest algorithm used for the catalog sidecar.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    /// MD5, written as `<catalog>.md5`.
    #[default]
    Md5,
    /// SHA-256, written as `<catalog>.sha256`.
    Sha256,
}

impl ChecksumAlgorithm {
    /// File extension appended to the catalog name for the sidecar.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
        }
    }
}

/// A hex-encoded digest of a catalog document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksum {
    hex: String,
}

impl Checksum {
    /// Hash `bytes` with `algorithm`.
    ///
    /// # Examples
    ///
    /// ```
    /// use addon_repo::checksum::{Checksum, ChecksumAlgorithm};
    ///
    /// let digest = Checksum::compute(b"", ChecksumAlgorithm::Md5);
    /// assert_eq!(digest.as_str(), "d41d8cd98f00b204e9800998ecf8427e");
    /// ```
    #[must_use]
    pub fn compute(bytes: &[u8], algorithm: ChecksumAlgorithm) -> Self {
        let hex = match algorithm {
            ChecksumAlgorithm::Md5 => format!("{:x}", Md5::digest(bytes)),
            ChecksumAlgorithm::Sha256 => format!("{:x}", Sha256::digest(bytes)),
        };
        Self { hex }
    }

    /// Return the digest as a lowercase hex string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.hex
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hex)
    }
}

/// Return the sidecar path for `catalog_path`, e.g. `addons.xml.md5`.
#[must_use]
pub fn sidecar_path(catalog_path: &Utf8Path, algorithm: ChecksumAlgorithm) -> Utf8PathBuf {
    let mut name = catalog_path.as_str().to_owned();
    name.push('.');
    name.push_str(algorithm.extension());
    Utf8PathBuf::from(name)
}

/// Hash the catalog bytes just written and persist the sidecar file.
///
/// The sidecar holds the hex digest only, without a trailing newline.
///
/// # Errors
///
/// Returns [`CatalogError::Persist`] when the sidecar cannot be written.
pub fn stamp(
    catalog_path: &Utf8Path,
    catalog_bytes: &[u8],
    algorithm: ChecksumAlgorithm,
) -> Result<Checksum, CatalogError> {
    let checksum = Checksum::compute(catalog_bytes, algorithm);
    let path = sidecar_path(catalog_path, algorithm);
    crate::atomic::write(&path, checksum.as_str().as_bytes())
        .map_err(|source| CatalogError::Persist { path: path.clone(), source })?;
    log::info!("Updated {path}");
    Ok(checksum)
}

/// Returns `true` when the sidecar for `catalog_path` holds the digest of
/// `catalog_bytes`. A missing or unreadable sidecar is not current.
#[must_use]
pub fn is_current(
    catalog_path: &Utf8Path,
    catalog_bytes: &[u8],
    algorithm: ChecksumAlgorithm,
) -> bool {
    let expected = Checksum::compute(catalog_bytes, algorithm);
    std::fs::read_to_string(sidecar_path(catalog_path, algorithm))
        .is_ok_and(|recorded| recorded == expected.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case::md5(ChecksumAlgorithm::Md5, "900150983cd24fb0d6963f7d28e17f72")]
    #[case::sha256(
        ChecksumAlgorithm::Sha256,
        concat!(
            "ba7816bf8f01cfea414140de5dae2223",
            "b00361a396177a9cb410ff61f20015ad"
        )
    )]
    fn compute_known_digests(#[case] algorithm: ChecksumAlgorithm, #[case] expected: &str) {
        let digest = Checksum::compute(b"abc", algorithm);
        assert_eq!(digest.as_str(), expected);
    }

    #[rstest]
    #[case(ChecksumAlgorithm::Md5, "zips/addons.xml.md5")]
    #[case(ChecksumAlgorithm::Sha256, "zips/addons.xml.sha256")]
    fn sidecar_appends_extension(#[case] algorithm: ChecksumAlgorithm, #[case] expected: &str) {
        let path = sidecar_path(Utf8Path::new("zips/addons.xml"), algorithm);
        assert_eq!(path, Utf8PathBuf::from(expected));
    }

    #[test]
    fn stamp_writes_bare_hex_digest() {
        let dir = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("UTF-8");
        let catalog = root.join("addons.xml");
        let bytes = b"<addons />";
        std::fs::write(&catalog, bytes).expect("write catalog");

        let checksum = stamp(&catalog, bytes, ChecksumAlgorithm::Md5).expect("stamp");

        let written = std::fs::read_to_string(root.join("addons.xml.md5")).expect("read sidecar");
        assert_eq!(written, checksum.as_str());
        assert!(!written.ends_with('\n'));
    }

    #[test]
    fn is_current_detects_missing_and_stale_sidecars() {
        let dir = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("UTF-8");
        let catalog = root.join("addons.xml");
        let bytes = b"<addons />";

        assert!(!is_current(&catalog, bytes, ChecksumAlgorithm::Md5));
        stamp(&catalog, b"<addons/>", ChecksumAlgorithm::Md5).expect("stamp");
        assert!(!is_current(&catalog, bytes, ChecksumAlgorithm::Md5));
        stamp(&catalog, bytes, ChecksumAlgorithm::Md5).expect("stamp");
        assert!(is_current(&catalog, bytes, ChecksumAlgorithm::Md5));
        assert!(!is_current(&catalog, bytes, ChecksumAlgorithm::Sha256));
    }
}
