//! Error types for processing a single addon package.
//!
//! Every failure raised while reading, archiving or publishing one package
//! is a [`PackageError`]. The reconciler catches these at the package
//! boundary, so none of them stop the rest of a release from updating.

use crate::addon::AddonFieldError;
use camino::Utf8PathBuf;
use std::path::PathBuf;
use thiserror::Error;

/// Errors arising while processing one addon package.
#[derive(Debug, Error)]
pub enum PackageError {
    /// The manifest file exists but could not be read.
    #[error("failed to read manifest {path}")]
    ManifestRead {
        /// Path to the manifest file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The manifest is not well-formed XML.
    #[error("malformed manifest {path}: {reason}")]
    ManifestParse {
        /// Path to the manifest file.
        path: Utf8PathBuf,
        /// Parser diagnostic.
        reason: String,
    },

    /// The manifest root element lacks a required attribute.
    #[error("manifest {path} is missing the required `{field}` attribute")]
    MissingField {
        /// Path to the manifest file.
        path: Utf8PathBuf,
        /// Name of the missing attribute.
        field: &'static str,
    },

    /// A required attribute is present but unusable.
    #[error("manifest {path} has an invalid attribute: {source}")]
    InvalidField {
        /// Path to the manifest file.
        path: Utf8PathBuf,
        /// The validation failure.
        #[source]
        source: AddonFieldError,
    },

    /// Creating the package archive failed.
    #[error("failed to write archive {path}")]
    ArchiveWrite {
        /// Path of the archive being written.
        path: Utf8PathBuf,
        /// The underlying zip or I/O error.
        #[source]
        source: zip::result::ZipError,
    },

    /// Copying a declared asset failed at the destination.
    #[error("failed to publish asset {asset} to {dest}")]
    AssetCopy {
        /// Source file inside the package directory.
        asset: Utf8PathBuf,
        /// Destination path under the output directory.
        dest: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A path inside the package is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", path.display())]
    NonUtf8Path {
        /// The offending path.
        path: PathBuf,
    },
}

/// Result type alias using [`PackageError`].
pub type Result<T> = std::result::Result<T, PackageError>;
