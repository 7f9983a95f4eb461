//! Run-level error type for the repository builder.
//!
//! Package failures never reach this level; they are collected in the
//! release report. A [`RepoError`] means a whole release, the repository
//! descriptor or the run itself could not be completed.

use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::package_error::PackageError;
use thiserror::Error;

/// Errors that stop a release or the run.
#[derive(Debug, Error)]
pub enum RepoError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The release catalog could not be loaded or written.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// A package-level operation failed outside the reconciliation loop.
    #[error(transparent)]
    Package(#[from] PackageError),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A git command failed or timed out.
    #[error("git {operation} failed: {message}")]
    Git {
        /// The git operation that failed.
        operation: &'static str,
        /// Description of the failure.
        message: String,
    },

    /// The repository descriptor could not be built.
    #[error("repository descriptor failed: {reason}")]
    Descriptor {
        /// Description of the failure.
        reason: String,
    },

    /// One or more releases, or the repository descriptor, failed.
    #[error("failed to build: {}", failed.join(", "))]
    Incomplete {
        /// Names of the steps that failed.
        failed: Vec<String>,
    },
}

/// Result type alias using [`RepoError`].
pub type Result<T> = std::result::Result<T, RepoError>;
