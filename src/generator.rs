//! The per-release build pipeline.
//!
//! A release directory is processed in one pass: compiled caches are
//! cleaned, the catalog is loaded, every package is reconciled, and the
//! catalog and its checksum are written only when something changed.

use crate::archive::Archiver;
use crate::assets::AssetPublisher;
use crate::catalog::{CATALOG_FILE_NAME, Catalog, CatalogError};
use crate::checksum::{Checksum, ChecksumAlgorithm, is_current, stamp};
use crate::clean::clean_compiled;
use crate::config::{ConfigError, RepositoryConfig};
use crate::error::Result;
use crate::ignore::IgnoreRules;
use crate::reconcile::{PackageFailure, PackageOutcome, Reconciler};
use crate::scanner::PackageScanner;
use camino::{Utf8Path, Utf8PathBuf};

/// Settings shared by every release of a run.
#[derive(Debug, Clone)]
pub struct ReleaseSettings {
    /// Name of the reserved output directory inside the release.
    pub output_dir: String,
    /// Rules excluding files from archives.
    pub rules: IgnoreRules,
    /// Digest written next to the catalog.
    pub checksum: ChecksumAlgorithm,
    /// Remove compiled Python caches before scanning.
    pub clean_compiled: bool,
    /// Rebuild every package regardless of its catalog entry.
    pub force: bool,
}

impl ReleaseSettings {
    /// Derive release settings from repository configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidIgnorePattern`] when an ignore pattern
    /// does not compile.
    pub fn from_config(
        config: &RepositoryConfig,
        force: bool,
    ) -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            output_dir: config.output_dir.clone(),
            rules: config.ignore_rules()?,
            checksum: config.checksum,
            clean_compiled: config.clean_compiled,
            force,
        })
    }
}

impl Default for ReleaseSettings {
    fn default() -> Self {
        Self {
            output_dir: crate::config::DEFAULT_OUTPUT_DIR.to_owned(),
            rules: IgnoreRules::default(),
            checksum: ChecksumAlgorithm::default(),
            clean_compiled: true,
            force: false,
        }
    }
}

/// What happened to one release.
#[derive(Debug)]
pub struct ReleaseReport {
    release_root: Utf8PathBuf,
    outcomes: Vec<PackageOutcome>,
    failures: Vec<PackageFailure>,
    catalog_written: bool,
    checksum: Option<Checksum>,
}

impl ReleaseReport {
    /// The release directory processed.
    #[must_use]
    pub fn release_root(&self) -> &Utf8Path {
        &self.release_root
    }

    /// Packages processed successfully, in scan order.
    #[must_use]
    pub fn outcomes(&self) -> &[PackageOutcome] {
        &self.outcomes
    }

    /// Packages that failed, in scan order.
    #[must_use]
    pub fn failures(&self) -> &[PackageFailure] {
        &self.failures
    }

    /// Number of packages inserted or replaced.
    #[must_use]
    pub fn changed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.decision.changes_catalog())
            .count()
    }

    /// Returns `true` when the catalog was rewritten.
    #[must_use]
    pub const fn catalog_written(&self) -> bool {
        self.catalog_written
    }

    /// The checksum stamped during this run: for a rewritten catalog, or
    /// when an unchanged catalog's sidecar was missing or stale.
    #[must_use]
    pub const fn checksum(&self) -> Option<&Checksum> {
        self.checksum.as_ref()
    }
}

/// Builds one release directory.
#[derive(Debug, Clone)]
pub struct Generator {
    release_root: Utf8PathBuf,
    settings: ReleaseSettings,
}

impl Generator {
    /// Create a generator for `release_root`.
    #[must_use]
    pub fn new(release_root: impl Into<Utf8PathBuf>, settings: ReleaseSettings) -> Self {
        Self {
            release_root: release_root.into(),
            settings,
        }
    }

    /// The reserved output directory of this release.
    #[must_use]
    pub fn output_root(&self) -> Utf8PathBuf {
        self.release_root.join(&self.settings.output_dir)
    }

    /// Run the pipeline for this release.
    ///
    /// Package failures are recorded in the report and do not make the
    /// release fail.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::RepoError::Io`] when the output directory
    /// cannot be created or the release cannot be listed, and
    /// [`crate::error::RepoError::Catalog`] when the catalog cannot be
    /// loaded, written or stamped.
    pub fn run(&self) -> Result<ReleaseReport> {
        let output_root = self.output_root();
        std::fs::create_dir_all(&output_root)?;

        if self.settings.clean_compiled {
            let removed = clean_compiled(&self.release_root);
            log::debug!("removed {} compiled artefact(s)", removed.len());
        }

        let catalog_path = output_root.join(CATALOG_FILE_NAME);
        let catalog = Catalog::load(&catalog_path)?;
        let scanner = PackageScanner::new(&self.release_root, &self.settings.output_dir);
        let reconciler = Reconciler::new(
            Archiver::new(&output_root, self.settings.rules.clone()),
            AssetPublisher::new(&output_root),
            self.settings.force,
        );

        let reconciliation = reconciler.reconcile(catalog, scanner.candidates()?);

        let checksum = if reconciliation.dirty {
            let bytes = reconciliation.catalog.persist(&catalog_path)?;
            Some(stamp(&catalog_path, &bytes, self.settings.checksum)?)
        } else {
            log::info!("No changes for {}", self.release_root);
            self.restamp_if_stale(&catalog_path)?
        };

        Ok(ReleaseReport {
            release_root: self.release_root.clone(),
            outcomes: reconciliation.outcomes,
            failures: reconciliation.failures,
            catalog_written: reconciliation.dirty,
            checksum,
        })
    }

    /// Rewrite the sidecar of an unchanged catalog when it does not match.
    ///
    /// A run that wrote the catalog but failed to stamp it would otherwise
    /// leave the mismatch in place forever.
    fn restamp_if_stale(&self, catalog_path: &Utf8Path) -> Result<Option<Checksum>> {
        if !catalog_path.is_file() {
            return Ok(None);
        }
        let bytes = std::fs::read(catalog_path).map_err(|source| CatalogError::Read {
            path: catalog_path.to_owned(),
            source,
        })?;
        if is_current(catalog_path, &bytes, self.settings.checksum) {
            return Ok(None);
        }
        log::warn!("Checksum for {catalog_path} is missing or stale; restamping");
        Ok(Some(stamp(catalog_path, &bytes, self.settings.checksum)?))
    }
}

#[cfg(test)]
#[path = "generator_tests.rs"]
mod tests;
