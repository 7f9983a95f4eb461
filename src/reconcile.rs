//! Incremental reconciliation of scanned packages against the catalog.
//!
//! For each package the reconciler decides whether the catalog entry is
//! current. Only new or changed packages are archived, have their assets
//! published and are merged into the catalog; everything else is left
//! untouched so that a run without changes writes nothing.

use crate::archive::{ArchiveOutcome, Archiver};
use crate::assets::AssetPublisher;
use crate::catalog::Catalog;
use crate::manifest::{AddonManifest, read_manifest};
use crate::output::error_chain;
use crate::package_error::{PackageError, Result};
use camino::{Utf8Path, Utf8PathBuf};

/// What to do with a scanned package.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Decision {
    /// The catalog entry is current; nothing is written.
    Skip,
    /// The package is new to the catalog.
    Insert,
    /// The package replaces an existing entry.
    Replace,
}

impl Decision {
    /// Returns `true` for decisions that change the catalog.
    #[must_use]
    pub const fn changes_catalog(self) -> bool {
        !matches!(self, Self::Skip)
    }
}

/// Decide how `manifest` relates to the `existing` catalog entry.
///
/// Versions are compared as literal strings, so `1.0` to `1.0.0` counts as
/// a change.
///
/// # Examples
///
/// ```
/// use addon_repo::manifest::parse_manifest;
/// use addon_repo::reconcile::{Decision, decide};
/// use camino::Utf8Path;
///
/// let path = Utf8Path::new("foo/addon.xml");
/// let old = parse_manifest(r#"<addon id="foo" version="1.0"/>"#, path).expect("valid");
/// let new = parse_manifest(r#"<addon id="foo" version="1.0.0"/>"#, path).expect("valid");
///
/// assert_eq!(decide(None, &new, false), Decision::Insert);
/// assert_eq!(decide(Some(&old), &old, false), Decision::Skip);
/// assert_eq!(decide(Some(&old), &new, false), Decision::Replace);
/// assert_eq!(decide(Some(&old), &old, true), Decision::Replace);
/// ```
#[must_use]
pub fn decide(existing: Option<&AddonManifest>, manifest: &AddonManifest, force: bool) -> Decision {
    match existing {
        None => Decision::Insert,
        Some(entry) if force || entry.version() != manifest.version() => Decision::Replace,
        Some(_) => Decision::Skip,
    }
}

/// The result of processing one package successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageOutcome {
    /// Directory the package was read from.
    pub package_dir: Utf8PathBuf,
    /// The manifest read from the package.
    pub manifest: AddonManifest,
    /// The decision taken.
    pub decision: Decision,
    /// The archive written or reused; `None` when skipped.
    pub archive: Option<ArchiveOutcome>,
    /// Destination paths of published assets.
    pub assets: Vec<Utf8PathBuf>,
}

/// A package that could not be processed.
#[derive(Debug)]
pub struct PackageFailure {
    /// Directory of the failing package.
    pub package_dir: Utf8PathBuf,
    /// Why it failed.
    pub error: PackageError,
}

/// The outcome of reconciling a whole release.
#[derive(Debug)]
pub struct Reconciliation {
    /// The catalog with every changed package merged in.
    pub catalog: Catalog,
    /// `true` when at least one package was inserted or replaced.
    pub dirty: bool,
    /// Packages processed successfully, in scan order.
    pub outcomes: Vec<PackageOutcome>,
    /// Packages that failed, in scan order.
    pub failures: Vec<PackageFailure>,
}

/// Drives archiving and asset publishing for changed packages.
#[derive(Debug, Clone)]
pub struct Reconciler {
    archiver: Archiver,
    publisher: AssetPublisher,
    force: bool,
}

impl Reconciler {
    /// Create a reconciler. With `force`, every package is rebuilt.
    #[must_use]
    pub const fn new(archiver: Archiver, publisher: AssetPublisher, force: bool) -> Self {
        Self {
            archiver,
            publisher,
            force,
        }
    }

    /// Read, decide on and, when changed, archive and publish one package.
    ///
    /// Asset publishing failures are logged and do not fail the package.
    ///
    /// # Errors
    ///
    /// Returns any [`PackageError`] raised while reading the manifest or
    /// writing the archive. The catalog is not consulted for updates in
    /// that case, so the previous entry stays in place.
    pub fn process_package(
        &self,
        catalog: &Catalog,
        package_dir: &Utf8Path,
    ) -> Result<PackageOutcome> {
        let manifest = read_manifest(package_dir)?;
        let decision = decide(catalog.get(manifest.id()), &manifest, self.force);

        if decision == Decision::Skip {
            log::info!("Up to date: {} {}", manifest.id(), manifest.version());
            return Ok(PackageOutcome {
                package_dir: package_dir.to_owned(),
                manifest,
                decision,
                archive: None,
                assets: Vec::new(),
            });
        }

        let archive =
            self.archiver
                .archive(package_dir, manifest.id(), manifest.version(), self.force)?;
        let assets = self
            .publisher
            .publish(package_dir, &manifest)
            .unwrap_or_else(|err| {
                log::warn!("{}: {}", manifest.id(), error_chain(&err));
                Vec::new()
            });

        Ok(PackageOutcome {
            package_dir: package_dir.to_owned(),
            manifest,
            decision,
            archive: Some(archive),
            assets,
        })
    }

    /// Process every package in `packages` and fold the changes into
    /// `catalog`.
    ///
    /// Failures are logged and collected; they never stop the remaining
    /// packages.
    pub fn reconcile<I>(&self, catalog: Catalog, packages: I) -> Reconciliation
    where
        I: IntoIterator<Item = Utf8PathBuf>,
    {
        let initial = Reconciliation {
            catalog,
            dirty: false,
            outcomes: Vec::new(),
            failures: Vec::new(),
        };

        packages.into_iter().fold(initial, |mut state, package_dir| {
            match self.process_package(&state.catalog, &package_dir) {
                Ok(outcome) => {
                    if outcome.decision.changes_catalog() {
                        state.catalog = state.catalog.with_entry(outcome.manifest.clone());
                        state.dirty = true;
                    }
                    state.outcomes.push(outcome);
                }
                Err(error) => {
                    log::error!("Error processing {package_dir}: {}", error_chain(&error));
                    state.failures.push(PackageFailure { package_dir, error });
                }
            }
            state
        })
    }
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
