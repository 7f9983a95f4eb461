//! Incremental builder for Kodi addon repositories.
//!
//! This crate scans release directories of addon packages, keeps each
//! release's `addons.xml` catalog in step with the packages on disk, zips
//! new or changed package versions, publishes their declared assets and
//! stamps the catalog with a checksum. It is used by the `addon-repo` CLI
//! binary and can be driven programmatically for testing.
//!
//! # Modules
//!
//! - [`addon`] - Validated addon identifiers and versions
//! - [`archive`] - Versioned package archives
//! - [`assets`] - Publishing of manifest-declared assets
//! - [`catalog`] - The aggregate `addons.xml` catalog
//! - [`checksum`] - Catalog integrity stamping
//! - [`clean`] - Removal of compiled Python artefacts
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Repository configuration loading
//! - [`descriptor`] - The repository addon's archive and index page
//! - [`error`] - Run-level error type
//! - [`generator`] - The per-release build pipeline
//! - [`git`] - Submodule refresh with a timeout
//! - [`ignore`] - Path exclusion rules for archives
//! - [`manifest`] - Addon manifest (`addon.xml`) reader
//! - [`output`] - Size and summary formatting
//! - [`package_error`] - Errors raised while processing one package
//! - [`reconcile`] - Skip, insert or replace decisions per package
//! - [`scanner`] - Package discovery inside a release directory

pub mod addon;
pub mod archive;
pub mod assets;
mod atomic;
pub mod catalog;
pub mod checksum;
pub mod clean;
pub mod cli;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod generator;
pub mod git;
pub mod ignore;
pub mod manifest;
pub mod output;
pub mod package_error;
pub mod reconcile;
pub mod scanner;
