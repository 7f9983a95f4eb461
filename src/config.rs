//! Repository configuration loaded from `addon-repo.toml`.
//!
//! Every setting has a built-in default, so the file is optional. Values
//! are deserialised with `serde` and `toml`; unknown keys are rejected so a
//! typo does not silently fall back to a default.

use crate::checksum::ChecksumAlgorithm;
use crate::ignore::{DEFAULT_IGNORE_PATTERNS, IgnoreRules};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use thiserror::Error;

/// Name of the configuration file looked up in the repository root.
pub const CONFIG_FILE_NAME: &str = "addon-repo.toml";

/// Release directories processed when none are named on the command line.
pub const DEFAULT_RELEASES: &[&str] = &["omega", "piers", "repo"];

/// Reserved output directory inside each release.
pub const DEFAULT_OUTPUT_DIR: &str = "zips";

/// Files packed into the repository descriptor archive.
pub const DEFAULT_DESCRIPTOR_FILES: &[&str] = &["addon.xml", "icon.jpg", "fanart.jpg"];

/// Errors arising while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration {path}")]
    Read {
        /// Path to the configuration file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for this schema.
    #[error("invalid configuration {path}: {source}")]
    Parse {
        /// Path to the configuration file.
        path: Utf8PathBuf,
        /// The TOML diagnostic.
        #[source]
        source: toml::de::Error,
    },

    /// An ignore pattern is not a valid glob.
    #[error("invalid ignore pattern \"{pattern}\": {source}")]
    InvalidIgnorePattern {
        /// The rejected pattern.
        pattern: String,
        /// The glob diagnostic.
        #[source]
        source: glob::PatternError,
    },
}

/// Settings for a repository build.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepositoryConfig {
    /// Release directories to process, relative to the repository root.
    pub releases: Vec<String>,
    /// Name of the reserved output directory inside each release.
    pub output_dir: String,
    /// Ignore patterns applied when archiving packages.
    pub ignore: Vec<String>,
    /// Digest used for the catalog sidecar file.
    pub checksum: ChecksumAlgorithm,
    /// Remove `__pycache__` and compiled Python files before scanning.
    pub clean_compiled: bool,
    /// Refresh git submodules before building.
    pub update_submodules: bool,
    /// Build the repository descriptor archive and index page.
    pub build_descriptor: bool,
    /// Files packed into the repository descriptor archive.
    pub descriptor_files: Vec<String>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            releases: to_owned_all(DEFAULT_RELEASES),
            output_dir: DEFAULT_OUTPUT_DIR.to_owned(),
            ignore: to_owned_all(DEFAULT_IGNORE_PATTERNS),
            checksum: ChecksumAlgorithm::default(),
            clean_compiled: true,
            update_submodules: true,
            build_descriptor: true,
            descriptor_files: to_owned_all(DEFAULT_DESCRIPTOR_FILES),
        }
    }
}

impl RepositoryConfig {
    /// Load configuration for the repository at `root`.
    ///
    /// An explicit path must exist. Without one, `<root>/addon-repo.toml` is
    /// used when present and the built-in defaults otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`] when the file
    /// cannot be read or parsed.
    pub fn load(root: &Utf8Path, explicit: Option<&Utf8Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(explicit_path) => explicit_path.to_owned(),
            None => {
                let candidate = root.join(CONFIG_FILE_NAME);
                if !candidate.is_file() {
                    log::debug!("no {CONFIG_FILE_NAME} in {root}; using defaults");
                    return Ok(Self::default());
                }
                candidate
            }
        };

        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_toml_str(&contents, &path)?;
        log::debug!("loaded configuration from {path}");
        Ok(config)
    }

    /// Parse configuration from TOML text; `path` is used for diagnostics.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the text is not valid for this
    /// schema.
    pub fn from_toml_str(contents: &str, path: &Utf8Path) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Compile the configured ignore patterns.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidIgnorePattern`] for an invalid glob.
    pub fn ignore_rules(&self) -> Result<IgnoreRules, ConfigError> {
        IgnoreRules::new(&self.ignore)
    }
}

fn to_owned_all(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_owned()).collect()
}
