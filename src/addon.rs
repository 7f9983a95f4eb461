//! Addon identity newtypes.
//!
//! Addon ids and versions end up as path components in the output tree
//! (`zips/<id>/<id>-<version>.zip`), so both are validated on construction.
//! Equality is plain string equality; no version semantics are applied, so
//! `1.0` and `1.0.0` are distinct versions.

use std::fmt;
use thiserror::Error;

/// Errors arising from an unusable addon id or version value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddonFieldError {
    /// The value is empty or whitespace only.
    #[error("{field} must not be empty")]
    Empty {
        /// Which manifest attribute was rejected.
        field: &'static str,
    },

    /// The value cannot be used as a single path component.
    #[error("{field} \"{value}\" is not a valid path component")]
    PathComponent {
        /// Which manifest attribute was rejected.
        field: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Result type alias using [`AddonFieldError`].
pub type Result<T> = std::result::Result<T, AddonFieldError>;

/// A validated addon identifier such as `plugin.video.example`.
///
/// # Examples
///
/// ```
/// use addon_repo::addon::AddonId;
///
/// let id = AddonId::try_from("plugin.video.example").unwrap();
/// assert_eq!(id.as_str(), "plugin.video.example");
/// assert!(AddonId::try_from("../escape").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AddonId(String);

impl AddonId {
    /// Return the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for AddonId {
    type Error = AddonFieldError;

    fn try_from(value: &str) -> Result<Self> {
        validate_component("id", value)?;
        Ok(Self(value.to_owned()))
    }
}

impl TryFrom<String> for AddonId {
    type Error = AddonFieldError;

    fn try_from(value: String) -> Result<Self> {
        validate_component("id", &value)?;
        Ok(Self(value))
    }
}

impl AsRef<str> for AddonId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AddonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An addon version string, compared literally.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AddonVersion(String);

impl AddonVersion {
    /// Return the version as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for AddonVersion {
    type Error = AddonFieldError;

    fn try_from(value: &str) -> Result<Self> {
        validate_component("version", value)?;
        Ok(Self(value.to_owned()))
    }
}

impl AsRef<str> for AddonVersion {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AddonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Return the archive filename for an addon release: `<id>-<version>.zip`.
#[must_use]
pub fn archive_filename(id: &AddonId, version: &AddonVersion) -> String {
    format!("{id}-{version}.zip")
}

fn validate_component(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AddonFieldError::Empty { field });
    }
    if value == "." || value == ".." || value.contains(['/', '\\']) {
        return Err(AddonFieldError::PathComponent {
            field,
            value: value.to_owned(),
        });
    }
    Ok(())
}
