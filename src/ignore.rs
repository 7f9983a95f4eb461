//! Path exclusion rules for package archives.
//!
//! A rule matches a relative path when it equals any single path segment
//! (`.git` excludes `foo/.git/config` at any depth) or when it matches as a
//! glob anchored at the right-hand end of the path (`*.pyc` matches
//! `foo/lib/mod.pyc`; `resources/*.psd` matches `foo/resources/art.psd`).

use crate::config::ConfigError;
use camino::{Utf8Component, Utf8Path};
use glob::Pattern;

/// Patterns excluded from every archive unless configured otherwise.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    ".git",
    ".github",
    ".gitignore",
    ".DS_Store",
    "thumbs.db",
    ".idea",
    "venv",
    "__pycache__",
    "*.pyc",
    "*.pyo",
];

/// A single compiled rule.
#[derive(Debug, Clone)]
struct IgnoreRule {
    literal: String,
    anchored: bool,
    components: Vec<Pattern>,
}

impl IgnoreRule {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        let anchored = raw.starts_with('/');
        let components = raw
            .split('/')
            .filter(|part| !part.is_empty())
            .map(|part| {
                Pattern::new(part).map_err(|source| ConfigError::InvalidIgnorePattern {
                    pattern: raw.to_owned(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            literal: raw.to_owned(),
            anchored,
            components,
        })
    }

    fn matches_glob(&self, segments: &[&str]) -> bool {
        if self.components.is_empty() || self.components.len() > segments.len() {
            return false;
        }
        if self.anchored && self.components.len() != segments.len() {
            return false;
        }
        let tail = segments.iter().rev().take(self.components.len());
        self.components
            .iter()
            .rev()
            .zip(tail)
            .all(|(pattern, segment)| pattern.matches(segment))
    }
}

/// An ordered set of ignore rules.
///
/// # Examples
///
/// ```
/// use addon_repo::ignore::IgnoreRules;
/// use camino::Utf8Path;
///
/// let rules = IgnoreRules::default();
/// assert!(rules.should_ignore(Utf8Path::new("foo/.git/HEAD")));
/// assert!(rules.should_ignore(Utf8Path::new("foo/lib/cache.pyc")));
/// assert!(!rules.should_ignore(Utf8Path::new("foo/addon.xml")));
/// ```
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    rules: Vec<IgnoreRule>,
}

impl IgnoreRules {
    /// Compile the given patterns into a rule set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidIgnorePattern`] when a pattern is not a
    /// valid glob.
    pub fn new<I, S>(patterns: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = patterns
            .into_iter()
            .map(|pattern| IgnoreRule::parse(pattern.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Returns `true` when `path` must be left out of archives.
    #[must_use]
    pub fn should_ignore(&self, path: &Utf8Path) -> bool {
        let segments: Vec<&str> = path
            .components()
            .filter_map(|component| match component {
                Utf8Component::Normal(segment) => Some(segment),
                _ => None,
            })
            .collect();

        self.rules.iter().any(|rule| {
            segments.contains(&rule.literal.as_str()) || rule.matches_glob(&segments)
        })
    }

    /// Returns `true` when a single path segment is excluded by literal name.
    ///
    /// Directories whose name matches can be pruned from a walk without
    /// changing which files [`Self::should_ignore`] would accept.
    #[must_use]
    pub fn is_ignored_segment(&self, name: &str) -> bool {
        self.rules.iter().any(|rule| rule.literal == name)
    }

    /// Number of rules in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` when the set has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for IgnoreRules {
    fn default() -> Self {
        // The built-in patterns are all valid globs.
        let rules = DEFAULT_IGNORE_PATTERNS
            .iter()
            .filter_map(|pattern| IgnoreRule::parse(pattern).ok())
            .collect();
        Self { rules }
    }
}
