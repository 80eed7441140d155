//! Package patterns used by dependency rules.

use std::fmt;

/// Errors in a package pattern.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    /// The pattern is empty.
    #[error("package pattern is empty")]
    Empty,

    /// A `*` appears somewhere other than at the end.
    #[error("'*' is only allowed at the end of a package pattern: `{0}`")]
    MisplacedWildcard(String),
}

/// A package name with an optional trailing wildcard.
///
/// - `*` matches every package.
/// - `com.acme.*` matches `com.acme` and all packages below it.
/// - `com.acme*` matches every package whose name starts with `com.acme`.
/// - `com.acme` matches exactly that package.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackagePattern {
    raw: String,
}

impl PackagePattern {
    /// Parses a pattern.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] if the pattern is empty or has a `*` before its end.
    pub fn new(pattern: impl Into<String>) -> Result<Self, PatternError> {
        let raw = pattern.into().trim().to_string();
        if raw.is_empty() {
            return Err(PatternError::Empty);
        }
        if raw.strip_suffix('*').unwrap_or(&raw).contains('*') {
            return Err(PatternError::MisplacedWildcard(raw));
        }
        Ok(Self { raw })
    }

    /// The pattern text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether this pattern is the universal `*`.
    #[must_use]
    pub fn is_universal(&self) -> bool {
        self.raw == "*"
    }

    /// Whether `package` matches.
    #[must_use]
    pub fn matches(&self, package: &str) -> bool {
        match self.raw.strip_suffix('*') {
            None => self.raw == package,
            Some("") => true,
            Some(prefix) => match prefix.strip_suffix('.') {
                Some(base) => package == base || package.starts_with(prefix),
                None => package.starts_with(prefix),
            },
        }
    }

    /// How specific the pattern is: 1 for `*`, 3 with a trailing `*`, 4 otherwise.
    ///
    /// When several rules apply to one dependency, the most specific one decides.
    #[must_use]
    pub fn specificity(&self) -> u8 {
        if self.is_universal() {
            1
        } else if self.raw.ends_with('*') {
            3
        } else {
            4
        }
    }
}

impl fmt::Display for PackagePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
