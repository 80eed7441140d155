//! Wildcard matching of package and class names.

use std::fmt;

/// Errors in a location pattern.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatcherError {
    /// The pattern is empty.
    #[error("location pattern is empty")]
    Empty,

    /// A `*` appears other than at the start or end, or as `**`.
    #[error("'*' is only allowed at the start or end of a location pattern: `{0}`")]
    MisplacedWildcard(String),
}

/// A name pattern with optional leading and trailing `*`.
///
/// `*` matches everything, `*x*` matches names containing `x`, `*x` names
/// ending in `x`, `x*` names starting with `x`; anything else is exact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocationMatcher {
    raw: String,
}

impl LocationMatcher {
    /// Parses a pattern.
    ///
    /// # Errors
    ///
    /// Returns [`MatcherError`] for an empty pattern, `**`, or an inner `*`.
    pub fn new(pattern: impl Into<String>) -> Result<Self, MatcherError> {
        let raw = pattern.into().trim().to_string();
        if raw.is_empty() {
            return Err(MatcherError::Empty);
        }
        let inner = raw.strip_prefix('*').unwrap_or(&raw);
        let inner = inner.strip_suffix('*').unwrap_or(inner);
        if raw == "**" || inner.contains('*') {
            return Err(MatcherError::MisplacedWildcard(raw));
        }
        Ok(Self { raw })
    }

    /// The pattern text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether `name` matches.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        if self.raw == "*" {
            return true;
        }
        match (self.raw.strip_prefix('*'), self.raw.strip_suffix('*')) {
            (Some(rest), Some(_)) => rest
                .strip_suffix('*')
                .is_some_and(|middle| name.contains(middle)),
            (Some(suffix), None) => name.ends_with(suffix),
            (None, Some(prefix)) => name.starts_with(prefix),
            (None, None) => name == self.raw,
        }
    }

    /// 1 for `*`, otherwise 4 minus one per wildcard.
    #[must_use]
    pub fn specificity(&self) -> u8 {
        if self.raw == "*" {
            return 1;
        }
        4 - u8::from(self.raw.starts_with('*')) - u8::from(self.raw.ends_with('*'))
    }
}

impl fmt::Display for LocationMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(s: &str) -> LocationMatcher {
        LocationMatcher::new(s).unwrap()
    }

    #[test]
    fn test_matching() {
        assert!(m("*").matches("com.acme"));
        assert!(m("com.acme*").matches("com.acme.legacy"));
        assert!(!m("com.acme*").matches("org.acme"));
        assert!(m("*.legacy").matches("com.acme.legacy"));
        assert!(m("*acme*").matches("com.acme.legacy"));
        assert!(!m("*acme*").matches("com.example"));
        assert!(m("com.acme").matches("com.acme"));
        assert!(!m("com.acme").matches("com.acme.x"));
    }

    #[test]
    fn test_specificity() {
        assert_eq!(m("*").specificity(), 1);
        assert_eq!(m("*a*").specificity(), 2);
        assert_eq!(m("a*").specificity(), 3);
        assert_eq!(m("a").specificity(), 4);
    }

    #[test]
    fn test_invalid() {
        assert_eq!(LocationMatcher::new(""), Err(MatcherError::Empty));
        assert!(LocationMatcher::new("**").is_err());
        assert!(LocationMatcher::new("com.*.legacy").is_err());
    }
}
