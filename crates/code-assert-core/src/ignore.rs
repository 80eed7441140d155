//! Suppressing known findings with a recorded reason.
//!
//! An ignore pattern is either `from` (any finding whose source matches) or
//! `from -> to` (dependencies between matching packages). Every pattern must
//! be exercised; patterns that suppressed nothing are reported so stale
//! entries get cleaned up.

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::location::{LocationMatcher, MatcherError};
use crate::usage::UsageCounter;

/// Errors in an ignore pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid ignore pattern `{pattern}`: {source}")]
pub struct IgnoreError {
    /// The offending pattern.
    pub pattern: String,
    /// What is wrong with it.
    pub source: MatcherError,
}

/// One parsed ignore pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnorePattern {
    raw: String,
    source: LocationMatcher,
    target: Option<LocationMatcher>,
}

impl IgnorePattern {
    /// Parses `from` or `from -> to`.
    ///
    /// # Errors
    ///
    /// Returns [`IgnoreError`] if either side is not a valid location pattern.
    pub fn new(pattern: &str) -> Result<Self, IgnoreError> {
        let error = |source| IgnoreError {
            pattern: pattern.to_string(),
            source,
        };
        let (source, target) = match pattern.split_once("->") {
            Some((from, to)) => (
                LocationMatcher::new(from).map_err(error)?,
                Some(LocationMatcher::new(to).map_err(error)?),
            ),
            None => (LocationMatcher::new(pattern).map_err(error)?, None),
        };
        Ok(Self {
            raw: pattern.trim().to_string(),
            source,
            target,
        })
    }

    /// Whether the dependency `from -> to` is covered.
    #[must_use]
    pub fn matches_edge(&self, from: &str, to: &str) -> bool {
        self.source.matches(from) && self.target.as_ref().map_or(true, |t| t.matches(to))
    }

    /// Whether a finding about `name` alone is covered; `from -> to` patterns never are.
    #[must_use]
    pub fn matches_name(&self, name: &str) -> bool {
        self.target.is_none() && self.source.matches(name)
    }

    /// The pattern as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Patterns sharing one reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ignore {
    /// Why the findings are acceptable.
    pub because: String,
    /// What is ignored.
    pub patterns: Vec<IgnorePattern>,
}

impl Ignore {
    /// Creates an entry from raw patterns.
    ///
    /// # Errors
    ///
    /// Returns the first [`IgnoreError`] among `patterns`.
    pub fn new<I, S>(because: impl Into<String>, patterns: I) -> Result<Self, IgnoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            because: because.into(),
            patterns: patterns
                .into_iter()
                .map(|p| IgnorePattern::new(p.as_ref()))
                .collect::<Result<_, _>>()?,
        })
    }
}

/// An ignore pattern that suppressed nothing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct UnusedIgnore {
    /// The entry's reason.
    pub because: String,
    /// The pattern.
    pub pattern: String,
}

/// Applies a list of [`Ignore`] entries and tracks which were used.
#[derive(Debug, Clone)]
pub struct IgnoreFilter<'a> {
    ignores: &'a [Ignore],
    usage: UsageCounter<UnusedIgnore>,
}

impl<'a> IgnoreFilter<'a> {
    /// Starts filtering with `ignores`.
    #[must_use]
    pub fn new(ignores: &'a [Ignore]) -> Self {
        let mut usage = UsageCounter::new();
        for ignore in ignores {
            for pattern in &ignore.patterns {
                usage.declare(key(ignore, pattern));
            }
        }
        Self { ignores, usage }
    }

    /// Drops the items that any pattern covers and returns the rest together
    /// with the number dropped.
    pub fn retain<T>(
        &mut self,
        items: Vec<T>,
        covers: impl Fn(&IgnorePattern, &T) -> bool,
    ) -> (Vec<T>, usize) {
        let mut kept = Vec::with_capacity(items.len());
        let mut ignored = 0;
        for item in items {
            let mut hit = false;
            for ignore in self.ignores {
                for pattern in ignore.patterns.iter().filter(|p| covers(p, &item)) {
                    self.usage.record(&key(ignore, pattern));
                    hit = true;
                }
            }
            if hit {
                ignored += 1;
            } else {
                kept.push(item);
            }
        }
        if ignored > 0 {
            debug!("Ignored {} findings", ignored);
        }
        (kept, ignored)
    }

    /// Patterns that have not covered anything so far.
    #[must_use]
    pub fn unused(&self) -> Vec<UnusedIgnore> {
        self.usage.unused()
    }
}

fn key(ignore: &Ignore, pattern: &IgnorePattern) -> UnusedIgnore {
    UnusedIgnore {
        because: ignore.because.clone(),
        pattern: pattern.as_str().to_string(),
    }
}
