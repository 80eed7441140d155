//! Accounting for declarations that never matched anything.
//!
//! Rule patterns, cycle exceptions and ignore entries all need the same
//! bookkeeping: declare every entry up front, record each time one is used,
//! and report the entries whose count stayed at zero.

use std::collections::BTreeMap;

/// Counts uses of declared keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageCounter<K: Ord> {
    counts: BTreeMap<K, usize>,
}

impl<K: Ord> Default for UsageCounter<K> {
    fn default() -> Self {
        Self {
            counts: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Clone> UsageCounter<K> {
    /// Creates an empty counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `key` with a count of zero, keeping an existing count.
    pub fn declare(&mut self, key: K) {
        self.counts.entry(key).or_insert(0);
    }

    /// Records one use of `key`, declaring it if needed.
    pub fn record(&mut self, key: &K) {
        self.record_n(key, 1);
    }

    /// Records `n` uses of `key`.
    pub fn record_n(&mut self, key: &K, n: usize) {
        if let Some(count) = self.counts.get_mut(key) {
            *count += n;
        } else {
            self.counts.insert(key.clone(), n);
        }
    }

    /// Uses recorded for `key`; zero for undeclared keys.
    #[must_use]
    pub fn count(&self, key: &K) -> usize {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Declared keys never used, in key order.
    #[must_use]
    pub fn unused(&self) -> Vec<K> {
        self.counts
            .iter()
            .filter(|(_, &count)| count == 0)
            .map(|(key, _)| key.clone())
            .collect()
    }
}
