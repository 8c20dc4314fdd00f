//! Identifier filter: which tests are out of scope for the comparison entirely.

use passgate_types::{FilterPolicy, TestKey, UNKNOWN_FILE};
use std::collections::BTreeSet;

/// Pure predicate over test keys.
///
/// A key is excluded when its file component is [`UNKNOWN_FILE`] or starts with
/// one of the configured prefixes. Outcomes are never consulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFilter {
    excluded_prefixes: Vec<String>,
}

impl KeyFilter {
    pub fn new<I, S>(excluded_prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            excluded_prefixes: excluded_prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_policy(policy: &FilterPolicy) -> Self {
        Self::new(policy.excluded_prefixes.iter().cloned())
    }

    pub fn policy(&self) -> FilterPolicy {
        FilterPolicy {
            excluded_prefixes: self.excluded_prefixes.clone(),
        }
    }

    pub fn excluded_prefixes(&self) -> &[String] {
        &self.excluded_prefixes
    }

    pub fn should_exclude(&self, key: &TestKey) -> bool {
        let file = key.file();
        if file == UNKNOWN_FILE {
            return true;
        }
        self.excluded_prefixes
            .iter()
            .any(|prefix| file.starts_with(prefix.as_str()))
    }

    /// Drop excluded keys. Single pass: the output is a fixed point.
    pub fn retain(&self, keys: BTreeSet<TestKey>) -> BTreeSet<TestKey> {
        keys.into_iter()
            .filter(|key| !self.should_exclude(key))
            .collect()
    }
}

impl Default for KeyFilter {
    fn default() -> Self {
        Self::from_policy(&FilterPolicy::default())
    }
}
