//! Label and annotation propagation from a Hawtio onto its children.

use crate::error::{OperatorError, OperatorResult};
use regex::Regex;
use std::collections::BTreeMap;

/// Matches metadata keys against glob patterns where `*` matches any run of
/// characters. A pattern without `*` matches exactly one key.
#[derive(Debug, Clone)]
pub struct KeyMatcher {
    patterns: Vec<Regex>,
}

impl KeyMatcher {
    /// Compile `patterns`. Empty patterns are skipped.
    pub fn new(patterns: &[String]) -> OperatorResult<Self> {
        let patterns = patterns
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(|p| {
                let body = p.split('*').map(regex::escape).collect::<Vec<_>>().join(".*");
                Regex::new(&format!("^{body}$")).map_err(|e| {
                    OperatorError::InvalidConfig(format!("invalid metadata pattern {p:?}: {e}"))
                })
            })
            .collect::<OperatorResult<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Whether `key` matches any pattern.
    pub fn matches(&self, key: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(key))
    }

    /// Entries of `source` whose key matches.
    pub fn select(&self, source: Option<&BTreeMap<String, String>>) -> BTreeMap<String, String> {
        if self.patterns.is_empty() {
            return BTreeMap::new();
        }
        source
            .into_iter()
            .flatten()
            .filter(|(k, _)| self.matches(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
