//! Per-destination configuration and credential maps.
//!
//! Both are flat string maps. Lookups treat blank values as absent so that
//! a newer key left empty falls through to its legacy counterpart.

use std::collections::BTreeMap;
use std::fmt;

const DEFAULT_THREADS: &str = "2";

/// Service-name fragments and the cover-count keys older settings used.
const LEGACY_COVER_KEYS: [(&str, &str); 4] = [
    ("imx", "imx_cover_count"),
    ("pix", "pix_cover_count"),
    ("turbo", "turbo_cover_count"),
    ("vipr", "vipr_cover_count"),
];

/// Configuration values for one destination, copied per group before
/// dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceConfig {
    values: BTreeMap<String, String>,
}

impl ServiceConfig {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing map.
    #[must_use]
    pub const fn from_map(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }

    /// Returns the trimmed value for `key`, or `None` when it is missing or
    /// blank.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// Returns the first non-blank value among `keys`.
    #[must_use]
    pub fn first_of(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.get(key))
    }

    /// Returns the value for `key` or `default`.
    #[must_use]
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Interprets `key` as a boolean switch.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).is_some_and(|value| {
            matches!(
                value.to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
    }

    /// Worker thread count for `service`, read from `<prefix>_threads`
    /// where the prefix is the identifier up to its first dot.
    #[must_use]
    pub fn threads_for(&self, service: &str) -> &str {
        let prefix = service.split('.').next().unwrap_or(service);
        self.get_or(&format!("{prefix}_threads"), DEFAULT_THREADS)
    }

    /// Number of leading files routed to the cover sub-job.
    ///
    /// Reads `cover_count`, then the legacy per-service key. Values that do
    /// not parse count as zero.
    #[must_use]
    pub fn cover_count_for(&self, service: &str) -> usize {
        let legacy = LEGACY_COVER_KEYS
            .iter()
            .find(|(marker, _)| service.contains(marker))
            .map(|(_, key)| *key);
        self.get("cover_count")
            .or_else(|| legacy.and_then(|key| self.get(key)))
            .and_then(|value| value.parse().ok())
            .unwrap_or(0)
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Returns the underlying map.
    #[must_use]
    pub const fn as_map(&self) -> &BTreeMap<String, String> {
        &self.values
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ServiceConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// Credentials for one or more destinations.
///
/// `Debug` prints the keys only.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    values: BTreeMap<String, String>,
}

impl Credentials {
    /// Creates an empty credential set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing map.
    #[must_use]
    pub const fn from_map(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }

    /// Returns the value for `key` when it is present and non-empty.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Returns `true` when every key in `keys` has a non-empty value.
    #[must_use]
    pub fn has_all(&self, keys: &[&str]) -> bool {
        keys.iter().all(|key| self.get(key).is_some())
    }

    /// Returns the underlying map.
    #[must_use]
    pub const fn as_map(&self) -> &BTreeMap<String, String> {
        &self.values
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Credentials {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}
