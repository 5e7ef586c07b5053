//! Persistent cache records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::capability::Capability;

/// Cached capabilities for one normalized URL pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedPage {
    pub pattern: String,
    pub tools: Vec<Capability>,
    pub hash: String,
    pub scanned_at: DateTime<Utc>,
}

impl CachedPage {
    /// Whether the page is still fresh at `now` for the given TTL.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now.signed_duration_since(self.scanned_at) <= ttl
    }

    /// Names of the cached tools.
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }
}

/// Everything cached for one site.
///
/// `version` increments on every write and is only used to detect change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteManifestCacheEntry {
    pub site: String,
    pub version: u64,
    pub pages: BTreeMap<String, CachedPage>,
}

impl SiteManifestCacheEntry {
    /// An empty entry at version 0.
    pub fn new(site: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            version: 0,
            pages: BTreeMap::new(),
        }
    }
}

/// Difference between a live scan and a cached page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDiff {
    pub added: Vec<Capability>,
    pub removed: Vec<String>,
    pub changed: Vec<Capability>,
    pub unchanged: usize,
}

impl ToolDiff {
    /// Whether anything was added, removed, or changed.
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty() || !self.changed.is_empty()
    }

    /// Added and changed capabilities together.
    pub fn upserts(&self) -> Vec<Capability> {
        self.added.iter().chain(self.changed.iter()).cloned().collect()
    }
}
