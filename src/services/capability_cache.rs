//! Persistent capability cache keyed by site and URL pattern.
//!
//! Each site is stored as one JSON-encoded [`SiteManifestCacheEntry`]
//! under `site:{site}`. Every write goes through
//! [`KeyValueStore::update`] on that key, so a `put` racing an
//! `apply_diff` for the same site cannot interleave partial writes.
//!
//! Entries older than the TTL are misses for [`CapabilityCache::get`] but
//! remain available to [`CapabilityCache::get_page`] and
//! [`CapabilityCache::diff`], which reconciliation relies on.

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::domain::errors::DomainResult;
use crate::domain::models::{CachedPage, Capability, SiteManifestCacheEntry, ToolDiff};
use crate::domain::ports::KeyValueStore;
use crate::services::content_hash::{tool_hash, tools_hash};
use crate::services::merge_engine::strip_transient;
use crate::services::url_pattern::to_pattern;

/// Default time-to-live for cached pages (24 hours).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Key prefix for per-site cache entries.
pub const SITE_KEY_PREFIX: &str = "site:";

/// Storage key for a site's cache entry.
pub fn site_key(site: &str) -> String {
    format!("{SITE_KEY_PREFIX}{site}")
}

/// TTL-checked capability cache over a [`KeyValueStore`].
#[derive(Clone)]
pub struct CapabilityCache {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl CapabilityCache {
    /// Create a cache with the default TTL.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_ttl(store, DEFAULT_CACHE_TTL)
    }

    /// Create a cache with a custom TTL.
    pub fn with_ttl(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Age after which a cached page counts as a miss.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached capabilities for the page, or `None` when absent or expired.
    pub async fn get(&self, site: &str, url: &str) -> DomainResult<Option<Vec<Capability>>> {
        self.get_at(site, url, Utc::now()).await
    }

    /// [`get`](Self::get) evaluated at an explicit instant.
    pub async fn get_at(
        &self,
        site: &str,
        url: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<Option<Vec<Capability>>> {
        let Some(page) = self.get_page(site, url).await? else {
            return Ok(None);
        };
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or_else(|_| chrono::Duration::days(36_500));
        if page.is_fresh(now, ttl) {
            Ok(Some(page.tools))
        } else {
            debug!(site, pattern = %page.pattern, scanned_at = %page.scanned_at, "cached page expired");
            Ok(None)
        }
    }

    /// The cached page regardless of age.
    pub async fn get_page(&self, site: &str, url: &str) -> DomainResult<Option<CachedPage>> {
        let pattern = to_pattern(url);
        Ok(self
            .site_entry(site)
            .await?
            .and_then(|mut entry| entry.pages.remove(&pattern)))
    }

    /// The whole cache entry for a site.
    pub async fn site_entry(&self, site: &str) -> DomainResult<Option<SiteManifestCacheEntry>> {
        self.store
            .get(&site_key(site))
            .await?
            .map(|bytes| decode_entry(&bytes))
            .transpose()
    }

    /// Sites with a cache entry.
    pub async fn sites(&self) -> DomainResult<Vec<String>> {
        let keys = self.store.keys_with_prefix(SITE_KEY_PREFIX).await?;
        Ok(keys
            .into_iter()
            .filter_map(|key| key.strip_prefix(SITE_KEY_PREFIX).map(str::to_string))
            .collect())
    }

    /// Replace the page's capabilities, scanned now.
    pub async fn put(&self, site: &str, url: &str, tools: Vec<Capability>) -> DomainResult<()> {
        self.put_at(site, url, tools, Utc::now()).await
    }

    /// Replace the page's capabilities with an explicit scan time.
    pub async fn put_at(
        &self,
        site: &str,
        url: &str,
        tools: Vec<Capability>,
        scanned_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let page = cached_page(to_pattern(url), tools, scanned_at);
        let (pattern, count) = (page.pattern.clone(), page.tools.len());
        let site_owned = site.to_string();

        self.store
            .update(
                &site_key(site),
                Box::new(move |current| {
                    let mut entry = match current {
                        Some(bytes) => decode_entry(&bytes)?,
                        None => SiteManifestCacheEntry::new(site_owned),
                    };
                    entry.pages.insert(page.pattern.clone(), page);
                    entry.version += 1;
                    encode_entry(&entry).map(Some)
                }),
            )
            .await?;

        debug!(site, pattern = %pattern, tools = count, "cached page written");
        Ok(())
    }

    /// Compare a live scan against the cached page.
    pub async fn diff(&self, site: &str, url: &str, live: &[Capability]) -> DomainResult<ToolDiff> {
        let cached = self.get_page(site, url).await?;
        Ok(compute_diff(cached.as_ref(), live))
    }

    /// Patch the cached page with a diff.
    ///
    /// With no cached page the added and changed capabilities are written
    /// as a fresh page. The patched page is re-hashed and re-timestamped.
    pub async fn apply_diff(&self, site: &str, url: &str, diff: &ToolDiff) -> DomainResult<()> {
        let pattern = to_pattern(url);
        let site_owned = site.to_string();
        let diff = diff.clone();
        let key_pattern = pattern.clone();

        self.store
            .update(
                &site_key(site),
                Box::new(move |current| {
                    let mut entry = match current {
                        Some(bytes) => decode_entry(&bytes)?,
                        None => SiteManifestCacheEntry::new(site_owned),
                    };
                    let tools = match entry.pages.remove(&key_pattern) {
                        Some(page) => apply_diff_to(page.tools, &diff),
                        None => diff.upserts(),
                    };
                    entry
                        .pages
                        .insert(key_pattern.clone(), cached_page(key_pattern, tools, Utc::now()));
                    entry.version += 1;
                    encode_entry(&entry).map(Some)
                }),
            )
            .await?;

        debug!(site, pattern = %pattern, "diff applied to cached page");
        Ok(())
    }

    /// Remove one page pattern. The site entry is deleted with its last page.
    pub async fn invalidate(&self, site: &str, url: &str) -> DomainResult<()> {
        let pattern = to_pattern(url);
        self.store
            .update(
                &site_key(site),
                Box::new(move |current| {
                    let Some(bytes) = current else {
                        return Ok(None);
                    };
                    let mut entry = decode_entry(&bytes)?;
                    if entry.pages.remove(&pattern).is_none() {
                        return Ok(Some(bytes));
                    }
                    if entry.pages.is_empty() {
                        return Ok(None);
                    }
                    entry.version += 1;
                    encode_entry(&entry).map(Some)
                }),
            )
            .await
    }

    /// Remove every page of a site.
    pub async fn invalidate_site(&self, site: &str) -> DomainResult<()> {
        self.store.delete(&site_key(site)).await
    }

    /// Remove every cached site. Other keys in the store are untouched.
    pub async fn clear(&self) -> DomainResult<()> {
        let keys = self.store.keys_with_prefix(SITE_KEY_PREFIX).await?;
        try_join_all(keys.iter().map(|key| self.store.delete(key))).await?;
        debug!(sites = keys.len(), "capability cache cleared");
        Ok(())
    }
}

fn cached_page(pattern: String, tools: Vec<Capability>, scanned_at: DateTime<Utc>) -> CachedPage {
    let tools = strip_transient(tools);
    let hash = tools_hash(&tools);
    CachedPage {
        pattern,
        tools,
        hash,
        scanned_at,
    }
}

fn decode_entry(bytes: &[u8]) -> DomainResult<SiteManifestCacheEntry> {
    Ok(serde_json::from_slice(bytes)?)
}

fn encode_entry(entry: &SiteManifestCacheEntry) -> DomainResult<Vec<u8>> {
    Ok(serde_json::to_vec(entry)?)
}

/// Diff a live capability list against a cached page.
///
/// Without a cached page every live capability is added. Otherwise live
/// capabilities are added, changed, or unchanged by name and content
/// hash, and cached names missing from the live list are removed.
pub fn compute_diff(cached: Option<&CachedPage>, live: &[Capability]) -> ToolDiff {
    let Some(cached) = cached else {
        return ToolDiff {
            added: strip_transient(live.to_vec()),
            ..ToolDiff::default()
        };
    };

    let cached_hashes: HashMap<&str, String> = cached
        .tools
        .iter()
        .map(|tool| (tool.name.as_str(), tool_hash(tool)))
        .collect();

    let mut diff = ToolDiff::default();
    for tool in live {
        match cached_hashes.get(tool.name.as_str()) {
            None => diff.added.push(tool.clone().stripped()),
            Some(hash) if *hash != tool_hash(tool) => diff.changed.push(tool.clone().stripped()),
            Some(_) => diff.unchanged += 1,
        }
    }

    let live_names: std::collections::HashSet<&str> = live.iter().map(|t| t.name.as_str()).collect();
    diff.removed = cached
        .tools
        .iter()
        .filter(|tool| !live_names.contains(tool.name.as_str()))
        .map(|tool| tool.name.clone())
        .collect();
    diff
}

/// Apply a diff to a cached capability list.
///
/// Removed names are dropped, changed entries replaced in place, and added
/// entries appended unless already present.
pub fn apply_diff_to(cached: Vec<Capability>, diff: &ToolDiff) -> Vec<Capability> {
    let changed: HashMap<&str, &Capability> = diff.changed.iter().map(|t| (t.name.as_str(), t)).collect();

    let mut tools: Vec<Capability> = cached
        .into_iter()
        .filter(|tool| !diff.removed.contains(&tool.name))
        .map(|tool| match changed.get(tool.name.as_str()) {
            Some(replacement) => (*replacement).clone(),
            None => tool,
        })
        .collect();

    for added in &diff.added {
        if !tools.iter().any(|t| t.name == added.name) {
            tools.push(added.clone());
        }
    }
    tools
}
