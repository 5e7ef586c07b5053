//! Cross-page capability manifest.
//!
//! The manifest keeps one entry per capability name for a whole origin,
//! with a reverse index of the URL patterns each capability was observed
//! on. A capability leaves the manifest only when no page references it.
//!
//! The pure operations are inherent methods on [`CapabilityManifest`];
//! [`ManifestStore`] persists manifests through the key-value port, one
//! key per origin, with every mutation as a single `update` transaction.

use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    Capability, CapabilityManifest, FlatExport, FlatExportMeta, FlatExportTool, ManifestTool,
    PageToolSet, ToolSource,
};
use crate::domain::ports::KeyValueStore;
use crate::services::content_hash::tools_hash;
use crate::services::merge_engine::strip_transient;
use crate::services::url_pattern::to_pattern;

/// Key prefix for persisted manifests.
pub const MANIFEST_KEY_PREFIX: &str = "manifest:";

/// Storage key for an origin's manifest.
pub fn manifest_key(origin: &str) -> String {
    format!("{MANIFEST_KEY_PREFIX}{origin}")
}

impl CapabilityManifest {
    /// Replace the capability set observed on `url`'s pattern.
    ///
    /// Capabilities that disappeared from the page lose the pattern from
    /// their reverse index; current ones are inserted or overwritten with
    /// the latest content.
    pub fn update_page(&mut self, url: &str, tools: &[Capability]) {
        let pattern = to_pattern(url);
        let tools = strip_transient(tools.to_vec());
        let current: BTreeSet<&str> = tools.iter().map(|t| t.name.as_str()).collect();

        for entry in &mut self.tools {
            if !current.contains(entry.tool.name.as_str()) {
                entry.page_patterns.remove(&pattern);
            }
        }
        for tool in &tools {
            self.upsert(tool.clone(), &pattern);
        }

        let page = PageToolSet {
            pattern: pattern.clone(),
            tool_names: current.iter().map(|n| (*n).to_string()).collect(),
            hash: tools_hash(&tools),
            updated_at: Utc::now(),
        };
        self.pages.insert(pattern, page);
        self.finish_mutation();
    }

    /// Incrementally add and remove capabilities on `url`'s pattern.
    pub fn apply_diff(&mut self, url: &str, added: &[Capability], removed: &[String]) {
        let pattern = to_pattern(url);

        for entry in &mut self.tools {
            if removed.contains(&entry.tool.name) {
                entry.page_patterns.remove(&pattern);
            }
        }
        for tool in strip_transient(added.to_vec()) {
            self.upsert(tool, &pattern);
        }
        self.prune();

        let page_tools = self.tools_for_pattern(&pattern);
        let page = PageToolSet {
            pattern: pattern.clone(),
            tool_names: page_tools.iter().map(|t| t.name.clone()).collect(),
            hash: tools_hash(&page_tools),
            updated_at: Utc::now(),
        };
        self.pages.insert(pattern, page);
        self.finish_mutation();
    }

    /// Capabilities referenced by a pattern, in name order.
    pub fn tools_for_pattern(&self, pattern: &str) -> Vec<Capability> {
        self.tools
            .iter()
            .filter(|entry| entry.page_patterns.contains(pattern))
            .map(|entry| entry.tool.clone())
            .collect()
    }

    /// Consumer-facing export.
    pub fn to_flat_export(&self) -> FlatExport {
        let tools: Vec<FlatExportTool> = self
            .tools
            .iter()
            .map(|entry| FlatExportTool {
                name: entry.tool.name.clone(),
                description: entry.tool.description.clone(),
                input_schema: entry.tool.input_schema.clone(),
                annotations: (!entry.tool.annotations.is_empty()).then(|| entry.tool.annotations.clone()),
            })
            .collect();

        FlatExport {
            meta: FlatExportMeta {
                origin: self.origin.clone(),
                version: self.version,
                generated_at: Utc::now().timestamp_millis(),
                page_count: self.pages.len(),
                tool_count: tools.len(),
            },
            tools,
        }
    }

    fn upsert(&mut self, mut tool: Capability, pattern: &str) {
        tool.sanitize_schema();
        match self.tools.iter_mut().find(|entry| entry.tool.name == tool.name) {
            Some(entry) => {
                entry.tool = tool;
                entry.page_patterns.insert(pattern.to_string());
            }
            None => self.tools.push(ManifestTool {
                tool,
                page_patterns: BTreeSet::from([pattern.to_string()]),
            }),
        }
    }

    fn prune(&mut self) {
        self.tools.retain(|entry| !entry.page_patterns.is_empty());
    }

    fn finish_mutation(&mut self) {
        self.prune();
        self.tools.sort_by(|a, b| a.tool.name.cmp(&b.tool.name));
        self.version += 1;
        self.updated_at = Utc::now();
    }
}

/// Persists manifests through a [`KeyValueStore`].
#[derive(Clone)]
pub struct ManifestStore {
    store: Arc<dyn KeyValueStore>,
}

impl ManifestStore {
    /// Manifest store over `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Replace the capabilities of one page and return the new manifest.
    pub async fn update_page(
        &self,
        origin: &str,
        url: &str,
        tools: &[Capability],
    ) -> DomainResult<CapabilityManifest> {
        let url = url.to_string();
        let tools = tools.to_vec();
        let manifest = self
            .mutate(origin, move |manifest| manifest.update_page(&url, &tools))
            .await?;
        debug!(origin, version = manifest.version, tools = manifest.tools.len(), "manifest page updated");
        Ok(manifest)
    }

    /// Apply added and removed capabilities to one page.
    pub async fn apply_diff(
        &self,
        origin: &str,
        url: &str,
        added: &[Capability],
        removed: &[String],
    ) -> DomainResult<CapabilityManifest> {
        let url = url.to_string();
        let added = added.to_vec();
        let removed = removed.to_vec();
        let manifest = self
            .mutate(origin, move |manifest| manifest.apply_diff(&url, &added, &removed))
            .await?;
        debug!(origin, version = manifest.version, tools = manifest.tools.len(), "manifest diff applied");
        Ok(manifest)
    }

    /// Stored manifest of `origin`, if any.
    pub async fn get(&self, origin: &str) -> DomainResult<Option<CapabilityManifest>> {
        self.store
            .get(&manifest_key(origin))
            .await?
            .map(|bytes| serde_json::from_slice(&bytes).map_err(DomainError::from))
            .transpose()
    }

    /// Flat export of an origin's manifest, if one exists.
    pub async fn to_flat_export(&self, origin: &str) -> DomainResult<Option<FlatExport>> {
        Ok(self.get(origin).await?.map(|m| m.to_flat_export()))
    }

    /// Capabilities recorded for `url`'s pattern, marked as served from
    /// the manifest.
    pub async fn get_tools_for_url(&self, origin: &str, url: &str) -> DomainResult<Vec<Capability>> {
        let Some(manifest) = self.get(origin).await? else {
            return Ok(Vec::new());
        };
        Ok(manifest
            .tools_for_pattern(&to_pattern(url))
            .into_iter()
            .map(|mut tool| {
                tool.source = ToolSource::Manifest;
                tool
            })
            .collect())
    }

    /// Delete the manifest of `origin`.
    pub async fn remove(&self, origin: &str) -> DomainResult<()> {
        self.store.delete(&manifest_key(origin)).await
    }

    /// Origins with a stored manifest.
    pub async fn origins(&self) -> DomainResult<Vec<String>> {
        let keys = self.store.keys_with_prefix(MANIFEST_KEY_PREFIX).await?;
        Ok(keys
            .into_iter()
            .filter_map(|key| key.strip_prefix(MANIFEST_KEY_PREFIX).map(str::to_string))
            .collect())
    }

    async fn mutate<F>(&self, origin: &str, apply: F) -> DomainResult<CapabilityManifest>
    where
        F: FnOnce(&mut CapabilityManifest) + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let origin_owned = origin.to_string();

        self.store
            .update(
                &manifest_key(origin),
                Box::new(move |current| {
                    let mut manifest = match current {
                        Some(bytes) => serde_json::from_slice(&bytes)?,
                        None => CapabilityManifest::new(origin_owned),
                    };
                    apply(&mut manifest);
                    let bytes = serde_json::to_vec(&manifest)?;
                    let _ = tx.send(manifest);
                    Ok(Some(bytes))
                }),
            )
            .await?;

        rx.await
            .map_err(|_| DomainError::Storage("manifest update produced no result".to_string()))
    }
}
