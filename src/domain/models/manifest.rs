//! Cross-page capability manifest models.
//!
//! The manifest is the deduplicated view of every capability seen on a
//! site, with a reverse index from each capability to the URL patterns it
//! was observed on. Behavior lives in
//! [`capability_manifest`](crate::services::capability_manifest).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use super::capability::{Capability, ToolAnnotations};

/// The capability names found on one URL pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageToolSet {
    pub pattern: String,
    pub tool_names: Vec<String>,
    pub hash: String,
    pub updated_at: DateTime<Utc>,
}

/// A capability plus every pattern it has been observed on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestTool {
    #[serde(flatten)]
    pub tool: Capability,
    pub page_patterns: BTreeSet<String>,
}

/// Site-wide manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityManifest {
    pub origin: String,
    pub version: u64,
    pub pages: BTreeMap<String, PageToolSet>,
    pub tools: Vec<ManifestTool>,
    pub updated_at: DateTime<Utc>,
}

impl CapabilityManifest {
    /// Empty manifest at version 0.
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            version: 0,
            pages: BTreeMap::new(),
            tools: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Look up a tool by name.
    pub fn tool(&self, name: &str) -> Option<&ManifestTool> {
        self.tools.iter().find(|t| t.tool.name == name)
    }
}

/// One tool entry in the consumer-facing export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatExportTool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<ToolAnnotations>,
}

/// Export metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatExportMeta {
    pub origin: String,
    pub version: u64,
    /// Epoch milliseconds.
    pub generated_at: i64,
    pub page_count: usize,
    pub tool_count: usize,
}

/// Consumer-facing flat export of a manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatExport {
    pub tools: Vec<FlatExportTool>,
    #[serde(rename = "_meta")]
    pub meta: FlatExportMeta,
}
