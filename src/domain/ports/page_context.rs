//! Ports for the collaborators around the discovery core: the page-context
//! extractor, the native tool tier, and the subscriber transport.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Capability, Document};

/// The current page as seen by one scanning context.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub url: String,
    pub document: Arc<Document>,
}

impl PageSnapshot {
    /// Snapshot of `document` at `url`.
    pub fn new(url: impl Into<String>, document: Document) -> Self {
        Self {
            url: url.into(),
            document: Arc::new(document),
        }
    }
}

/// Supplies the current document root and URL.
pub trait PageContext: Send + Sync {
    fn snapshot(&self) -> DomainResult<PageSnapshot>;
}

/// Platform-declared tools (the native tier).
pub trait NativeToolSource: Send + Sync {
    fn native_tools(&self) -> Vec<Capability>;
}

/// No platform tools.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNativeTools;

impl NativeToolSource for NoNativeTools {
    fn native_tools(&self) -> Vec<Capability> {
        Vec::new()
    }
}

/// A fixed list of platform tools.
#[derive(Debug, Clone, Default)]
pub struct StaticNativeTools {
    tools: Vec<Capability>,
}

impl StaticNativeTools {
    /// Source always returning `tools`.
    pub fn new(tools: Vec<Capability>) -> Self {
        Self { tools }
    }
}

impl NativeToolSource for StaticNativeTools {
    fn native_tools(&self) -> Vec<Capability> {
        self.tools.clone()
    }
}

/// Why subscribers are being sent a capability list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateReason {
    /// A cache miss triggered a full scan.
    Scanned,
    /// Background reconciliation found drift.
    Reconciled,
    /// Document mutations triggered a rescan.
    Mutation,
}

/// A refreshed capability list for one page pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsUpdate {
    pub site: String,
    pub pattern: String,
    pub tools: Vec<Capability>,
    pub reason: UpdateReason,
}

/// Transport for broadcasting refreshed capability lists.
pub trait ToolsNotifier: Send + Sync {
    fn notify(&self, update: ToolsUpdate);
}

/// Drops every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl ToolsNotifier for NullNotifier {
    fn notify(&self, _update: ToolsUpdate) {}
}
