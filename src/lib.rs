//! pagecap - page capability discovery
//!
//! pagecap inspects a page's document tree and reports the actions an
//! automated agent could take on it: submitting forms, searching,
//! navigating, controlling media, reacting to posts, and so on. Each action
//! is a [`Capability`] with a JSON-Schema input description.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors, and port traits
//! - **Service Layer** (`services`): classifier registry, merge, URL
//!   patterns, cache, manifest, reconciliation
//! - **Adapters** (`adapters`): heuristic classifiers, key-value stores,
//!   update broadcast
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pagecap::{DiscoveryService, MemoryKeyValueStore, NullNotifier, PageSnapshot, ScanPipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let service = DiscoveryService::new(
//!         ScanPipeline::default(),
//!         Arc::new(MemoryKeyValueStore::new()),
//!         Arc::new(NullNotifier),
//!     );
//!     let page = PageSnapshot::new("https://example.com/", pagecap::Document::from_json(r#"{"tag":"body"}"#)?);
//!     let tools = service.current_capabilities(&page).await;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use adapters::{BroadcastNotifier, MemoryKeyValueStore, SqliteKeyValueStore};
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    CachedPage, Capability, CapabilityManifest, Category, Config, Document, DocumentNode, FlatExport,
    SiteManifestCacheEntry, ToolAnnotations, ToolDiff, ToolSource,
};
pub use domain::ports::{
    Classifier, KeyValueStore, NativeToolSource, NullNotifier, PageContext, PageSnapshot, ToolsNotifier,
    ToolsUpdate, UpdateReason,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    CapabilityCache, ClassifierRegistry, DiscoveryService, ManifestStore, MergeEngine, ReconciliationScheduler,
    RescanDebouncer, ScanPipeline,
};
