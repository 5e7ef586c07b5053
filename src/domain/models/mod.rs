//! Domain models for capability discovery and caching.

pub mod cache;
pub mod capability;
pub mod config;
pub mod document;
pub mod manifest;

pub use cache::{CachedPage, SiteManifestCacheEntry, ToolDiff};
pub use capability::{empty_object_schema, Capability, Category, ElementHandle, ToolAnnotations, ToolSource};
pub use config::{CacheConfig, Config, DatabaseConfig, DiscoveryConfig, LoggingConfig};
pub use document::{Document, DocumentNode, DocumentRoot, Element, ElementId, ScanArena, ScanId};
pub use manifest::{
    CapabilityManifest, FlatExport, FlatExportMeta, FlatExportTool, ManifestTool, PageToolSet,
};
