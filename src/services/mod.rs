//! Discovery services: scanning, merging, caching, and aggregation.

pub mod capability_cache;
pub mod capability_manifest;
pub mod claim_tracker;
pub mod classifier_registry;
pub mod confidence;
pub mod content_hash;
pub mod declarative_scanner;
pub mod discovery_service;
pub mod merge_engine;
pub mod reconciliation;
pub mod rescan_debouncer;
pub mod url_pattern;

pub use capability_cache::{CapabilityCache, DEFAULT_CACHE_TTL};
pub use capability_manifest::ManifestStore;
pub use claim_tracker::ClaimTracker;
pub use classifier_registry::{ClassifierRegistry, DEFAULT_MAX_EMBED_DEPTH};
pub use declarative_scanner::DeclarativeScanner;
pub use discovery_service::{DiscoveryService, MutationRescan, ScanPipeline};
pub use merge_engine::{MergeEngine, DEFAULT_MIN_CONFIDENCE};
pub use reconciliation::{ReconcileOutcome, ReconcileStatus, ReconciliationScheduler};
pub use rescan_debouncer::{DebounceHandle, DebounceStats, RescanDebouncer, RescanHandler};
pub use url_pattern::{site_for, to_pattern};
