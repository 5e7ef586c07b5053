//! Produce the current capabilities of a page.
//!
//! [`ScanPipeline`] runs the three discovery tiers and merges them.
//! [`DiscoveryService`] puts the caches in front of it:
//!
//! 1. the in-memory scan cache (seconds-scale TTL) absorbs bursts of
//!    repeated requests;
//! 2. a fresh persistent cache entry is served as-is and triggers one
//!    background reconciliation;
//! 3. otherwise the pipeline runs and the result is written through to
//!    the cache and manifest.
//!
//! Persistence is best effort. A storage failure is logged and never
//! changes what the caller gets back.

use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::domain::errors::DomainResult;
use crate::domain::models::{Capability, Config, DiscoveryConfig, Document, ScanArena};
use crate::domain::ports::{
    KeyValueStore, NativeToolSource, NoNativeTools, PageContext, PageSnapshot, ToolsNotifier, ToolsUpdate,
    UpdateReason,
};
use crate::services::capability_cache::CapabilityCache;
use crate::services::capability_manifest::ManifestStore;
use crate::services::classifier_registry::ClassifierRegistry;
use crate::services::declarative_scanner::DeclarativeScanner;
use crate::services::merge_engine::{strip_transient, MergeEngine};
use crate::services::reconciliation::ReconciliationScheduler;
use crate::services::rescan_debouncer::RescanHandler;
use crate::services::url_pattern::{site_for, to_pattern};

/// Default in-memory scan cache TTL.
pub const DEFAULT_SCAN_CACHE_TTL: Duration = Duration::from_secs(5);

/// Default in-memory scan cache capacity.
pub const DEFAULT_SCAN_CACHE_CAPACITY: u64 = 256;

/// Short-lived in-memory scan results keyed by site and page pattern.
pub type ScanCache = Cache<String, Arc<Vec<Capability>>>;

/// The three discovery tiers plus the merge.
pub struct ScanPipeline {
    registry: ClassifierRegistry,
    declarative: DeclarativeScanner,
    merge: MergeEngine,
    native: Arc<dyn NativeToolSource>,
}

impl Default for ScanPipeline {
    fn default() -> Self {
        Self::from_config(&DiscoveryConfig::default(), Arc::new(NoNativeTools))
    }
}

impl ScanPipeline {
    /// Pipeline from explicit parts.
    pub fn new(
        registry: ClassifierRegistry,
        declarative: DeclarativeScanner,
        merge: MergeEngine,
        native: Arc<dyn NativeToolSource>,
    ) -> Self {
        Self {
            registry,
            declarative,
            merge,
            native,
        }
    }

    /// Reference classifiers and thresholds from configuration.
    pub fn from_config(config: &DiscoveryConfig, native: Arc<dyn NativeToolSource>) -> Self {
        Self::new(
            ClassifierRegistry::with_defaults(config.max_embed_depth),
            DeclarativeScanner::new(config.max_embed_depth),
            MergeEngine::new(config.min_confidence),
            native,
        )
    }

    /// Classifiers of the inferred tier.
    pub fn registry(&self) -> &ClassifierRegistry {
        &self.registry
    }

    /// Scan, merge, filter, sort, and strip.
    pub fn run(&self, document: &Document) -> Vec<Capability> {
        let arena = ScanArena::new(document);
        let inferred = self.registry.scan_with_arena(&arena);
        let declarative = self.declarative.scan(&arena);
        let native = self.native.native_tools();
        debug!(
            native = native.len(),
            declarative = declarative.len(),
            inferred = inferred.len(),
            "discovery tiers scanned"
        );
        strip_transient(self.merge.merge(native, declarative, inferred))
    }
}

/// Discovery front end for one scanning context.
#[derive(Clone)]
pub struct DiscoveryService {
    pipeline: Arc<ScanPipeline>,
    cache: CapabilityCache,
    manifest: ManifestStore,
    notifier: Arc<dyn ToolsNotifier>,
    reconciler: ReconciliationScheduler,
    scan_cache: ScanCache,
}

impl DiscoveryService {
    /// Create a service with default cache settings.
    pub fn new(pipeline: ScanPipeline, store: Arc<dyn KeyValueStore>, notifier: Arc<dyn ToolsNotifier>) -> Self {
        let pipeline = Arc::new(pipeline);
        let cache = CapabilityCache::new(store.clone());
        let manifest = ManifestStore::new(store);
        let scan_cache = build_scan_cache(DEFAULT_SCAN_CACHE_TTL, DEFAULT_SCAN_CACHE_CAPACITY);
        let reconciler =
            ReconciliationScheduler::new(pipeline.clone(), cache.clone(), manifest.clone(), notifier.clone())
                .with_scan_cache(scan_cache.clone());

        Self {
            pipeline,
            cache,
            manifest,
            notifier,
            reconciler,
            scan_cache,
        }
    }

    /// Create a service configured from `config`.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn ToolsNotifier>,
        native: Arc<dyn NativeToolSource>,
    ) -> Self {
        let pipeline = Arc::new(ScanPipeline::from_config(&config.discovery, native));
        let cache = CapabilityCache::with_ttl(store.clone(), Duration::from_secs(config.cache.ttl_secs));
        let manifest = ManifestStore::new(store);
        let scan_cache = build_scan_cache(
            Duration::from_secs(config.cache.scan_cache_ttl_secs),
            config.cache.scan_cache_capacity,
        );
        let reconciler =
            ReconciliationScheduler::new(pipeline.clone(), cache.clone(), manifest.clone(), notifier.clone())
                .with_scan_cache(scan_cache.clone());

        Self {
            pipeline,
            cache,
            manifest,
            notifier,
            reconciler,
            scan_cache,
        }
    }

    /// Replace the in-memory scan cache settings.
    pub fn with_scan_cache(mut self, ttl: Duration, capacity: u64) -> Self {
        self.scan_cache = build_scan_cache(ttl, capacity);
        self.reconciler = self.reconciler.with_scan_cache(self.scan_cache.clone());
        self
    }

    /// Persistent per-site cache.
    pub fn cache(&self) -> &CapabilityCache {
        &self.cache
    }

    /// Origin-wide manifests.
    pub fn manifest(&self) -> &ManifestStore {
        &self.manifest
    }

    /// Background reconciler fed by cache hits.
    pub fn reconciler(&self) -> &ReconciliationScheduler {
        &self.reconciler
    }

    /// The scan pipeline.
    pub fn pipeline(&self) -> &ScanPipeline {
        &self.pipeline
    }

    /// Current capabilities of the page.
    #[instrument(skip(self, snapshot), fields(url = %snapshot.url))]
    pub async fn current_capabilities(&self, snapshot: &PageSnapshot) -> Vec<Capability> {
        let site = site_for(&snapshot.url);
        let key = scan_cache_key(&site, &snapshot.url);

        if let Some(hit) = self.scan_cache.get(&key).await {
            debug!(site = %site, "scan cache hit");
            return (*hit).clone();
        }

        match self.cache.get(&site, &snapshot.url).await {
            Ok(Some(tools)) => {
                debug!(site = %site, tools = tools.len(), "persistent cache hit");
                // Insert before scheduling: a cycle's refresh must land
                // after the stale entry.
                self.scan_cache.insert(key, Arc::new(tools.clone())).await;
                self.reconciler
                    .schedule(&site, &snapshot.url, snapshot.document.clone());
                return tools;
            }
            Ok(None) => debug!(site = %site, "persistent cache miss"),
            Err(e) => warn!(site = %site, error = %e, "cache read failed; scanning"),
        }

        self.scan_and_persist(&site, snapshot, UpdateReason::Scanned).await
    }

    /// Current capabilities of whatever page the context shows now.
    pub async fn current_capabilities_for(&self, context: &dyn PageContext) -> DomainResult<Vec<Capability>> {
        let snapshot = context.snapshot()?;
        Ok(self.current_capabilities(&snapshot).await)
    }

    /// Scan the page, bypassing both caches, and persist the result.
    pub async fn rescan(&self, snapshot: &PageSnapshot) -> Vec<Capability> {
        let site = site_for(&snapshot.url);
        self.scan_and_persist(&site, snapshot, UpdateReason::Mutation).await
    }

    /// Forget every in-memory scan result.
    pub fn invalidate_scan_cache(&self) {
        self.scan_cache.invalidate_all();
    }

    async fn scan_and_persist(&self, site: &str, snapshot: &PageSnapshot, reason: UpdateReason) -> Vec<Capability> {
        let tools = self.pipeline.run(&snapshot.document);

        if let Err(e) = self.cache.put(site, &snapshot.url, tools.clone()).await {
            warn!(site, error = %e, "cache write failed");
        }
        if let Err(e) = self.manifest.update_page(site, &snapshot.url, &tools).await {
            warn!(site, error = %e, "manifest update failed");
        }

        self.scan_cache
            .insert(scan_cache_key(site, &snapshot.url), Arc::new(tools.clone()))
            .await;
        self.notifier.notify(ToolsUpdate {
            site: site.to_string(),
            pattern: to_pattern(&snapshot.url),
            tools: tools.clone(),
            reason,
        });
        tools
    }
}

fn build_scan_cache(ttl: Duration, capacity: u64) -> ScanCache {
    Cache::builder().max_capacity(capacity).time_to_live(ttl).build()
}

pub(crate) fn scan_cache_key(site: &str, url: &str) -> String {
    format!("{site}\u{1f}{}", to_pattern(url))
}

/// Debounced rescan of the page a context currently shows.
pub struct MutationRescan {
    service: DiscoveryService,
    context: Arc<dyn PageContext>,
}

impl MutationRescan {
    /// Rescan `context` through `service`.
    pub fn new(service: DiscoveryService, context: Arc<dyn PageContext>) -> Self {
        Self { service, context }
    }
}

#[async_trait]
impl RescanHandler for MutationRescan {
    async fn on_settled(&self) {
        self.service.invalidate_scan_cache();
        match self.context.snapshot() {
            Ok(snapshot) => {
                let tools = self.service.rescan(&snapshot).await;
                debug!(url = %snapshot.url, tools = tools.len(), "mutation rescan complete");
            }
            Err(e) => warn!(error = %e, "page context unavailable for rescan"),
        }
    }
}
