//! Background reconciliation of cached pages.
//!
//! A cache hit serves stale-while-revalidate: the cached list is returned
//! immediately and one background cycle rescans the page, diffs it against
//! the cache, and patches the cache and manifest when anything drifted.
//! At most one cycle is in flight per scheduler; requests made while one
//! runs are dropped, and the next cache hit retries.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::errors::DomainResult;
use crate::domain::models::{Document, ToolDiff};
use crate::domain::ports::{ToolsNotifier, ToolsUpdate, UpdateReason};
use crate::services::capability_cache::CapabilityCache;
use crate::services::capability_manifest::ManifestStore;
use crate::services::discovery_service::{scan_cache_key, ScanCache, ScanPipeline};
use crate::services::url_pattern::to_pattern;

/// Result of one reconciliation cycle.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    /// Site key of the page.
    pub site: String,
    /// Pattern the page is cached under.
    pub pattern: String,
    /// Live capabilities compared to the cached page.
    pub diff: ToolDiff,
}

impl ReconcileOutcome {
    /// Whether the cycle found drift and patched storage.
    pub fn drifted(&self) -> bool {
        self.diff.has_changes()
    }
}

/// Counters for the scheduler.
#[derive(Debug, Clone, Default)]
pub struct ReconcileStatus {
    /// Cycles started.
    pub runs: u64,
    /// Cycles that found drift.
    pub drifted: u64,
    /// Cycles that failed.
    pub failed: u64,
    /// Start of the most recent cycle.
    pub last_run: Option<DateTime<Utc>>,
}

/// Clears the in-flight flag when the cycle ends, however it ends.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Single-flight background reconciler.
#[derive(Clone)]
pub struct ReconciliationScheduler {
    pipeline: Arc<ScanPipeline>,
    cache: CapabilityCache,
    manifest: ManifestStore,
    notifier: Arc<dyn ToolsNotifier>,
    in_flight: Arc<AtomicBool>,
    status: Arc<RwLock<ReconcileStatus>>,
    scan_cache: Option<ScanCache>,
}

impl ReconciliationScheduler {
    /// Scheduler with no cycle in flight.
    pub fn new(
        pipeline: Arc<ScanPipeline>,
        cache: CapabilityCache,
        manifest: ManifestStore,
        notifier: Arc<dyn ToolsNotifier>,
    ) -> Self {
        Self {
            pipeline,
            cache,
            manifest,
            notifier,
            in_flight: Arc::new(AtomicBool::new(false)),
            status: Arc::new(RwLock::new(ReconcileStatus::default())),
            scan_cache: None,
        }
    }

    /// Refresh entries of `scan_cache` whenever a cycle patches a page.
    pub fn with_scan_cache(mut self, scan_cache: ScanCache) -> Self {
        self.scan_cache = Some(scan_cache);
        self
    }

    /// Whether a cycle is currently running.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Snapshot of the cycle counters.
    pub async fn status(&self) -> ReconcileStatus {
        self.status.read().await.clone()
    }

    /// Schedule a background cycle. Returns `false` when one is already
    /// in flight and this request was dropped.
    pub fn schedule(&self, site: &str, url: &str, document: Arc<Document>) -> bool {
        self.spawn(site, url, document).is_some()
    }

    /// Like [`schedule`](Self::schedule) but hands back the task.
    pub fn spawn(&self, site: &str, url: &str, document: Arc<Document>) -> Option<JoinHandle<()>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(site, url, "reconciliation already in flight; skipping");
            return None;
        }

        let guard = InFlightGuard(self.in_flight.clone());
        let this = self.clone();
        let site = site.to_string();
        let url = url.to_string();

        Some(tokio::spawn(async move {
            let _guard = guard;
            match this.reconcile(&site, &url, &document).await {
                Ok(outcome) if outcome.drifted() => {
                    info!(
                        site = %outcome.site,
                        pattern = %outcome.pattern,
                        added = outcome.diff.added.len(),
                        removed = outcome.diff.removed.len(),
                        changed = outcome.diff.changed.len(),
                        "reconciliation patched cached page"
                    );
                }
                Ok(outcome) => {
                    debug!(site = %outcome.site, pattern = %outcome.pattern, "cached page up to date");
                }
                Err(e) => {
                    this.status.write().await.failed += 1;
                    warn!(site = %site, url = %url, error = %e, "reconciliation failed");
                }
            }
        }))
    }

    /// Run one cycle in the current task.
    ///
    /// Rescans the document with all three tiers and diffs against the
    /// cached page. On drift added and changed capabilities are upserted
    /// into the manifest and removed ones dropped from it, then the diff is
    /// applied to the cache and subscribers receive the live list.
    ///
    /// The manifest is patched first: if that fails the cached page stays
    /// stale and the next cycle sees the same drift again.
    pub async fn reconcile(&self, site: &str, url: &str, document: &Document) -> DomainResult<ReconcileOutcome> {
        {
            let mut status = self.status.write().await;
            status.runs += 1;
            status.last_run = Some(Utc::now());
        }

        let live = self.pipeline.run(document);
        let diff = self.cache.diff(site, url, &live).await?;
        let outcome = ReconcileOutcome {
            site: site.to_string(),
            pattern: to_pattern(url),
            diff,
        };
        if !outcome.drifted() {
            return Ok(outcome);
        }

        self.manifest
            .apply_diff(site, url, &outcome.diff.upserts(), &outcome.diff.removed)
            .await?;
        self.cache.apply_diff(site, url, &outcome.diff).await?;
        if let Some(scan_cache) = &self.scan_cache {
            scan_cache.insert(scan_cache_key(site, url), Arc::new(live.clone())).await;
        }
        self.status.write().await.drifted += 1;

        self.notifier.notify(ToolsUpdate {
            site: site.to_string(),
            pattern: outcome.pattern.clone(),
            tools: live,
            reason: UpdateReason::Reconciled,
        });
        Ok(outcome)
    }
}
