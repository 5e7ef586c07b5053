//! Debounced rescans after document mutations.
//!
//! Bursts of mutation notifications collapse into one rescan once the
//! document has been quiet for the configured window.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::domain::models::DiscoveryConfig;

/// Default quiet window before a rescan.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(300);

const CHANNEL_CAPACITY: usize = 64;

/// Called once per settled burst of mutations.
#[async_trait]
pub trait RescanHandler: Send + Sync {
    /// The document has been quiet for the whole window.
    async fn on_settled(&self);
}

/// Counters returned when the debouncer shuts down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebounceStats {
    /// Mutation notifications received.
    pub mutations: u64,
    /// Rescans triggered.
    pub rescans: u64,
}

/// Sender side of a running debouncer. Dropping every handle stops it.
#[derive(Debug, Clone)]
pub struct DebounceHandle {
    tx: mpsc::Sender<()>,
}

impl DebounceHandle {
    /// Report a document mutation.
    ///
    /// A full channel already guarantees a pending rescan, so overflow is
    /// dropped.
    pub fn notify_mutation(&self) {
        if self.tx.try_send(()).is_err() {
            trace!("mutation notification coalesced");
        }
    }
}

/// Spawns the worker that turns mutation bursts into rescans.
pub struct RescanDebouncer;

impl RescanDebouncer {
    /// Start a debouncer task.
    pub fn spawn(window: Duration, handler: Arc<dyn RescanHandler>) -> (DebounceHandle, JoinHandle<DebounceStats>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let task = tokio::spawn(run_loop(window, rx, handler));
        (DebounceHandle { tx }, task)
    }

    /// Start a debouncer using the configured mutation window.
    pub fn from_config(
        config: &DiscoveryConfig,
        handler: Arc<dyn RescanHandler>,
    ) -> (DebounceHandle, JoinHandle<DebounceStats>) {
        Self::spawn(Duration::from_millis(config.mutation_debounce_ms), handler)
    }
}

async fn run_loop(window: Duration, mut rx: mpsc::Receiver<()>, handler: Arc<dyn RescanHandler>) -> DebounceStats {
    let mut stats = DebounceStats::default();

    while rx.recv().await.is_some() {
        stats.mutations += 1;
        let mut closed = false;

        // Keep extending the window while mutations keep arriving.
        loop {
            match tokio::time::timeout(window, rx.recv()).await {
                Ok(Some(())) => stats.mutations += 1,
                Ok(None) => {
                    closed = true;
                    break;
                }
                Err(_) => break,
            }
        }

        debug!(mutations = stats.mutations, "document settled; rescanning");
        handler.on_settled().await;
        stats.rescans += 1;

        if closed {
            break;
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter(AtomicUsize);

    #[async_trait]
    impl RescanHandler for Counter {
        async fn on_settled(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_into_one_rescan() {
        let counter = Arc::new(Counter::default());
        let (handle, task) = RescanDebouncer::spawn(Duration::from_millis(100), counter.clone());

        for _ in 0..10 {
            handle.notify_mutation();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);

        drop(handle);
        let stats = task.await.unwrap();
        assert_eq!(stats, DebounceStats { mutations: 10, rescans: 1 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_rescan_separately() {
        let counter = Arc::new(Counter::default());
        let (handle, task) = RescanDebouncer::spawn(Duration::from_millis(50), counter.clone());

        handle.notify_mutation();
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.notify_mutation();
        handle.notify_mutation();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);

        drop(handle);
        assert_eq!(task.await.unwrap().rescans, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_burst_flushed_on_shutdown() {
        let counter = Arc::new(Counter::default());
        let (handle, task) = RescanDebouncer::spawn(Duration::from_secs(60), counter.clone());

        handle.notify_mutation();
        drop(handle);
        let stats = task.await.unwrap();
        assert_eq!(stats.rescans, 1);
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_configured_window_matches_default() {
        let config = DiscoveryConfig::default();
        assert_eq!(Duration::from_millis(config.mutation_debounce_ms), DEFAULT_DEBOUNCE_WINDOW);

        let counter = Arc::new(Counter::default());
        let (handle, task) = RescanDebouncer::from_config(&config, counter.clone());
        handle.notify_mutation();
        tokio::time::sleep(DEFAULT_DEBOUNCE_WINDOW / 2).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
        tokio::time::sleep(DEFAULT_DEBOUNCE_WINDOW).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);

        drop(handle);
        task.await.unwrap();
    }
}
