//! Broadcast transport for refreshed capability lists.

use tokio::sync::broadcast;
use tracing::trace;

use crate::domain::ports::{ToolsNotifier, ToolsUpdate};

const DEFAULT_CAPACITY: usize = 64;

/// Fans [`ToolsUpdate`]s out to every subscriber over a tokio broadcast
/// channel. Slow subscribers may miss updates (they see `Lagged`).
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<ToolsUpdate>,
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl BroadcastNotifier {
    /// Notifier buffering up to `capacity` updates per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Receive every later update.
    pub fn subscribe(&self) -> broadcast::Receiver<ToolsUpdate> {
        self.sender.subscribe()
    }

    /// Live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl ToolsNotifier for BroadcastNotifier {
    fn notify(&self, update: ToolsUpdate) {
        // Sending with no receivers is not an error for us.
        match self.sender.send(update) {
            Ok(receivers) => trace!(receivers, "tools update broadcast"),
            Err(_) => trace!("tools update dropped; no subscribers"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::UpdateReason;

    fn update() -> ToolsUpdate {
        ToolsUpdate {
            site: "x".into(),
            pattern: "/".into(),
            tools: vec![],
            reason: UpdateReason::Scanned,
        }
    }

    #[tokio::test]
    async fn test_subscribers_receive_updates() {
        let notifier = BroadcastNotifier::default();
        let mut first = notifier.subscribe();
        let mut second = notifier.subscribe();
        assert_eq!(notifier.subscriber_count(), 2);

        notifier.notify(update());
        assert_eq!(first.recv().await.unwrap().site, "x");
        assert_eq!(second.recv().await.unwrap().reason, UpdateReason::Scanned);
    }

    #[test]
    fn test_notify_without_subscribers_is_silent() {
        BroadcastNotifier::new(1).notify(update());
    }
}
