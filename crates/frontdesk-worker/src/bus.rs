use tokio::sync::broadcast;

use crate::events::DashboardEvent;

const BUS_CAPACITY: usize = 256;

/// Fan-out of [`DashboardEvent`]s to every current subscriber.
///
/// Subscribers only see events published after they subscribed; a slow
/// subscriber that falls more than the channel capacity behind gets
/// `Lagged` and skips ahead.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DashboardEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    pub fn publish(&self, event: DashboardEvent) {
        // No subscribers is not an error.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
