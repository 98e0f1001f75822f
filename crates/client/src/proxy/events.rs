//! Observable proxy events.
//!
//! Observers call [`CacheProxy::subscribe`](super::CacheProxy::subscribe) and
//! receive every event sent after that point. Dropping the receiver
//! unsubscribes. Sending never blocks and succeeds with zero subscribers.

use serde::Serialize;
use tokio::sync::broadcast;

use super::lifecycle::WorkerState;

/// Capacity of the event channel; slow subscribers see `Lagged`.
pub const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorkerEvent {
    StateChanged { state: WorkerState },
    Precached { url: String, partition: String },
    PrecacheFailed { url: String, reason: String },
    Evicted { partition: String },
    ClientsClaimed,
    /// A background revalidation replaced a runtime entry.
    Revalidated { url: String, partition: String },
    CachesCleared { deleted: u64 },
}

/// Sending half shared by the proxy and its strategies.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<WorkerEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkerEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: WorkerEvent) {
        // Err only means nobody is listening.
        let _ = self.tx.send(event);
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
