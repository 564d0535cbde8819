//! Event bus. A standalone broadcast channel: the nursery is the sole
//! publisher, and any number of subscribers (the stream gateway, tests)
//! drain it independently. Write-only from the nursery's side: nothing
//! in this crate calls back into the nursery.

use swap_types::SwapId;
use swap_types::SwapKind;
use swap_types::SwapStatus;

use tokio::sync::broadcast;

/// A single update to a swap's status, with whatever side data the
/// stream gateway needs to render it.
#[derive(Debug, Clone)]
pub struct SwapUpdate {
    pub id: SwapId,
    pub status: SwapStatus,
    pub transaction_id: Option<String>,
    pub transaction_hex: Option<String>,
    pub preimage: Option<String>,
}

/// Terminal success/failure marker for a swap.
#[derive(Debug, Clone)]
pub enum SwapOutcome {
    Success { id: SwapId, is_reverse: bool },
    Failure { id: SwapId, is_reverse: bool, reason: String },
}

#[derive(Debug, Clone)]
pub enum SwapEvent {
    Update(SwapUpdate),
    Outcome(SwapOutcome),
}

const CHANNEL_CAPACITY: usize = 1024;

/// Cheap to clone (an `Arc`-backed sender) so each collaborator holds
/// its own handle rather than reaching for a global.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SwapEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Publishes an update. Every persisted transition is emitted at
    /// least once; a send with no subscribers is not an error — the
    /// event is simply dropped, since the durable record is the store,
    /// not the bus.
    pub fn publish(&self, event: SwapEvent) {
        let subscriber_count = self.sender.receiver_count();
        if subscriber_count == 0 {
            tracing::debug!("publishing swap event with no subscribers attached");
        }
        // `send` only fails when there are no receivers; that's fine.
        let _ = self.sender.send(event);
    }

    pub fn publish_update(&self, update: SwapUpdate) {
        self.publish(SwapEvent::Update(update));
    }

    pub fn publish_outcome(&self, outcome: SwapOutcome) {
        self.publish(SwapEvent::Outcome(outcome));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SwapEvent> {
        self.sender.subscribe()
    }
}

/// Helper used by tests and the nursery to turn a raw transition into
/// the update shape the bus carries, keeping `SwapKind` out of the wire
/// event (the stream gateway only cares about `status`).
pub fn update_for(id: SwapId, _kind: SwapKind, status: SwapStatus) -> SwapUpdate {
    SwapUpdate {
        id,
        status,
        transaction_id: None,
        transaction_hex: None,
        preimage: None,
    }
}
