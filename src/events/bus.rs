//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] shared by the
//! registry, every node operation and the subscriber workers.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                   Receivers:
//!   node ops  ──┐
//!   fatal()   ──┼──────► Bus ───┬───► ServiceManager::subscribe() (user receivers)
//!   run()     ──┤               └───► subscriber_listener ──► SubscriberSet
//!   workers   ──┘
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks and never fails.
//! - **Bounded capacity**: one ring buffer shared by all receivers; slow
//!   receivers observe `RecvError::Lagged(n)`.
//! - **No persistence**: events are lost if nobody is subscribed at send time.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events.
///
/// Cheap to clone (an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (clamped to at least 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that observes events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
