//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for plugging custom event handlers into a
//! [`ServiceManager`](crate::ServiceManager). Each subscriber is driven by its own
//! worker fed by a bounded queue owned by the [`SubscriberSet`](crate::SubscriberSet).
//!
//! ## Contract
//! - Implementations may be slow; they block neither the services nor other
//!   subscribers.
//! - On queue overflow the event is dropped for that subscriber only and a
//!   `SubscriberOverflow` event is published.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use depvisor::{Event, Notification, Subscribe};
//!
//! struct Pager;
//!
//! #[async_trait]
//! impl Subscribe for Pager {
//!     async fn on_event(&self, ev: &Event) {
//!         if let Some(Notification::Fatal { service }) = ev.notification() {
//!             eprintln!("page on-call: {service} died");
//!         }
//!     }
//!     fn name(&self) -> &'static str { "pager" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event subscribers.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single event.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs and overflow/panic events).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
