//! Runtime events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`], [`Notification`]: classification and payload
//! - [`Bus`]: thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: node start/stop operations, `fatal()`/`error()`,
//!   `ServiceManager::run`, `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: `ServiceManager::subscribe()` receivers and the manager's
//!   subscriber listener.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind, Notification};
