//! # Runtime events emitted by service nodes and the manager.
//!
//! The [`EventKind`] enum classifies events across four categories:
//! - **Notifications**: `Error` and `Fatal`, raised by service instances
//! - **Lifecycle events**: start/stop progress of each node
//! - **Shutdown events**: emitted by [`ServiceManager::run`](crate::ServiceManager::run)
//! - **Subscriber events**: overflow and panics of subscriber workers
//!
//! The [`Event`] struct carries metadata such as the timestamp, the service name
//! and, for failures, the [`ServiceError`] payload.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use depvisor::{Event, EventKind, Notification};
//!
//! let ev = Event::new(EventKind::Fatal).with_service("db");
//!
//! assert_eq!(ev.kind, EventKind::Fatal);
//! assert_eq!(ev.notification(), Some(Notification::Fatal { service: "db".into() }));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::error::ServiceError;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Notifications ===
    /// A service instance reported a recoverable problem via `error()`.
    ///
    /// Sets:
    /// - `service`: reporting service
    /// - `error`: the reported error
    Error,

    /// A service instance went fatal; its dependents are being stopped.
    ///
    /// Sets:
    /// - `service`: the failing service
    Fatal,

    // === Lifecycle events ===
    /// A start operation began (dependencies are being started).
    ServiceStarting,

    /// The instance started successfully.
    ServiceStarted,

    /// The start operation failed.
    ///
    /// Sets:
    /// - `error`: failure propagated from the instance or a dependency
    ServiceStartFailed,

    /// A stop operation began (dependents are being stopped).
    ServiceStopping,

    /// The stop operation completed.
    ServiceStopped,

    /// The stop operation failed.
    ///
    /// Sets:
    /// - `error`: failure propagated from the instance or a dependent
    ServiceStopFailed,

    // === Shutdown events ===
    /// Shutdown requested (OS signal or cancellation observed by `run`).
    ShutdownRequested,

    /// All services stopped within the configured grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some services did not stop in time.
    GraceExceeded,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `service`: subscriber name
    /// - `reason`: panic message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `service`: subscriber name
    /// - `reason`: "full" or "closed"
    SubscriberOverflow,
}

/// Typed payload of the two well-known notification kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Forwarded from [`ServiceContext::error`](crate::ServiceContext::error).
    Error {
        /// Reporting service.
        service: String,
        /// Reported error.
        error: ServiceError,
    },
    /// Raised by [`ServiceNode::fatal`](crate::ServiceNode::fatal).
    Fatal {
        /// The failing service.
        service: String,
    },
}

/// Runtime event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the service (or subscriber), if applicable.
    pub service: Option<Arc<str>>,
    /// Error payload for `Error` and failure events.
    pub error: Option<ServiceError>,
    /// Human-readable detail (subscriber overflow/panic info).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            service: None,
            error: None,
            reason: None,
        }
    }

    /// Attaches a service name.
    #[inline]
    pub fn with_service(mut self, service: impl Into<Arc<str>>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Attaches an error payload.
    #[inline]
    pub fn with_error(mut self, error: ServiceError) -> Self {
        self.error = Some(error);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_service(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_service(subscriber)
            .with_reason(info)
    }

    /// Returns the typed payload for `Error` and `Fatal` events.
    pub fn notification(&self) -> Option<Notification> {
        let service = self.service.as_deref()?.to_string();
        match self.kind {
            EventKind::Fatal => Some(Notification::Fatal { service }),
            EventKind::Error => Some(Notification::Error {
                service,
                error: self.error.clone()?,
            }),
            _ => None,
        }
    }

    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind, EventKind::Fatal)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::ServiceStarting);
        let b = Event::new(EventKind::ServiceStarted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_error_notification_requires_payload() {
        let bare = Event::new(EventKind::Error).with_service("db");
        assert_eq!(bare.notification(), None);

        let ev = bare.with_error(ServiceError::fail("disk full"));
        assert_eq!(
            ev.notification(),
            Some(Notification::Error {
                service: "db".into(),
                error: ServiceError::fail("disk full"),
            })
        );
    }

    #[test]
    fn test_lifecycle_events_carry_no_notification() {
        let ev = Event::new(EventKind::ServiceStopped).with_service("db");
        assert!(ev.notification().is_none());
        assert!(!ev.is_fatal());
    }
}
