//! # LogWriter: events to `tracing`
//!
//! A minimal subscriber that forwards every [`Event`] to `tracing` with
//! structured fields. Install any `tracing` subscriber to see the output.
//!
//! ## Example output (with `tracing-subscriber` fmt)
//! ```text
//! INFO depvisor: starting service="db"
//! INFO depvisor: started service="db"
//! WARN depvisor: start failed service="api" error=service failed: port in use
//! ERROR depvisor: fatal service="db"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let service = e.service.as_deref().unwrap_or("-");
        let error = e.error.as_ref().map(ToString::to_string).unwrap_or_default();
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::ServiceStarting => tracing::info!(target: "depvisor", service, "starting"),
            EventKind::ServiceStarted => tracing::info!(target: "depvisor", service, "started"),
            EventKind::ServiceStopping => tracing::info!(target: "depvisor", service, "stopping"),
            EventKind::ServiceStopped => tracing::info!(target: "depvisor", service, "stopped"),
            EventKind::ServiceStartFailed => {
                tracing::warn!(target: "depvisor", service, %error, "start failed")
            }
            EventKind::ServiceStopFailed => {
                tracing::warn!(target: "depvisor", service, %error, "stop failed")
            }
            EventKind::Error => tracing::warn!(target: "depvisor", service, %error, "error"),
            EventKind::Fatal => tracing::error!(target: "depvisor", service, "fatal"),
            EventKind::ShutdownRequested => tracing::info!(target: "depvisor", "shutdown-requested"),
            EventKind::AllStoppedWithin => {
                tracing::info!(target: "depvisor", "all-stopped-within-grace")
            }
            EventKind::GraceExceeded => tracing::error!(target: "depvisor", "grace-exceeded"),
            EventKind::SubscriberOverflow => {
                tracing::warn!(target: "depvisor", subscriber = service, reason, "subscriber-overflow")
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(target: "depvisor", subscriber = service, reason, "subscriber-panicked")
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
