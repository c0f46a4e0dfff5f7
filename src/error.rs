//! Error types used by the depvisor runtime and services.
//!
//! This module defines two error enums:
//!
//! - [`ServiceError`] - outcome of a single start/stop operation, or of an
//!   instance accessor. Cheap to clone because one failed operation is observed
//!   by every caller sharing it.
//! - [`RuntimeError`] - failures of [`ServiceManager::run`](crate::ServiceManager::run)
//!   as a whole.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.

use std::any::Any;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Which lifecycle axis an operation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Start axis.
    Start,
    /// Stop axis.
    Stop,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Start => f.write_str("start"),
            Action::Stop => f.write_str("stop"),
        }
    }
}

/// # Errors produced by service operations.
///
/// Instance failures are carried as [`ServiceError::Fail`] and travel unchanged
/// through every dependent whose start (or dependency whose stop) was waiting on
/// them.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Start requested while a stop is in progress, or the other way around.
    ///
    /// Nothing is queued; retry later.
    #[error("cannot {action} service '{service}': opposite operation in progress")]
    Conflict {
        /// Service the operation was requested on.
        service: String,
        /// The rejected operation.
        action: Action,
    },

    /// Construction was needed but no factory is configured.
    #[error("service '{service}' has no factory configured")]
    MissingFactory {
        /// Service lacking a factory.
        service: String,
    },

    /// The instance was accessed while the service is not started.
    #[error("service '{service}' is not running")]
    NotRunning {
        /// Service whose instance was requested.
        service: String,
    },

    /// The service instance (or one it waited on) failed.
    #[error("service failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The capability outlived its manager.
    #[error("service manager has been dropped")]
    Detached,
}

impl ServiceError {
    /// Shorthand for [`ServiceError::Fail`].
    ///
    /// # Example
    /// ```
    /// use depvisor::ServiceError;
    ///
    /// let err = ServiceError::fail("connection refused");
    /// assert_eq!(err.to_string(), "service failed: connection refused");
    /// ```
    pub fn fail(error: impl fmt::Display) -> Self {
        ServiceError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use depvisor::{Action, ServiceError};
    ///
    /// let err = ServiceError::Conflict { service: "db".into(), action: Action::Stop };
    /// assert_eq!(err.as_label(), "service_conflict");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ServiceError::Conflict { .. } => "service_conflict",
            ServiceError::MissingFactory { .. } => "service_missing_factory",
            ServiceError::NotRunning { .. } => "service_not_running",
            ServiceError::Fail { .. } => "service_failed",
            ServiceError::Detached => "service_detached",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ServiceError::Conflict { service, action } => {
                format!("conflict: {action} of {service} rejected")
            }
            ServiceError::MissingFactory { service } => format!("missing factory: {service}"),
            ServiceError::NotRunning { service } => format!("not running: {service}"),
            ServiceError::Fail { error } => format!("error: {error}"),
            ServiceError::Detached => "manager dropped".to_string(),
        }
    }

    /// True for [`ServiceError::Conflict`]: the only kind where retrying later
    /// can succeed without any change to the services.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ServiceError::Conflict { .. })
    }
}

/// # Errors produced by [`ServiceManager::run`](crate::ServiceManager::run).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some services were still stopping.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Services whose stop was still in progress.
        stuck: Vec<String>,
    },

    /// Every stop settled in time, but some of them failed.
    #[error("services failed to stop: {failed:?}")]
    StopFailed {
        /// Names of the services whose stop failed.
        failed: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::StopFailed { .. } => "runtime_stop_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck services={stuck:?}")
            }
            RuntimeError::StopFailed { failed } => format!("stop failed; services={failed:?}"),
        }
    }
}

/// Extracts a readable message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_stable() {
        assert_eq!(ServiceError::Detached.as_label(), "service_detached");
        assert_eq!(
            ServiceError::NotRunning { service: "a".into() }.as_label(),
            "service_not_running"
        );
        let err = RuntimeError::GraceExceeded {
            grace: Duration::from_secs(1),
            stuck: vec!["a".into()],
        };
        assert_eq!(err.as_label(), "runtime_grace_exceeded");
    }

    #[test]
    fn test_panic_message_reads_str_and_string_payloads() {
        let literal = std::panic::catch_unwind(|| panic!("static message")).unwrap_err();
        assert_eq!(panic_message(literal.as_ref()), "static message");

        let formatted = std::panic::catch_unwind(|| panic!("port {}", 8080)).unwrap_err();
        assert_eq!(panic_message(formatted.as_ref()), "port 8080");

        let opaque = std::panic::catch_unwind(|| std::panic::panic_any(42_u8)).unwrap_err();
        assert_eq!(panic_message(opaque.as_ref()), "unknown panic");
    }

    #[test]
    fn test_conflict_display_names_action() {
        let err = ServiceError::Conflict {
            service: "cache".into(),
            action: Action::Start,
        };
        assert_eq!(
            err.to_string(),
            "cannot start service 'cache': opposite operation in progress"
        );
        assert!(err.is_conflict());
        assert!(!ServiceError::fail("boom").is_conflict());
    }
}
