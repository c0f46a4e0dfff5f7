//! # Service abstraction.
//!
//! A [`Service`] is the opaque, long-lived component a node wraps. The runtime
//! only ever calls [`start`](Service::start) and [`stop`](Service::stop); both
//! are awaited to completion and never cancelled.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ServiceError;

/// # Long-lived component with a start/stop lifecycle.
///
/// Implementations receive a [`ServiceContext`](crate::ServiceContext) from
/// their factory and may keep it to report problems (`error`), abort
/// (`fatal`) or look up other services.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use depvisor::{Service, ServiceError};
///
/// struct Cache;
///
/// #[async_trait]
/// impl Service for Cache {
///     async fn start(&self) -> Result<(), ServiceError> {
///         // warm up...
///         Ok(())
///     }
///
///     async fn stop(&self) -> Result<(), ServiceError> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Brings the service up. Called after every dependency has started.
    async fn start(&self) -> Result<(), ServiceError>;

    /// Tears the service down. Called after every dependent has stopped.
    async fn stop(&self) -> Result<(), ServiceError>;
}

/// Shared handle to a constructed service instance.
pub type ServiceRef = Arc<dyn Service>;
