//! # Instance factories.
//!
//! A node builds its instance lazily through a [`Factory`]. [`FactoryFn`] wraps
//! a closure `F: Fn(ServiceContext) -> Fut`, producing a fresh future per
//! construction, the same way the instance is rebuilt after every non-reusable
//! stop.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use depvisor::{FactoryFn, Service, ServiceContext, ServiceError};
//!
//! struct Http { port: u16 }
//!
//! #[async_trait]
//! impl Service for Http {
//!     async fn start(&self) -> Result<(), ServiceError> { Ok(()) }
//!     async fn stop(&self) -> Result<(), ServiceError> { Ok(()) }
//! }
//!
//! let factory = FactoryFn::new(|_ctx: ServiceContext| async move {
//!     Ok::<_, ServiceError>(Http { port: 8080 })
//! });
//! # let _ = factory;
//! ```

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::ServiceError;
use crate::services::{ServiceContext, service::Service, service::ServiceRef};

/// Boxed future returned by [`Factory::build`].
pub type BuildFuture = BoxFuture<'static, Result<ServiceRef, ServiceError>>;

/// Builds a service instance for a node.
///
/// Called at most once per start cycle, only when the node holds no instance.
pub trait Factory: Send + Sync + 'static {
    /// Creates a new instance bound to the given capability.
    fn build(&self, ctx: ServiceContext) -> BuildFuture;
}

/// Shared handle to a factory.
pub type FactoryRef = Arc<dyn Factory>;

/// Function-backed factory.
#[derive(Debug)]
pub struct FactoryFn<F> {
    f: F,
}

impl<F> FactoryFn<F> {
    /// Wraps a closure returning the instance.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F, Fut, S> Factory for FactoryFn<F>
where
    F: Fn(ServiceContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<S, ServiceError>> + Send + 'static,
    S: Service,
{
    fn build(&self, ctx: ServiceContext) -> BuildFuture {
        let fut = (self.f)(ctx);
        Box::pin(async move { fut.await.map(|s| Arc::new(s) as ServiceRef) })
    }
}

impl<T: Factory + ?Sized> Factory for Arc<T> {
    fn build(&self, ctx: ServiceContext) -> BuildFuture {
        (**self).build(ctx)
    }
}
