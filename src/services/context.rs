//! # Capability handed to service instances.
//!
//! [`ServiceContext`] is the narrow interface a factory receives instead of the
//! node itself: it can report (`error`), abort (`fatal`), look up other services
//! and drive the whole manager (`start_all`/`stop_all`).
//!
//! The context holds only a weak reference to the runtime. Instances usually
//! live inside the registry, so a strong reference would keep the manager alive
//! forever. Once the manager and every node handle are gone, calls report
//! [`ServiceError::Detached`] (or do nothing, for the fire-and-forget ones).

use std::sync::{Arc, Weak};

use crate::core::{Outcome, Registry, ServiceNode};
use crate::error::ServiceError;

/// Capability bound to one service.
#[derive(Clone)]
pub struct ServiceContext {
    name: Arc<str>,
    registry: Weak<Registry>,
}

impl ServiceContext {
    pub(crate) fn new(name: Arc<str>, registry: Weak<Registry>) -> Self {
        Self { name, registry }
    }

    /// Name of the service this context belongs to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Forwards a recoverable problem to the manager's event channel.
    pub fn error(&self, err: ServiceError) {
        match self.node() {
            Ok(node) => node.error(err),
            Err(_) => tracing::warn!(service = %self.name, error = %err, "error reported after manager drop"),
        }
    }

    /// Declares this service dead, keeping the node's `reusable` setting.
    ///
    /// See [`ServiceNode::fatal`].
    pub fn fatal(&self) {
        if let Ok(node) = self.node() {
            node.fatal();
        }
    }

    /// Declares this service dead with an explicit instance-retention choice.
    ///
    /// See [`ServiceNode::fatal_with`].
    pub fn fatal_with(&self, reusable: bool) {
        if let Ok(node) = self.node() {
            node.fatal_with(reusable);
        }
    }

    /// Returns (creating if needed) the node named `name`.
    pub fn service(&self, name: &str) -> Result<ServiceNode, ServiceError> {
        Ok(Registry::node(&self.upgrade()?, name))
    }

    /// Starts every registered service. See [`ServiceManager::start_all`](crate::ServiceManager::start_all).
    pub async fn start_all(&self) -> Result<Vec<Outcome>, ServiceError> {
        let registry = self.upgrade()?;
        Ok(Registry::start_all(&registry).await)
    }

    /// Stops every registered service. See [`ServiceManager::stop_all`](crate::ServiceManager::stop_all).
    pub async fn stop_all(&self) -> Result<Vec<Outcome>, ServiceError> {
        let registry = self.upgrade()?;
        Ok(Registry::stop_all(&registry).await)
    }

    fn node(&self) -> Result<ServiceNode, ServiceError> {
        self.service(&self.name)
    }

    fn upgrade(&self) -> Result<Arc<Registry>, ServiceError> {
        self.registry.upgrade().ok_or(ServiceError::Detached)
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("name", &self.name)
            .field("attached", &(self.registry.strong_count() > 0))
            .finish()
    }
}
