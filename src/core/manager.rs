//! # ServiceManager: registry surface, fan-out and graceful run.
//!
//! The [`ServiceManager`] maps names to [`ServiceNode`]s (created on first
//! reference), fans `start_all`/`stop_all` out to every node, and owns the
//! event channel that carries `Error` and `Fatal` notifications.
//!
//! ## Key responsibilities
//! - `service(name)`: get-or-insert a node
//! - `start_all()` / `stop_all()`: issue start/stop on every node concurrently;
//!   each node orders itself against its own edges
//! - `subscribe()`: raw event receiver
//! - `run(token)`: start everything, wait for a signal or the token, then stop
//!   everything within [`ManagerConfig::grace`]
//!
//! ## Shutdown path of `run`
//! ```text
//! start_all()
//!     └─► wait: OS signal | token.cancelled()
//!           └─► Bus.publish(ShutdownRequested)
//!           └─► timeout(grace, stop_all()):
//!                  ├─ all settled, all Ok → publish(AllStoppedWithin) → Ok
//!                  ├─ all settled, some Err → publish(AllStoppedWithin) → StopFailed
//!                  └─ timeout             → publish(GraceExceeded)     → GraceExceeded{stuck}
//! ```
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use depvisor::{FactoryFn, Service, ServiceContext, ServiceError, ServiceManager};
//!
//! struct Noop;
//!
//! #[async_trait]
//! impl Service for Noop {
//!     async fn start(&self) -> Result<(), ServiceError> { Ok(()) }
//!     async fn stop(&self) -> Result<(), ServiceError> { Ok(()) }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), ServiceError> {
//!     let manager = ServiceManager::new();
//!     manager
//!         .service("api")
//!         .add_dependencies(["db"])
//!         .registry(FactoryFn::new(|_ctx: ServiceContext| async { Ok::<_, ServiceError>(Noop) }));
//!     manager
//!         .service("db")
//!         .registry(FactoryFn::new(|_ctx: ServiceContext| async { Ok::<_, ServiceError>(Noop) }));
//!
//!     manager.service("api").start().await?;
//!     assert!(manager.service("db").is_started());
//!
//!     manager.stop_all().await.into_iter().collect::<Result<Vec<_>, _>>()?;
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::broadcast;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::core::{
    builder::ManagerBuilder, config::ManagerConfig, node::ServiceNode, operation::Outcome,
    registry::Registry, shutdown,
};
use crate::error::RuntimeError;
use crate::events::{Event, EventKind};

/// Registry of named services.
pub struct ServiceManager {
    cfg: ManagerConfig,
    registry: Arc<Registry>,
    /// Stops the subscriber listener when the manager is dropped.
    _listener: Option<DropGuard>,
}

impl ServiceManager {
    /// Creates a manager with default configuration and no subscribers.
    ///
    /// Does not need a runtime; operations do.
    pub fn new() -> Self {
        Self::builder(ManagerConfig::default()).build()
    }

    /// Returns a builder for custom configuration and subscribers.
    pub fn builder(cfg: ManagerConfig) -> ManagerBuilder {
        ManagerBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: ManagerConfig,
        registry: Arc<Registry>,
        listener: Option<DropGuard>,
    ) -> Self {
        Self {
            cfg,
            registry,
            _listener: listener,
        }
    }

    /// Returns the node for `name`.
    ///
    /// Creates an empty, unconfigured node on first reference, so a service can
    /// be named as a dependency before it is configured.
    pub fn service(&self, name: &str) -> ServiceNode {
        self.registry.node(name)
    }

    /// Sorted names of every registered service.
    pub fn services(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Calls `start()` on every registered service concurrently and waits for
    /// all outcomes (sorted by service name).
    ///
    /// Each node waits for its own dependencies, so the graph comes up in order
    /// even though the calls are issued together.
    pub async fn start_all(&self) -> Vec<Outcome> {
        Registry::start_all(&self.registry).await
    }

    /// Calls `stop()` on every registered service concurrently and waits for
    /// all outcomes (sorted by service name).
    pub async fn stop_all(&self) -> Vec<Outcome> {
        Registry::stop_all(&self.registry).await
    }

    /// Subscribes to every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.registry.bus().subscribe()
    }

    /// Returns one dependency cycle, if the current graph has any.
    ///
    /// Diagnostic only: cycles are accepted and simply never finish starting.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        self.registry.find_cycle()
    }

    /// Configuration this manager was built with.
    pub fn config(&self) -> &ManagerConfig {
        &self.cfg
    }

    /// Starts every service, waits for a termination signal or `token`, then
    /// stops every service within the grace period.
    ///
    /// Start failures are reported through events and logs; they do not abort
    /// the run.
    pub async fn run(&self, token: CancellationToken) -> Result<(), RuntimeError> {
        let nodes = self.registry.nodes();
        let outcomes = join_all(nodes.iter().map(|node| node.start().wait())).await;
        for (node, outcome) in nodes.iter().zip(outcomes) {
            if let Err(err) = outcome {
                tracing::warn!(service = %node.name(), error = %err, "service did not start");
            }
        }

        tokio::select! {
            res = shutdown::wait_for_shutdown_signal() => {
                if let Err(err) = res {
                    tracing::error!(error = %err, "signal registration failed; shutting down");
                }
            }
            _ = token.cancelled() => {}
        }

        tracing::info!("shutdown requested");
        self.registry.bus().publish(Event::new(EventKind::ShutdownRequested));
        self.stop_all_with_grace().await
    }

    async fn stop_all_with_grace(&self) -> Result<(), RuntimeError> {
        let grace = self.cfg.grace;
        let nodes = self.registry.nodes();
        let stopping = join_all(nodes.iter().map(|node| node.stop().wait()));

        match tokio::time::timeout(grace, stopping).await {
            Ok(outcomes) => {
                self.registry.bus().publish(Event::new(EventKind::AllStoppedWithin));
                let failed: Vec<String> = nodes
                    .iter()
                    .zip(outcomes)
                    .filter(|(_, outcome)| outcome.is_err())
                    .map(|(node, _)| node.name().to_string())
                    .collect();
                if failed.is_empty() {
                    Ok(())
                } else {
                    tracing::warn!(?failed, "some services failed to stop");
                    Err(RuntimeError::StopFailed { failed })
                }
            }
            Err(_) => {
                self.registry.bus().publish(Event::new(EventKind::GraceExceeded));
                let stuck: Vec<String> = nodes
                    .iter()
                    .filter(|node| node.is_stopping())
                    .map(|node| node.name().to_string())
                    .collect();
                tracing::error!(?grace, ?stuck, "services did not stop within grace");
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }
}

impl Default for ServiceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ServiceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceManager")
            .field("services", &self.services())
            .field("cfg", &self.cfg)
            .finish()
    }
}
