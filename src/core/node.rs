//! # ServiceNode: per-service lifecycle state machine.
//!
//! Each node tracks two axes, start and stop, each holding an optional memoized
//! [`Operation`]. The [`Phase`] of the stored operation is the node's state:
//!
//! ```text
//!             start()                      stop()
//! Idle ──► InProgress ──► Completed   Idle ──► InProgress ──► Completed
//!                   └───► Failed                        └───► Failed
//! ```
//!
//! ## Start
//! ```text
//! start()
//!   ├─ stop in progress?      → Conflict (no waiting)
//!   ├─ clear stop memo
//!   ├─ start memo present?    → return it
//!   └─ spawn:
//!        ├─► start() every dependency (concurrently), wait for all
//!        ├─► build instance via factory if absent
//!        ├─► instance.start()
//!        └─► mark running
//! ```
//!
//! ## Stop
//! ```text
//! stop()
//!   ├─ start in progress?     → Conflict
//!   ├─ clear start memo
//!   ├─ stop memo present?     → return it
//!   └─ spawn:
//!        ├─► stop() every dependent (concurrently), wait for all
//!        ├─► instance.stop() (only if running)
//!        └─► drop instance unless reusable
//! ```
//!
//! ## Rules
//! - Start and stop are never both in progress on one node.
//! - Failures travel unchanged: a failed dependency fails the dependent's start.
//! - No retries, no rollback of dependencies that did start.
//! - Cycles are not detected here; a cycle waits on itself forever.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::join_all;

use crate::core::operation::{Operation, Outcome, Phase};
use crate::core::registry::{Registry, lock};
use crate::error::{Action, ServiceError};
use crate::events::{Event, EventKind};
use crate::services::{Factory, FactoryFn, FactoryRef, Service, ServiceContext, ServiceRef};

/// Mutable per-node state.
struct NodeState {
    factory: Option<FactoryRef>,
    instance: Option<ServiceRef>,
    reusable: bool,
    /// `instance.start()` succeeded and no stop or fatal has happened since.
    running: bool,
    starting: Option<Operation>,
    stopping: Option<Operation>,
    /// Bumped whenever the start memo is replaced or cleared by `fatal`.
    start_epoch: u64,
}

/// Registry-owned storage of one node.
pub(crate) struct NodeCell {
    state: Mutex<NodeState>,
}

impl NodeCell {
    pub(crate) fn new(reusable: bool) -> Self {
        Self {
            state: Mutex::new(NodeState {
                factory: None,
                instance: None,
                reusable,
                running: false,
                starting: None,
                stopping: None,
                start_epoch: 0,
            }),
        }
    }
}

/// Handle to one named service.
///
/// Cheap to clone; every handle for the same name shares the same state.
/// Obtain one with [`ServiceManager::service`](crate::ServiceManager::service).
#[derive(Clone)]
pub struct ServiceNode {
    name: Arc<str>,
    cell: Arc<NodeCell>,
    registry: Arc<Registry>,
}

impl ServiceNode {
    pub(crate) fn new(name: Arc<str>, cell: Arc<NodeCell>, registry: Arc<Registry>) -> Self {
        Self {
            name,
            cell,
            registry,
        }
    }

    /// Service name.
    pub fn name(&self) -> &str {
        &self.name
    }

    // ---------------------------
    // Configuration
    // ---------------------------

    /// Replaces the factory and discards any constructed instance.
    ///
    /// The next start builds a fresh instance.
    pub fn registry<F: Factory>(&self, factory: F) -> &Self {
        let mut st = self.state();
        if st.running {
            tracing::warn!(service = %self.name, "factory replaced while running; live instance discarded");
        }
        st.factory = Some(Arc::new(factory) as FactoryRef);
        st.instance = None;
        self
    }

    /// Like [`registry`](Self::registry), with explicit constructor arguments.
    ///
    /// `args` is cloned into every construction.
    pub fn registry_with<A, F, Fut, S>(&self, args: A, f: F) -> &Self
    where
        A: Clone + Send + Sync + 'static,
        F: Fn(ServiceContext, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<S, ServiceError>> + Send + 'static,
        S: Service,
    {
        self.registry(FactoryFn::new(move |ctx| f(ctx, args.clone())))
    }

    /// Returns the live instance.
    ///
    /// Fails with [`ServiceError::NotRunning`] unless the node is started.
    pub fn instance(&self) -> Result<ServiceRef, ServiceError> {
        let st = self.state();
        match (Phase::of(st.starting.as_ref()), &st.instance) {
            (Phase::Completed, Some(instance)) if st.running => Ok(Arc::clone(instance)),
            _ => Err(ServiceError::NotRunning {
                service: self.name.to_string(),
            }),
        }
    }

    /// Sorted names this service depends on.
    pub fn dependencies(&self) -> Vec<String> {
        self.registry.dependencies_of(&self.name)
    }

    /// Sorted names of the services depending on this one.
    pub fn supports(&self) -> Vec<String> {
        self.registry.supports_of(&self.name)
    }

    /// Replaces the whole dependency set.
    pub fn set_dependencies<I, S>(&self, names: I) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.registry
            .set_dependencies(&self.name, &names.into_iter().map(Into::into).collect::<Vec<_>>());
        self
    }

    /// Adds dependencies (and the matching dependent edges).
    pub fn add_dependencies<I, S>(&self, names: I) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.registry
            .add_dependencies(&self.name, &names.into_iter().map(Into::into).collect::<Vec<_>>());
        self
    }

    /// Removes dependencies (and the matching dependent edges).
    pub fn delete_dependencies<I, S>(&self, names: I) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.registry
            .delete_dependencies(&self.name, &names.into_iter().map(Into::into).collect::<Vec<_>>());
        self
    }

    /// Whether the instance survives a stop.
    pub fn reusable(&self) -> bool {
        self.state().reusable
    }

    /// Sets whether the instance survives a stop.
    pub fn set_reusable(&self, reusable: bool) -> &Self {
        self.state().reusable = reusable;
        self
    }

    // ---------------------------
    // Queries
    // ---------------------------

    pub fn start_phase(&self) -> Phase {
        Phase::of(self.state().starting.as_ref())
    }

    pub fn stop_phase(&self) -> Phase {
        Phase::of(self.state().stopping.as_ref())
    }

    pub fn is_starting(&self) -> bool {
        self.start_phase() == Phase::InProgress
    }

    pub fn is_started(&self) -> bool {
        self.start_phase() == Phase::Completed
    }

    pub fn is_stopping(&self) -> bool {
        self.stop_phase() == Phase::InProgress
    }

    pub fn is_stopped(&self) -> bool {
        self.stop_phase() == Phase::Completed
    }

    // ---------------------------
    // Lifecycle
    // ---------------------------

    /// Starts the service after all of its dependencies.
    ///
    /// Repeated or concurrent calls share one operation. Fails immediately with
    /// [`ServiceError::Conflict`] while a stop is in progress.
    ///
    /// # Panics
    /// Panics when a new operation has to be spawned outside a tokio runtime.
    pub fn start(&self) -> Operation {
        let mut st = self.state();
        if Phase::of(st.stopping.as_ref()) == Phase::InProgress {
            tracing::debug!(service = %self.name, "start rejected: stop in progress");
            return Operation::ready(Err(self.conflict(Action::Start)));
        }
        st.stopping = None;
        if let Some(op) = &st.starting {
            return op.clone();
        }

        st.start_epoch += 1;
        let epoch = st.start_epoch;
        let node = self.clone();
        let op = Operation::spawn(async move { node.run_start(epoch).await });
        st.starting = Some(op.clone());
        op
    }

    /// Stops the service after all of its dependents.
    ///
    /// Repeated or concurrent calls share one operation. Fails immediately with
    /// [`ServiceError::Conflict`] while a start is in progress.
    ///
    /// # Panics
    /// Panics when a new operation has to be spawned outside a tokio runtime.
    pub fn stop(&self) -> Operation {
        let mut st = self.state();
        if Phase::of(st.starting.as_ref()) == Phase::InProgress {
            tracing::debug!(service = %self.name, "stop rejected: start in progress");
            return Operation::ready(Err(self.conflict(Action::Stop)));
        }
        st.starting = None;
        if let Some(op) = &st.stopping {
            return op.clone();
        }

        let node = self.clone();
        let op = Operation::spawn(async move { node.run_stop().await });
        st.stopping = Some(op.clone());
        op
    }

    /// Declares the service dead, keeping the node's `reusable` setting.
    ///
    /// Equivalent to `fatal_with(self.reusable())`.
    pub fn fatal(&self) {
        let reusable = self.reusable();
        self.fatal_with(reusable);
    }

    /// Declares the service dead.
    ///
    /// - clears the start memo and marks the stop axis as completed;
    /// - drops the instance unless `reusable`;
    /// - fires `stop()` on every dependent without waiting;
    /// - publishes [`EventKind::Fatal`].
    ///
    /// Dependencies are left running. Meant to be called by the instance itself
    /// (through [`ServiceContext::fatal`]); the runtime never calls it.
    ///
    /// A start still in flight settles without marking the node started.
    ///
    /// # Panics
    /// Panics outside a tokio runtime when the node has dependents, since their
    /// stops are spawned.
    pub fn fatal_with(&self, reusable: bool) {
        {
            let mut st = self.state();
            st.starting = None;
            st.start_epoch += 1;
            st.stopping = Some(Operation::ready(Ok(())));
            st.running = false;
            if !reusable {
                st.instance = None;
            }
        }

        let dependents = self.supports();
        let ops: Vec<(String, Operation)> = dependents
            .into_iter()
            .map(|name| {
                let op = self.registry.node(&name).stop();
                (name, op)
            })
            .collect();

        tracing::error!(service = %self.name, dependents = ops.len(), "service went fatal");
        self.publish(Event::new(EventKind::Fatal));

        if !ops.is_empty() {
            let origin = Arc::clone(&self.name);
            tokio::spawn(async move {
                for (name, op) in ops {
                    if let Err(err) = op.wait().await {
                        tracing::warn!(service = %name, fatal = %origin, error = %err, "dependent stop failed after fatal");
                    }
                }
            });
        }
    }

    /// Forwards a recoverable problem to the manager's event channel.
    ///
    /// No state changes.
    pub fn error(&self, err: ServiceError) {
        tracing::warn!(service = %self.name, error = %err, "service reported error");
        self.publish(Event::new(EventKind::Error).with_error(err));
    }

    // ---------------------------
    // Operation bodies
    // ---------------------------

    async fn run_start(self, epoch: u64) -> Outcome {
        tracing::debug!(service = %self.name, "starting");
        self.publish(Event::new(EventKind::ServiceStarting));

        match self.start_in_order(epoch).await {
            Ok(true) => {
                tracing::info!(service = %self.name, "started");
                self.publish(Event::new(EventKind::ServiceStarted));
                Ok(())
            }
            Ok(false) => {
                tracing::debug!(service = %self.name, "start finished after fatal; not marked started");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(service = %self.name, error = %err, "start failed");
                self.publish(Event::new(EventKind::ServiceStartFailed).with_error(err.clone()));
                Err(err)
            }
        }
    }

    /// Returns whether this start is still current (no `fatal` since it began).
    async fn start_in_order(&self, epoch: u64) -> Result<bool, ServiceError> {
        let pending: Vec<_> = self
            .dependencies()
            .iter()
            .map(|dep| self.registry.node(dep).start().wait())
            .collect();
        for res in join_all(pending).await {
            res?;
        }

        let instance = self.instance_or_build().await?;
        instance.start().await?;

        let mut st = self.state();
        let current = st.start_epoch == epoch;
        if current {
            st.running = true;
        }
        Ok(current)
    }

    async fn run_stop(self) -> Outcome {
        tracing::debug!(service = %self.name, "stopping");
        self.publish(Event::new(EventKind::ServiceStopping));

        let outcome = self.stop_in_order().await;
        match &outcome {
            Ok(()) => {
                tracing::info!(service = %self.name, "stopped");
                self.publish(Event::new(EventKind::ServiceStopped));
            }
            Err(err) => {
                tracing::warn!(service = %self.name, error = %err, "stop failed");
                self.publish(Event::new(EventKind::ServiceStopFailed).with_error(err.clone()));
            }
        }
        outcome
    }

    async fn stop_in_order(&self) -> Outcome {
        let pending: Vec<_> = self
            .supports()
            .iter()
            .map(|dep| self.registry.node(dep).stop().wait())
            .collect();
        for res in join_all(pending).await {
            res?;
        }

        let live = {
            let st = self.state();
            if st.running { st.instance.clone() } else { None }
        };
        if let Some(instance) = live {
            instance.stop().await?;
        }

        let mut st = self.state();
        st.running = false;
        if !st.reusable {
            st.instance = None;
        }
        Ok(())
    }

    /// Returns the kept instance or builds a new one through the factory.
    async fn instance_or_build(&self) -> Result<ServiceRef, ServiceError> {
        let factory = {
            let st = self.state();
            if let Some(instance) = &st.instance {
                return Ok(Arc::clone(instance));
            }
            st.factory.clone().ok_or_else(|| ServiceError::MissingFactory {
                service: self.name.to_string(),
            })?
        };

        tracing::debug!(service = %self.name, "constructing instance");
        let ctx = ServiceContext::new(Arc::clone(&self.name), Arc::downgrade(&self.registry));
        let instance = factory.build(ctx).await?;
        self.state().instance = Some(Arc::clone(&instance));
        Ok(instance)
    }

    // ---------------------------
    // Helpers
    // ---------------------------

    fn state(&self) -> MutexGuard<'_, NodeState> {
        lock(&self.cell.state)
    }

    fn conflict(&self, action: Action) -> ServiceError {
        ServiceError::Conflict {
            service: self.name.to_string(),
            action,
        }
    }

    fn publish(&self, ev: Event) {
        self.registry.bus().publish(ev.with_service(Arc::clone(&self.name)));
    }
}

impl fmt::Debug for ServiceNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceNode")
            .field("name", &self.name)
            .field("start", &self.start_phase())
            .field("stop", &self.stop_phase())
            .finish()
    }
}
