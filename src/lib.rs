//! # depvisor
//!
//! **depvisor** starts and stops a set of named, interdependent async services in
//! dependency order.
//!
//! A service only starts after everything it depends on is running, and only
//! stops after everything depending on it has stopped. Start and stop attempts
//! are memoized per service, so any number of callers (including
//! [`ServiceManager::start_all`], which fires at every node at once) share a
//! single run of the work.
//!
//! ## Architecture
//! ```text
//!                      ServiceManager
//!                   ┌──────────────────────────────────────────┐
//!  service(name) ──►│ Registry                                 │
//!  start_all()   ──►│  - cells:  name → NodeCell (state)       │
//!  stop_all()    ──►│  - graph:  dependencies / supports maps  │
//!  subscribe()   ──►│  - bus:    broadcast<Event>              │
//!                   └───────┬──────────────────────────┬───────┘
//!                           ▼                          ▼
//!                   ServiceNode handles        SubscriberSet workers
//!                   start / stop / fatal        (LogWriter, custom)
//!                           │
//!                           ▼
//!                   Factory ──► Arc<dyn Service> ◄── ServiceContext
//!                                                 (error/fatal/service/…)
//! ```
//!
//! ### Lifecycle
//! ```text
//! A depends on B
//!
//! A.start() ─► B.start() ─► B.instance.start() ─► B Completed
//!                                                  └─► A.instance.start() ─► A Completed
//!
//! B.stop()  ─► A.stop()  ─► A.instance.stop()  ─► A Completed
//!                                                  └─► B.instance.stop()  ─► B Completed
//!
//! B calls ctx.fatal() ─► A.stop() fired, Fatal{B} published, B's dependencies untouched
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                          |
//! |-------------------|----------------------------------------------------------|---------------------------------------------|
//! | **Services**      | Components and how they are built.                       | [`Service`], [`Factory`], [`FactoryFn`]     |
//! | **Orchestration** | Per-service state machine and registry.                  | [`ServiceNode`], [`ServiceManager`]         |
//! | **Operations**    | Memoized start/stop attempts with queryable phase.       | [`Operation`], [`Phase`]                    |
//! | **Events**        | `Error`/`Fatal` notifications and lifecycle events.      | [`Event`], [`EventKind`], [`Notification`]  |
//! | **Subscribers**   | Pluggable observers with isolated workers.               | [`Subscribe`], [`SubscriberSet`]            |
//! | **Errors**        | Typed operation and runtime errors.                      | [`ServiceError`], [`RuntimeError`]          |
//! | **Configuration** | Grace period, bus capacity, default reusability.         | [`ManagerConfig`]                           |
//!
//! ## Optional features
//! - `logging`: exports [`LogWriter`], a subscriber forwarding events to `tracing`.
//!
//! ## Cycles
//! Dependency cycles are accepted. Starting any member of a cycle never
//! settles, because each member waits for the other's memoized start.
//! [`ServiceManager::find_cycle`] reports them without changing that behavior.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use depvisor::{ServiceContext, Service, ServiceError, ServiceManager};
//!
//! struct Database { url: String }
//!
//! #[async_trait]
//! impl Service for Database {
//!     async fn start(&self) -> Result<(), ServiceError> { Ok(()) }
//!     async fn stop(&self) -> Result<(), ServiceError> { Ok(()) }
//! }
//!
//! struct Api { ctx: ServiceContext }
//!
//! #[async_trait]
//! impl Service for Api {
//!     async fn start(&self) -> Result<(), ServiceError> {
//!         // The database has already started here.
//!         assert!(self.ctx.service("db")?.is_started());
//!         Ok(())
//!     }
//!     async fn stop(&self) -> Result<(), ServiceError> { Ok(()) }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), ServiceError> {
//!     let manager = ServiceManager::new();
//!
//!     manager
//!         .service("db")
//!         .registry_with("postgres://localhost".to_string(), |_ctx, url| async move {
//!             Ok::<_, ServiceError>(Database { url })
//!         });
//!     manager
//!         .service("api")
//!         .add_dependencies(["db"])
//!         .registry_with((), |ctx, ()| async move { Ok::<_, ServiceError>(Api { ctx }) });
//!
//!     for outcome in manager.start_all().await {
//!         outcome?;
//!     }
//!     for outcome in manager.stop_all().await {
//!         outcome?;
//!     }
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod services;
mod subscribers;

// ---- Public re-exports ----

pub use crate::core::{
    ManagerBuilder, ManagerConfig, Operation, Outcome, Phase, ServiceManager, ServiceNode,
};
pub use error::{Action, RuntimeError, ServiceError};
pub use events::{Event, EventKind, Notification};
pub use services::{BuildFuture, Factory, FactoryFn, FactoryRef, Service, ServiceContext, ServiceRef};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: built-in subscriber bridging events into `tracing`.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
