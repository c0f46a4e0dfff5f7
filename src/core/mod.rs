//! Runtime core: node state machine, registry and manager.
//!
//! The public API from this module is [`ServiceManager`] (with its builder and
//! config), [`ServiceNode`] and the [`Operation`] handle.
//!
//! Internal modules:
//! - [`graph`]: bidirectional dependency edges;
//! - [`registry`]: shared name → node map, graph and bus;
//! - [`node`]: per-service start/stop/fatal algorithm;
//! - [`operation`]: memoized, eagerly spawned start/stop attempts;
//! - [`manager`]: public registry surface, fan-out and `run`;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod builder;
mod config;
mod graph;
mod manager;
mod node;
mod operation;
mod registry;
mod shutdown;

pub use builder::ManagerBuilder;
pub use config::ManagerConfig;
pub use manager::ServiceManager;
pub use node::ServiceNode;
pub use operation::{Operation, Outcome, Phase};

pub(crate) use registry::Registry;
