//! # Manager configuration.
//!
//! Provides [`ManagerConfig`], the settings consumed by
//! [`ServiceManager::builder`](crate::ServiceManager::builder).
//!
//! ## Sentinel values
//! - `grace = 0s` → `run` does not wait for stops at all (everything still
//!   stopping is reported as stuck)
//! - `bus_capacity = 0` → clamped to 1

use std::time::Duration;

/// Settings for a [`ServiceManager`](crate::ServiceManager).
///
/// ## Field semantics
/// - `grace`: how long [`run`](crate::ServiceManager::run) waits for `stop_all` after shutdown
/// - `bus_capacity`: event bus ring buffer size (min 1)
/// - `reusable`: initial `reusable` flag of every new node
#[derive(Clone, Debug)]
pub struct ManagerConfig {
    /// Maximum time `run` waits for every service to stop.
    ///
    /// If exceeded, `run` returns `RuntimeError::GraceExceeded` listing the
    /// services still stopping. Their operations keep running in the background.
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Receivers lagging more than `bus_capacity` events observe `Lagged` and
    /// skip the oldest ones.
    pub bus_capacity: usize,

    /// Whether new nodes keep their instance across a stop.
    ///
    /// Can be overridden per node with `ServiceNode::set_reusable`.
    pub reusable: bool,
}

impl ManagerConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for ManagerConfig {
    /// Default configuration:
    ///
    /// - `grace = 60s`
    /// - `bus_capacity = 1024`
    /// - `reusable = false` (rebuild instances on every start)
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(60),
            bus_capacity: 1024,
            reusable: false,
        }
    }
}
