//! # Service registry - shared state behind the manager and every node handle.
//!
//! The registry owns:
//! - the node cells (lifecycle state per name), created on first reference;
//! - the dependency [`Graph`];
//! - the event [`Bus`].
//!
//! ## Architecture
//! ```text
//! ServiceManager ─┐
//! ServiceNode   ──┼──► Arc<Registry> ──► Mutex<{ cells: name → NodeCell, graph }>
//! ServiceContext ─┘ (Weak)            └─► Bus
//! ```
//!
//! ## Rules
//! - `node(name)` is get-or-insert: it creates an unconfigured placeholder.
//! - Naming a dependency creates its node too.
//! - Cells and graph edges are changed under one lock, never held across `.await`.
//! - Entries are never removed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::join_all;

use crate::core::graph::Graph;
use crate::core::node::{NodeCell, ServiceNode};
use crate::core::operation::Outcome;
use crate::events::Bus;

/// Locks a mutex, recovering the data if a previous holder panicked.
///
/// Every critical section in this crate is free of user code, so the protected
/// state stays consistent even when a panic poisoned the lock elsewhere.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct Inner {
    cells: HashMap<String, Arc<NodeCell>>,
    graph: Graph,
}

impl Inner {
    fn cell(&mut self, name: &str, reusable: bool) -> Arc<NodeCell> {
        Arc::clone(
            self.cells
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(NodeCell::new(reusable))),
        )
    }
}

/// Name → node map plus dependency graph and event bus.
pub struct Registry {
    inner: Mutex<Inner>,
    bus: Bus,
    reusable: bool,
}

impl Registry {
    /// Creates an empty registry. New nodes start with `reusable` as their flag.
    pub(crate) fn new(bus: Bus, reusable: bool) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner::default()),
            bus,
            reusable,
        })
    }

    pub(crate) fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Returns the node for `name`, creating an empty one on first reference.
    pub(crate) fn node(self: &Arc<Self>, name: &str) -> ServiceNode {
        let cell = lock(&self.inner).cell(name, self.reusable);
        ServiceNode::new(name.into(), cell, Arc::clone(self))
    }

    /// All registered nodes, sorted by name.
    pub(crate) fn nodes(self: &Arc<Self>) -> Vec<ServiceNode> {
        let mut cells: Vec<(String, Arc<NodeCell>)> = lock(&self.inner)
            .cells
            .iter()
            .map(|(name, cell)| (name.clone(), Arc::clone(cell)))
            .collect();
        cells.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        cells
            .into_iter()
            .map(|(name, cell)| ServiceNode::new(name.into(), cell, Arc::clone(self)))
            .collect()
    }

    /// Sorted names of all registered nodes.
    pub(crate) fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = lock(&self.inner).cells.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub(crate) fn dependencies_of(&self, name: &str) -> Vec<String> {
        lock(&self.inner).graph.dependencies(name)
    }

    pub(crate) fn supports_of(&self, name: &str) -> Vec<String> {
        lock(&self.inner).graph.supports(name)
    }

    pub(crate) fn find_cycle(&self) -> Option<Vec<String>> {
        lock(&self.inner).graph.find_cycle()
    }

    /// Adds `dependent → dep` edges, creating the named nodes.
    pub(crate) fn add_dependencies(&self, dependent: &str, deps: &[String]) {
        let mut inner = lock(&self.inner);
        for dep in deps {
            inner.cell(dep, self.reusable);
            inner.graph.link(dependent, dep);
        }
    }

    /// Removes `dependent → dep` edges.
    pub(crate) fn delete_dependencies(&self, dependent: &str, deps: &[String]) {
        let mut inner = lock(&self.inner);
        for dep in deps {
            inner.graph.unlink(dependent, dep);
        }
    }

    /// Replaces every dependency edge of `dependent`.
    pub(crate) fn set_dependencies(&self, dependent: &str, deps: &[String]) {
        let mut inner = lock(&self.inner);
        for dep in deps {
            inner.cell(dep, self.reusable);
        }
        inner.graph.replace(dependent, deps);
    }

    /// Starts every registered node concurrently; outcomes sorted by name.
    pub(crate) async fn start_all(self: &Arc<Self>) -> Vec<Outcome> {
        let ops: Vec<_> = self.nodes().iter().map(|n| n.start().wait()).collect();
        join_all(ops).await
    }

    /// Stops every registered node concurrently; outcomes sorted by name.
    pub(crate) async fn stop_all(self: &Arc<Self>) -> Vec<Outcome> {
        let ops: Vec<_> = self.nodes().iter().map(|n| n.stop().wait()).collect();
        join_all(ops).await
    }
}
