//! # Dependency graph with bidirectional edges.
//!
//! Two adjacency maps kept in lockstep:
//! ```text
//! dependencies: dependent  → {dependency, ...}
//! supports:     dependency → {dependent, ...}
//! ```
//! Invariant: `y ∈ dependencies[x] ⇔ x ∈ supports[y]`. Every mutation below
//! touches both maps, and the owning registry applies it under one lock.
//!
//! Cycles are stored like any other edge.

use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Debug, Default)]
pub(crate) struct Graph {
    dependencies: HashMap<String, BTreeSet<String>>,
    supports: HashMap<String, BTreeSet<String>>,
}

impl Graph {
    /// Records `dependent → dependency`.
    pub fn link(&mut self, dependent: &str, dependency: &str) {
        self.dependencies
            .entry(dependent.to_string())
            .or_default()
            .insert(dependency.to_string());
        self.supports
            .entry(dependency.to_string())
            .or_default()
            .insert(dependent.to_string());
    }

    /// Removes `dependent → dependency` if present.
    pub fn unlink(&mut self, dependent: &str, dependency: &str) {
        if let Some(deps) = self.dependencies.get_mut(dependent) {
            deps.remove(dependency);
        }
        if let Some(sups) = self.supports.get_mut(dependency) {
            sups.remove(dependent);
        }
    }

    /// Replaces the full dependency set of `dependent`.
    pub fn replace<I, S>(&mut self, dependent: &str, dependencies: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for old in self.dependencies(dependent) {
            self.unlink(dependent, &old);
        }
        for dep in dependencies {
            self.link(dependent, dep.as_ref());
        }
    }

    /// Sorted dependencies of `name`.
    pub fn dependencies(&self, name: &str) -> Vec<String> {
        Self::collect(self.dependencies.get(name))
    }

    /// Sorted dependents of `name`.
    pub fn supports(&self, name: &str) -> Vec<String> {
        Self::collect(self.supports.get(name))
    }

    /// Returns one dependency cycle (first node repeated at the end), if any.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let mut roots: Vec<&String> = self.dependencies.keys().collect();
        roots.sort_unstable();

        let mut done: HashSet<&str> = HashSet::new();
        for root in roots {
            let mut path: Vec<&str> = Vec::new();
            if let Some(cycle) = self.visit(root, &mut path, &mut done) {
                return Some(cycle);
            }
        }
        None
    }

    fn visit<'a>(
        &'a self,
        node: &'a str,
        path: &mut Vec<&'a str>,
        done: &mut HashSet<&'a str>,
    ) -> Option<Vec<String>> {
        if let Some(pos) = path.iter().position(|n| *n == node) {
            let mut cycle: Vec<String> = path[pos..].iter().map(|n| n.to_string()).collect();
            cycle.push(node.to_string());
            return Some(cycle);
        }
        if done.contains(node) {
            return None;
        }

        path.push(node);
        if let Some(deps) = self.dependencies.get(node) {
            for dep in deps {
                if let Some(cycle) = self.visit(dep, path, done) {
                    return Some(cycle);
                }
            }
        }
        path.pop();
        done.insert(node);
        None
    }

    fn collect(set: Option<&BTreeSet<String>>) -> Vec<String> {
        set.map(|s| s.iter().cloned().collect()).unwrap_or_default()
    }
}
