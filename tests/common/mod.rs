//! Shared fixtures: a probe service that journals its lifecycle calls.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use depvisor::{Event, EventKind, Service, ServiceContext, ServiceError, ServiceNode};
use tokio::sync::{Notify, broadcast};

/// Ordered record of instance calls across all probes.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }

    /// Entries recorded when a probe saw its neighbours in the wrong state.
    pub fn violations(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.starts_with("violation"))
            .collect()
    }
}

/// How a probe reacts to start/stop.
#[derive(Clone, Default)]
pub struct Behavior {
    pub fail_start: Option<&'static str>,
    pub fail_stop: Option<&'static str>,
    pub start_gate: Option<Arc<Notify>>,
    pub stop_gate: Option<Arc<Notify>>,
    pub report_on_start: Option<&'static str>,
}

pub struct Probe {
    ctx: ServiceContext,
    journal: Journal,
    behavior: Behavior,
}

#[async_trait]
impl Service for Probe {
    async fn start(&self) -> Result<(), ServiceError> {
        let me = self.ctx.service(self.ctx.name())?;
        for dep in me.dependencies() {
            if !self.ctx.service(&dep)?.is_started() {
                self.journal
                    .push(format!("violation:{} started before {dep}", self.ctx.name()));
            }
        }
        if let Some(gate) = &self.behavior.start_gate {
            gate.notified().await;
        }
        if let Some(msg) = self.behavior.report_on_start {
            self.ctx.error(ServiceError::fail(msg));
        }
        if let Some(msg) = self.behavior.fail_start {
            self.journal.push(format!("start-failed:{}", self.ctx.name()));
            return Err(ServiceError::fail(msg));
        }
        self.journal.push(format!("start:{}", self.ctx.name()));
        Ok(())
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        let me = self.ctx.service(self.ctx.name())?;
        for dependent in me.supports() {
            if !self.ctx.service(&dependent)?.is_stopped() {
                self.journal.push(format!(
                    "violation:{} stopped before {dependent}",
                    self.ctx.name()
                ));
            }
        }
        if let Some(gate) = &self.behavior.stop_gate {
            gate.notified().await;
        }
        if let Some(msg) = self.behavior.fail_stop {
            return Err(ServiceError::fail(msg));
        }
        self.journal.push(format!("stop:{}", self.ctx.name()));
        Ok(())
    }
}

/// Configures `node` with a probe factory; returns the construction counter.
pub fn install(node: &ServiceNode, journal: &Journal, behavior: Behavior) -> Arc<AtomicUsize> {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&built);
    node.registry_with(
        (journal.clone(), behavior),
        move |ctx, (journal, behavior)| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                Ok::<_, ServiceError>(Probe {
                    ctx,
                    journal,
                    behavior,
                })
            }
        },
    );
    built
}

pub fn built(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

/// Polls `check` until it holds or two seconds pass.
pub async fn eventually(check: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}

/// Receives events until one of `kind` arrives.
pub async fn next_of(rx: &mut broadcast::Receiver<Event>, kind: EventKind) -> Event {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match rx.recv().await {
                Ok(ev) if ev.kind == kind => return ev,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("bus closed"),
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("no {kind:?} event within 2s"))
}
