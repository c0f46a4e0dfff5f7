use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{config::ManagerConfig, manager::ServiceManager, registry::Registry};
use crate::{
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`ServiceManager`] with optional subscribers.
pub struct ManagerBuilder {
    cfg: ManagerConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl ManagerBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: ManagerConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive every runtime event through dedicated workers with
    /// bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds a single subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Builds the manager: event bus, registry and, when subscribers were
    /// given, their workers plus the listener feeding them.
    ///
    /// # Panics
    /// Panics outside a tokio runtime when subscribers are configured.
    pub fn build(self) -> ServiceManager {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let registry = Registry::new(bus.clone(), self.cfg.reusable);

        let listener = if self.subscribers.is_empty() {
            None
        } else {
            let set = SubscriberSet::new(self.subscribers, bus.clone());
            let token = CancellationToken::new();
            spawn_subscriber_listener(&bus, set, token.clone());
            Some(token.drop_guard())
        };

        ServiceManager::new_internal(self.cfg, registry, listener)
    }
}

/// Forwards bus events to the subscriber set until `token` is cancelled.
///
/// On exit the queues close and each worker drains what it already received.
fn spawn_subscriber_listener(bus: &Bus, set: SubscriberSet, token: CancellationToken) {
    use tokio::sync::broadcast::error::RecvError;

    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                res = rx.recv() => match res {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "subscriber listener lagged behind the bus");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        set.shutdown().await;
    });
}
