//! Error/Fatal notifications, fatal cascades and subscriber delivery.

mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::{Behavior, Journal, eventually, install, next_of};
use depvisor::{
    Event, EventKind, ManagerConfig, Notification, ServiceError, ServiceManager, Subscribe,
};
use tokio::sync::Notify;

#[tokio::test]
async fn fatal_stops_dependents_and_leaves_dependencies() {
    let manager = ServiceManager::new();
    let journal = Journal::default();
    install(manager.service("a").add_dependencies(["b"]), &journal, Behavior::default());
    install(manager.service("b").add_dependencies(["c"]), &journal, Behavior::default());
    install(manager.service("c").add_dependencies(["d"]), &journal, Behavior::default());
    install(&manager.service("d"), &journal, Behavior::default());
    assert!(manager.start_all().await.iter().all(Result::is_ok));

    let mut rx = manager.subscribe();
    manager.service("c").fatal();

    let ev = next_of(&mut rx, EventKind::Fatal).await;
    assert!(ev.is_fatal());
    assert_eq!(
        ev.notification(),
        Some(Notification::Fatal {
            service: "c".into()
        })
    );

    let c = manager.service("c");
    assert!(c.is_stopped());
    assert!(!c.is_started());
    assert!(c.instance().is_err());

    let (a, b) = (manager.service("a"), manager.service("b"));
    assert!(eventually(|| a.is_stopped() && b.is_stopped()).await);
    assert!(manager.service("d").is_started());

    assert!(journal.violations().is_empty(), "{:?}", journal.violations());
    let at = |e: &str| journal.position(e);
    assert!(at("stop:a").unwrap() < at("stop:b").unwrap());
    assert_eq!(at("stop:c"), None);
    assert_eq!(at("stop:d"), None);
}

#[tokio::test]
async fn fatal_node_can_start_again() {
    let manager = ServiceManager::new();
    let journal = Journal::default();
    let node = manager.service("db");
    let counter = install(&node, &journal, Behavior::default());

    node.start().await.unwrap();
    node.fatal();
    assert!(node.is_stopped());

    node.start().await.unwrap();
    assert!(node.is_started());
    assert_eq!(common::built(&counter), 2);
    assert_eq!(journal.entries(), vec!["start:db", "start:db"]);
}

#[tokio::test]
async fn reusable_fatal_keeps_instance() {
    let manager = ServiceManager::new();
    let node = manager.service("db");
    let counter = install(&node, &Journal::default(), Behavior::default());

    node.start().await.unwrap();
    node.fatal_with(true);
    node.start().await.unwrap();
    assert_eq!(common::built(&counter), 1);
}

#[tokio::test]
async fn non_reusable_fatal_discards_reusable_instance() {
    let manager = ServiceManager::new();
    let node = manager.service("db");
    node.set_reusable(true);
    let counter = install(&node, &Journal::default(), Behavior::default());

    node.start().await.unwrap();
    let first = node.instance().unwrap();
    node.fatal_with(false);
    assert!(node.reusable());

    node.start().await.unwrap();
    let second = node.instance().unwrap();
    assert_eq!(common::built(&counter), 2);
    assert!(!Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn fatal_during_start_suppresses_started_event() {
    let manager = ServiceManager::new();
    let gate = Arc::new(Notify::new());
    let node = manager.service("db");
    install(
        &node,
        &Journal::default(),
        Behavior {
            start_gate: Some(Arc::clone(&gate)),
            ..Behavior::default()
        },
    );
    let mut rx = manager.subscribe();

    let starting = node.start();
    assert!(eventually(|| node.is_starting()).await);
    node.fatal();
    gate.notify_one();
    assert_eq!(starting.await, Ok(()));

    let mut kinds = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        kinds.push(ev.kind);
    }
    assert!(kinds.contains(&EventKind::Fatal), "{kinds:?}");
    assert!(!kinds.contains(&EventKind::ServiceStarted), "{kinds:?}");
    assert!(!node.is_started());
    assert!(node.instance().is_err());
}

#[test]
#[should_panic]
fn fatal_with_dependents_needs_a_runtime() {
    let manager = ServiceManager::new();
    manager.service("api").add_dependencies(["db"]);
    manager.service("db").fatal();
}

#[tokio::test]
async fn context_error_is_forwarded() {
    let manager = ServiceManager::new();
    let mut rx = manager.subscribe();
    install(
        &manager.service("db"),
        &Journal::default(),
        Behavior {
            report_on_start: Some("slow disk"),
            ..Behavior::default()
        },
    );

    manager.service("db").start().await.unwrap();

    let ev = next_of(&mut rx, EventKind::Error).await;
    assert_eq!(
        ev.notification(),
        Some(Notification::Error {
            service: "db".into(),
            error: ServiceError::fail("slow disk"),
        })
    );
    assert!(manager.service("db").is_started());
}

#[tokio::test]
async fn lifecycle_events_are_published() {
    let manager = ServiceManager::new();
    let mut rx = manager.subscribe();
    install(
        &manager.service("db"),
        &Journal::default(),
        Behavior {
            fail_stop: Some("stuck socket"),
            ..Behavior::default()
        },
    );

    manager.service("db").start().await.unwrap();
    assert_eq!(next_of(&mut rx, EventKind::ServiceStarting).await.service.as_deref(), Some("db"));
    next_of(&mut rx, EventKind::ServiceStarted).await;

    let err = manager.service("db").stop().await.unwrap_err();
    let ev = next_of(&mut rx, EventKind::ServiceStopFailed).await;
    assert_eq!(ev.error, Some(err));
    assert_eq!(manager.service("db").stop_phase(), depvisor::Phase::Failed);
}

#[derive(Default)]
struct Collect {
    seen: Mutex<Vec<(EventKind, Option<String>)>>,
}

impl Collect {
    fn saw(&self, kind: EventKind, service: &str) -> bool {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .any(|(k, s)| *k == kind && s.as_deref() == Some(service))
    }
}

#[async_trait]
impl Subscribe for Collect {
    async fn on_event(&self, ev: &Event) {
        let service = ev.service.as_deref().map(str::to_string);
        self.seen.lock().unwrap().push((ev.kind, service));
    }

    fn name(&self) -> &'static str {
        "collect"
    }
}

struct Explode;

#[async_trait]
impl Subscribe for Explode {
    async fn on_event(&self, _ev: &Event) {
        panic!("subscriber bug");
    }

    fn name(&self) -> &'static str {
        "explode"
    }
}

#[tokio::test]
async fn subscribers_receive_events_despite_panicking_peer() {
    let collect = Arc::new(Collect::default());
    let manager = ServiceManager::builder(ManagerConfig::default())
        .with_subscriber(Arc::clone(&collect) as Arc<dyn Subscribe>)
        .with_subscriber(Arc::new(Explode))
        .build();
    install(&manager.service("db"), &Journal::default(), Behavior::default());

    manager.service("db").start().await.unwrap();
    manager.service("db").fatal();

    assert!(eventually(|| collect.saw(EventKind::ServiceStarted, "db")).await);
    assert!(eventually(|| collect.saw(EventKind::Fatal, "db")).await);
    assert!(eventually(|| collect.saw(EventKind::SubscriberPanicked, "explode")).await);
}

#[tokio::test]
async fn context_outlives_manager_as_detached() {
    let manager = ServiceManager::new();
    let (tx, rx) = tokio::sync::oneshot::channel();
    let slot = Arc::new(Mutex::new(Some(tx)));
    manager.service("db").registry_with(slot, |ctx, slot| async move {
        if let Some(tx) = slot.lock().unwrap().take() {
            let _ = tx.send(ctx);
        }
        Ok::<_, ServiceError>(Idle)
    });

    manager.service("db").start().await.unwrap();
    let ctx = rx.await.unwrap();
    assert_eq!(ctx.name(), "db");
    assert!(ctx.service("db").unwrap().is_started());

    drop(manager);
    assert_eq!(ctx.service("db").err(), Some(ServiceError::Detached));
    assert_eq!(ctx.stop_all().await.err(), Some(ServiceError::Detached));
    // Fire-and-forget calls are ignored once detached.
    ctx.fatal();
}

struct Idle;

#[async_trait]
impl depvisor::Service for Idle {
    async fn start(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        Ok(())
    }
}
