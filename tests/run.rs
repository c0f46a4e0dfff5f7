//! `ServiceManager::run`: start everything, wait for shutdown, stop within grace.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Behavior, Journal, eventually, install, next_of};
use depvisor::{EventKind, ManagerConfig, RuntimeError, ServiceManager};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

fn manager_with_grace(grace: Duration) -> ServiceManager {
    ServiceManager::builder(ManagerConfig {
        grace,
        ..ManagerConfig::default()
    })
    .build()
}

#[tokio::test]
async fn run_stops_everything_on_cancel() {
    let manager = Arc::new(ServiceManager::new());
    let journal = Journal::default();
    install(manager.service("api").add_dependencies(["db"]), &journal, Behavior::default());
    install(&manager.service("db"), &journal, Behavior::default());
    let mut rx = manager.subscribe();

    let token = CancellationToken::new();
    let handle = tokio::spawn({
        let manager = Arc::clone(&manager);
        let token = token.clone();
        async move { manager.run(token).await }
    });

    assert!(eventually(|| manager.service("api").is_started()).await);
    token.cancel();

    assert!(handle.await.unwrap().is_ok());
    next_of(&mut rx, EventKind::ShutdownRequested).await;
    next_of(&mut rx, EventKind::AllStoppedWithin).await;
    assert_eq!(
        journal.entries(),
        vec!["start:db", "start:api", "stop:api", "stop:db"]
    );
}

#[tokio::test]
async fn run_continues_past_start_failures() {
    let manager = ServiceManager::new();
    let journal = Journal::default();
    install(
        &manager.service("db"),
        &journal,
        Behavior {
            fail_start: Some("refused"),
            ..Behavior::default()
        },
    );
    install(&manager.service("cache"), &journal, Behavior::default());

    let token = CancellationToken::new();
    token.cancel();
    assert!(manager.run(token).await.is_ok());
    assert!(manager.service("cache").is_stopped());
    assert!(journal.position("stop:cache").is_some());
}

#[tokio::test]
async fn run_reports_services_stuck_past_grace() {
    let manager = manager_with_grace(Duration::from_millis(100));
    let gate = Arc::new(Notify::new());
    install(
        &manager.service("db"),
        &Journal::default(),
        Behavior {
            stop_gate: Some(Arc::clone(&gate)),
            ..Behavior::default()
        },
    );
    install(&manager.service("cache"), &Journal::default(), Behavior::default());
    let mut rx = manager.subscribe();

    let token = CancellationToken::new();
    token.cancel();
    let err = manager.run(token).await.unwrap_err();

    assert_eq!(err.as_label(), "runtime_grace_exceeded");
    match err {
        RuntimeError::GraceExceeded { grace, stuck } => {
            assert_eq!(grace, Duration::from_millis(100));
            assert_eq!(stuck, vec!["db".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    next_of(&mut rx, EventKind::GraceExceeded).await;

    gate.notify_one();
    assert_eq!(manager.service("db").stop().await, Ok(()));
}

#[tokio::test]
async fn run_reports_failed_stops() {
    let manager = ServiceManager::new();
    install(
        &manager.service("db"),
        &Journal::default(),
        Behavior {
            fail_stop: Some("socket busy"),
            ..Behavior::default()
        },
    );

    let token = CancellationToken::new();
    token.cancel();
    match manager.run(token).await {
        Err(RuntimeError::StopFailed { failed }) => assert_eq!(failed, vec!["db".to_string()]),
        other => panic!("unexpected result: {other:?}"),
    }
}
