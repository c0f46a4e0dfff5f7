//! # Fatal Cascade Example
//!
//! `queue` dies shortly after starting and declares itself fatal. Everything
//! depending on it (`worker`, then `scheduler`) is stopped; `db`, which `queue`
//! depends on, keeps running.
//!
//! ```text
//! scheduler ──► worker ──► queue ──► db
//!                            ✗ fatal
//! ```
//!
//! A custom subscriber prints the `Error`/`Fatal` notifications.
//!
//! ## Run
//! ```bash
//! cargo run --example fatal_cascade
//! ```

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use depvisor::{
    Event, ManagerConfig, Notification, Service, ServiceContext, ServiceError, ServiceManager,
    Subscribe,
};

struct Printer;

#[async_trait]
impl Subscribe for Printer {
    async fn on_event(&self, ev: &Event) {
        match ev.notification() {
            Some(Notification::Error { service, error }) => {
                println!("[event] {service} reported: {error}");
            }
            Some(Notification::Fatal { service }) => println!("[event] {service} is fatal"),
            None => {}
        }
    }

    fn name(&self) -> &'static str {
        "printer"
    }
}

/// Plain component that only logs.
struct Plain(ServiceContext);

#[async_trait]
impl Service for Plain {
    async fn start(&self) -> Result<(), ServiceError> {
        println!("[{}] up", self.0.name());
        Ok(())
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        println!("[{}] down", self.0.name());
        Ok(())
    }
}

/// Component that loses its connection after a while.
struct Flaky(ServiceContext);

#[async_trait]
impl Service for Flaky {
    async fn start(&self) -> Result<(), ServiceError> {
        println!("[{}] up", self.0.name());
        let ctx = self.0.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            ctx.error(ServiceError::fail("broker connection reset"));
            tokio::time::sleep(Duration::from_millis(200)).await;
            ctx.fatal();
        });
        Ok(())
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        println!("[{}] down", self.0.name());
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), ServiceError> {
    let manager = ServiceManager::builder(ManagerConfig::default())
        .with_subscriber(Arc::new(Printer))
        .build();

    manager
        .service("db")
        .registry_with((), |ctx, ()| async move { Ok::<_, ServiceError>(Plain(ctx)) });
    manager
        .service("queue")
        .add_dependencies(["db"])
        .registry_with((), |ctx, ()| async move { Ok::<_, ServiceError>(Flaky(ctx)) });
    manager
        .service("worker")
        .add_dependencies(["queue"])
        .registry_with((), |ctx, ()| async move { Ok::<_, ServiceError>(Plain(ctx)) });
    manager
        .service("scheduler")
        .add_dependencies(["worker"])
        .registry_with((), |ctx, ()| async move { Ok::<_, ServiceError>(Plain(ctx)) });

    for outcome in manager.start_all().await {
        outcome?;
    }

    tokio::time::sleep(Duration::from_secs(1)).await;

    println!();
    for name in manager.services() {
        let node = manager.service(&name);
        println!("{name:>9}: started={} stopped={}", node.is_started(), node.is_stopped());
    }

    for outcome in manager.stop_all().await {
        outcome?;
    }
    Ok(())
}
