//! # Dependency Chain Example
//!
//! Three services where `api` needs `cache` and `db`, and `cache` needs `db`.
//! The manager brings them up in order, waits, then tears them down in reverse.
//!
//! ```text
//! api ──► cache ──► db
//!  └──────────────► db
//! ```
//!
//! Events go through the built-in [`LogWriter`] into `tracing`.
//!
//! ## Run
//! ```bash
//! RUST_LOG=info cargo run --example dependency_chain --features logging
//! ```

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use depvisor::{
    LogWriter, ManagerConfig, Service, ServiceContext, ServiceError, ServiceManager, Subscribe,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

struct Component {
    ctx: ServiceContext,
    warmup: Duration,
}

#[async_trait]
impl Service for Component {
    async fn start(&self) -> Result<(), ServiceError> {
        let deps = self.ctx.service(self.ctx.name())?.dependencies();
        println!("[{}] starting (ready: {deps:?})", self.ctx.name());
        tokio::time::sleep(self.warmup).await;
        Ok(())
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        println!("[{}] stopping", self.ctx.name());
        Ok(())
    }
}

fn component(manager: &ServiceManager, name: &str, deps: &[&str], warmup_ms: u64) {
    manager
        .service(name)
        .set_dependencies(deps.iter().copied())
        .registry_with(Duration::from_millis(warmup_ms), |ctx, warmup| async move {
            Ok::<_, ServiceError>(Component { ctx, warmup })
        });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let manager = ServiceManager::builder(ManagerConfig {
        grace: Duration::from_secs(5),
        ..ManagerConfig::default()
    })
    .with_subscribers(subs)
    .build();

    component(&manager, "db", &[], 300);
    component(&manager, "cache", &["db"], 150);
    component(&manager, "api", &["cache", "db"], 50);

    let token = CancellationToken::new();
    let stopper = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(2)).await;
        println!("--- requesting shutdown ---");
        stopper.cancel();
    });

    manager.run(token).await?;

    println!();
    println!("Final state:");
    for name in manager.services() {
        let node = manager.service(&name);
        println!(" ├─► {name}: start={:?} stop={:?}", node.start_phase(), node.stop_phase());
    }
    Ok(())
}
