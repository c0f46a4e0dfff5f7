//! # Memoized start/stop operations.
//!
//! An [`Operation`] is the shared handle of one start or stop attempt. The node
//! stores it per axis; every caller asking for the same axis while it exists
//! receives a clone, so the work runs once and all callers observe the same
//! [`Outcome`].
//!
//! ## Execution
//! ```text
//! Operation::spawn(fut)
//!     ├─► watch::channel(None)
//!     └─► tokio::spawn
//!           ├─► catch_unwind(fut).await   (panic → ServiceError::Fail)
//!           └─► tx.send_replace(Some(outcome))
//!
//! phase()  ── borrow() ──► None → InProgress, Some(Ok) → Completed, Some(Err) → Failed
//! wait()   ── wait_for(is_some) ──► cloned outcome
//! ```
//!
//! ## Rules
//! - Work starts eagerly on spawn, whether or not anyone awaits the handle.
//! - `phase()` never blocks.
//! - The outcome is set exactly once.

use std::future::{Future, IntoFuture};
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::watch;

use crate::error::{ServiceError, panic_message};

/// Result of one start or stop operation.
pub type Outcome = Result<(), ServiceError>;

/// Settlement state of one lifecycle axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No operation recorded.
    Idle,
    /// Operation running.
    InProgress,
    /// Operation succeeded.
    Completed,
    /// Operation failed.
    Failed,
}

impl Phase {
    /// Phase of an optional memoized operation (`None` is [`Phase::Idle`]).
    pub(crate) fn of(op: Option<&Operation>) -> Self {
        op.map_or(Phase::Idle, Operation::phase)
    }
}

/// Shared handle to a start or stop attempt.
///
/// Await it directly (it implements [`IntoFuture`]) or call [`Operation::wait`].
///
/// ```rust,ignore
/// manager.service("api").start().await?;
/// ```
#[derive(Clone, Debug)]
#[must_use = "an operation runs in the background; await it to observe the outcome"]
pub struct Operation {
    rx: watch::Receiver<Option<Outcome>>,
}

impl Operation {
    /// Spawns `fut` on the current tokio runtime and returns its handle.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub(crate) fn spawn<F>(fut: F) -> Self
    where
        F: Future<Output = Outcome> + Send + 'static,
    {
        let (tx, rx) = watch::channel(None);
        tokio::spawn(async move {
            let outcome = AssertUnwindSafe(fut)
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    let info = panic_message(panic.as_ref());
                    Err(ServiceError::fail(format!("operation panicked: {info}")))
                });
            tx.send_replace(Some(outcome));
        });
        Self { rx }
    }

    /// An operation that is already settled.
    pub(crate) fn ready(outcome: Outcome) -> Self {
        let (_tx, rx) = watch::channel(Some(outcome));
        Self { rx }
    }

    /// Current settlement state (non-blocking).
    pub fn phase(&self) -> Phase {
        match &*self.rx.borrow() {
            None => Phase::InProgress,
            Some(Ok(())) => Phase::Completed,
            Some(Err(_)) => Phase::Failed,
        }
    }

    /// Settled outcome, if any (non-blocking).
    pub fn outcome(&self) -> Option<Outcome> {
        self.rx.borrow().clone()
    }

    /// Waits for the operation to settle.
    pub async fn wait(mut self) -> Outcome {
        let settled = match self.rx.wait_for(Option::is_some).await {
            Ok(outcome) => (*outcome).clone(),
            Err(_) => None,
        };
        // The sender only disappears without a value if the runtime dropped the task.
        settled.unwrap_or_else(|| Err(ServiceError::fail("operation aborted by runtime shutdown")))
    }
}

impl IntoFuture for Operation {
    type Output = Outcome;
    type IntoFuture = BoxFuture<'static, Outcome>;

    fn into_future(self) -> Self::IntoFuture {
        self.wait().boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_ready_is_settled() {
        assert_eq!(Operation::ready(Ok(())).phase(), Phase::Completed);
        let failed = Operation::ready(Err(ServiceError::Detached));
        assert_eq!(failed.phase(), Phase::Failed);
        assert_eq!(failed.outcome(), Some(Err(ServiceError::Detached)));
        assert_eq!(Phase::of(None), Phase::Idle);
    }

    #[tokio::test]
    async fn test_spawned_runs_without_awaiting() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let op = Operation::spawn(async move {
            let _ = tx.send(());
            Ok(())
        });
        rx.await.expect("operation body should run eagerly");
        assert_eq!(op.await, Ok(()));
    }

    #[tokio::test]
    async fn test_clones_share_outcome() {
        let op = Operation::spawn(async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Err(ServiceError::fail("boom"))
        });
        assert_eq!(op.phase(), Phase::InProgress);
        let other = op.clone();
        let (a, b) = tokio::join!(op.wait(), other.wait());
        assert_eq!(a, Err(ServiceError::fail("boom")));
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_panic_becomes_failure() {
        let op = Operation::spawn(async {
            if true {
                panic!("kaboom");
            }
            Ok(())
        });
        let err = op.clone().await.unwrap_err();
        assert_eq!(err, ServiceError::fail("operation panicked: kaboom"));
        assert_eq!(op.phase(), Phase::Failed);
    }
}
