//! Tokio-backed scheduler for native targets.

use crate::host::{HostError, Scheduler};
use async_trait::async_trait;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;
use tokio::time::Instant;

/// Scheduler on the current tokio runtime.
///
/// `defer` uses `spawn_local`, so deferred work only runs when the agent is
/// driven from a [`tokio::task::LocalSet`]. Outside one, `defer` fails with
/// [`HostError::Unsupported`].
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    origin: Instant,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl Scheduler for TokioScheduler {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn defer(&self, delay: Duration, task: Box<dyn FnOnce()>) -> Result<(), HostError> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(HostError::Unsupported("deferred work outside a tokio runtime".into()));
        }
        // tokio offers no fallible `spawn_local`; it panics without a LocalSet.
        panic::catch_unwind(AssertUnwindSafe(|| {
            tokio::task::spawn_local(async move {
                tokio::time::sleep(delay).await;
                task();
            })
        }))
        .map(drop)
        .map_err(|_| HostError::Unsupported("deferred work outside a tokio LocalSet".into()))
    }
}
