//! Fire-and-forget work that runs beside the response path.
//!
//! Errors from spawned tasks are logged and never rethrown. Tests call
//! [`BackgroundTasks::wait_idle`] to await everything spawned so far.

use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use tokio::task::JoinSet;
use tracing::{trace, warn};

use crate::Result;

/// Tracker for spawned background tasks.
#[derive(Default)]
pub struct BackgroundTasks {
    set: Mutex<JoinSet<()>>,
}

impl BackgroundTasks {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.set.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Spawn a task on the current tokio runtime.
    pub fn spawn<F>(&self, label: &'static str, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let mut set = self.lock();

        // Reap finished tasks so the set does not grow without bound.
        while let Some(joined) = set.try_join_next() {
            if let Err(e) = joined {
                warn!(error = %e, "Background task panicked");
            }
        }

        set.spawn(async move {
            match task.await {
                Ok(()) => trace!(task = label, "Background task finished"),
                Err(e) => warn!(task = label, error = %e, "Background task failed"),
            }
        });
    }

    /// Number of tasks spawned and not yet reaped.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Wait until every spawned task, including ones spawned while waiting,
    /// has finished.
    ///
    /// Dropping the returned future detaches the tasks it was waiting on;
    /// they keep running.
    pub async fn wait_idle(&self) {
        loop {
            let mut draining = Draining(std::mem::take(&mut *self.lock()));
            if draining.0.is_empty() {
                return;
            }
            while let Some(joined) = draining.0.join_next().await {
                if let Err(e) = joined {
                    warn!(error = %e, "Background task panicked");
                }
            }
        }
    }
}

/// Tasks taken out of the tracker by [`BackgroundTasks::wait_idle`].
struct Draining(JoinSet<()>);

impl Drop for Draining {
    fn drop(&mut self) {
        // A dropped JoinSet aborts its tasks.
        self.0.detach_all();
    }
}
