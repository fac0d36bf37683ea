//! Outstanding-work accounting for a crawl run.
//!
//! Every accepted crawl request holds a [`TaskGuard`]. Creating the guard
//! counts the request; dropping it resolves the request. Because a request
//! can only be submitted together with its guard, the count is always raised
//! before the work becomes visible to the pool, and it is lowered exactly once
//! on every path out of the task, including early returns, panics and aborts.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct TrackerState {
    outstanding: AtomicUsize,
    drained: Notify,
}

#[derive(Debug, Clone, Default)]
pub struct TaskTracker {
    state: Arc<TrackerState>,
}

impl TaskTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one more outstanding request.
    pub fn track(&self) -> TaskGuard {
        self.state.outstanding.fetch_add(1, Ordering::SeqCst);
        TaskGuard {
            tracker: self.clone(),
        }
    }

    pub fn outstanding(&self) -> usize {
        self.state.outstanding.load(Ordering::SeqCst)
    }

    pub fn is_idle(&self) -> bool {
        self.outstanding() == 0
    }

    /// Resolves once the outstanding count is zero.
    ///
    /// The waiter registers for the wake-up before reading the count, so a
    /// drain that happens between the read and the await is not missed.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.state.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_idle() {
                return;
            }

            notified.await;
        }
    }

    fn release(&self) {
        if self.state.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.state.drained.notify_waiters();
        }
    }
}

/// Proof that one request is being accounted for.
#[derive(Debug)]
#[must_use = "dropping a TaskGuard immediately resolves its request"]
pub struct TaskGuard {
    tracker: TaskTracker,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.tracker.release();
    }
}
