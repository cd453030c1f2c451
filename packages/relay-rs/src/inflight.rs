//! Inflight tracking for awaiting quiescence.
//!
//! The tracker counts two kinds of pending work:
//! - actions published on the bus that the routing runtime has not finished
//!   handing to triggers yet
//! - trigger invocations that have not settled yet
//!
//! An invocation publishes its follow-up action (incrementing the count)
//! before its own guard is dropped (decrementing it), so the count only
//! reaches zero once a whole cascade has run out.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Notify;

/// Tracks pending routing and invocation work across the engine.
#[derive(Default)]
pub struct InflightTracker {
    pending: AtomicUsize,
    notify: Notify,
    triggers: DashMap<&'static str, usize>,
}

impl InflightTracker {
    /// Create a new inflight tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the pending count.
    pub fn inc(&self, n: usize) {
        self.pending.fetch_add(n, Ordering::AcqRel);
    }

    /// Decrement the pending count, notifying waiters when it hits zero.
    pub fn dec(&self, n: usize) {
        let prev = self.pending.fetch_sub(n, Ordering::AcqRel);
        debug_assert!(prev >= n, "inflight count underflow");
        if prev == n {
            self.notify.notify_waiters();
        }
    }

    /// Number of pending work items.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Number of unsettled invocations for the named trigger.
    pub fn in_flight(&self, trigger: &str) -> usize {
        self.triggers.get(trigger).map(|n| *n).unwrap_or(0)
    }

    /// Wait until no work is pending.
    ///
    /// Notify is edge-triggered, so this loops and rechecks after every wakeup.
    pub async fn wait_idle(&self) {
        loop {
            // Register before checking so a concurrent dec() cannot slip between.
            let notified = self.notify.notified();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Begin tracking one invocation of `trigger`.
    ///
    /// The returned guard releases the count on drop, including when the
    /// invocation task is aborted or cancelled.
    pub fn begin_invocation(self: &Arc<Self>, trigger: &'static str) -> InvocationGuard {
        self.inc(1);
        *self.triggers.entry(trigger).or_insert(0) += 1;
        InvocationGuard {
            tracker: self.clone(),
            trigger,
        }
    }
}

impl std::fmt::Debug for InflightTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InflightTracker")
            .field("pending", &self.pending())
            .finish()
    }
}

/// RAII guard for one trigger invocation.
pub struct InvocationGuard {
    tracker: Arc<InflightTracker>,
    trigger: &'static str,
}

impl Drop for InvocationGuard {
    fn drop(&mut self) {
        if let Some(mut n) = self.tracker.triggers.get_mut(self.trigger) {
            *n = n.saturating_sub(1);
        }
        self.tracker.dec(1);
    }
}
