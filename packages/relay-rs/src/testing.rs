//! Testing utilities for relay engines.
//!
//! # Feature Flag
//!
//! This module is only available with the `testing` feature:
//!
//! ```toml
//! [dev-dependencies]
//! relay = { path = "../relay-rs", features = ["testing"] }
//! ```
//!
//! # Quick Start
//!
//! ## Recording the action stream
//!
//! ```ignore
//! use relay::testing::ActionRecorder;
//!
//! let mut recorder = ActionRecorder::new(handle.bus());
//!
//! handle.dispatch_and_settle(MovieAction::LoadPopularMovies).await?;
//!
//! assert_eq!(
//!     recorder.tags(),
//!     vec![ActionTag::LoadPopularMovies, ActionTag::LoadPopularMoviesSuccess]
//! );
//! ```
//!
//! ## Holding an operation open with `Gate`
//!
//! ```ignore
//! use relay::testing::Gate;
//!
//! let gate = Gate::new();
//! let provider = MockMovieProvider::new().with_gate("search:ali", gate.clone());
//!
//! handle.dispatch(MovieAction::SearchMovies { query: "ali".into() });
//! gate.wait_arrivals(1).await;   // first search is now pending
//!
//! handle.dispatch(MovieAction::SearchMovies { query: "alien".into() });
//! gate.open();
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};

use crate::bus::{Bus, Subscription};
use crate::core::{Action, Envelope};

// =============================================================================
// ActionRecorder
// =============================================================================

/// Records every action published on a bus after it was created.
pub struct ActionRecorder<A> {
    subscription: Subscription<A>,
    recorded: Vec<Envelope<A>>,
}

impl<A: Action> ActionRecorder<A> {
    /// Start recording.
    pub fn new(bus: &Bus<A>) -> Self {
        Self {
            subscription: bus.subscribe(),
            recorded: Vec::new(),
        }
    }

    fn drain(&mut self) {
        while let Some(envelope) = self.subscription.try_recv() {
            self.recorded.push(envelope);
        }
    }

    /// Every envelope recorded so far, in bus order.
    pub fn envelopes(&mut self) -> &[Envelope<A>] {
        self.drain();
        &self.recorded
    }

    /// Every action recorded so far, in bus order.
    pub fn actions(&mut self) -> Vec<A> {
        self.drain();
        self.recorded
            .iter()
            .map(|envelope| (*envelope.action).clone())
            .collect()
    }

    /// The tags of every action recorded so far, in bus order.
    pub fn tags(&mut self) -> Vec<A::Tag> {
        self.drain();
        self.recorded.iter().map(|envelope| envelope.tag()).collect()
    }

    /// Number of recorded actions with the given tag.
    pub fn count(&mut self, tag: A::Tag) -> usize {
        self.drain();
        self.recorded
            .iter()
            .filter(|envelope| envelope.tag() == tag)
            .count()
    }

    /// Forget everything recorded so far.
    pub fn clear(&mut self) {
        self.drain();
        self.recorded.clear();
    }

    /// Wait until a recorded action satisfies `predicate`.
    ///
    /// Returns the first matching action, or `None` on timeout.
    pub async fn wait_for<F>(&mut self, predicate: F, timeout: Duration) -> Option<A>
    where
        F: Fn(&A) -> bool,
    {
        self.drain();
        if let Some(found) = self.recorded.iter().find(|e| predicate(&e.action)) {
            return Some((*found.action).clone());
        }

        let subscription = &mut self.subscription;
        let recorded = &mut self.recorded;
        let search = async {
            while let Some(envelope) = subscription.recv().await {
                let hit = predicate(&envelope.action);
                let action = (*envelope.action).clone();
                recorded.push(envelope);
                if hit {
                    return Some(action);
                }
            }
            None
        };

        tokio::time::timeout(timeout, search).await.ok().flatten()
    }
}

impl<A> std::fmt::Debug for ActionRecorder<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRecorder")
            .field("recorded", &self.recorded.len())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Gate
// =============================================================================

struct GateInner {
    open: watch::Sender<bool>,
    arrivals: AtomicUsize,
    arrived: Notify,
}

/// A controllable async latch for holding mock operations open.
///
/// Clones share the same gate.
#[derive(Clone)]
pub struct Gate {
    inner: Arc<GateInner>,
}

impl Gate {
    /// A closed gate.
    pub fn new() -> Self {
        let (open, _) = watch::channel(false);
        Self {
            inner: Arc::new(GateInner {
                open,
                arrivals: AtomicUsize::new(0),
                arrived: Notify::new(),
            }),
        }
    }

    /// A gate that lets everything through.
    pub fn opened() -> Self {
        let gate = Self::new();
        gate.open();
        gate
    }

    /// Let every current and future waiter through.
    pub fn open(&self) {
        self.inner.open.send_replace(true);
    }

    /// Hold future waiters again.
    pub fn close(&self) {
        self.inner.open.send_replace(false);
    }

    /// Whether the gate is open.
    pub fn is_open(&self) -> bool {
        *self.inner.open.borrow()
    }

    /// Arrive at the gate and wait until it opens.
    pub async fn wait(&self) {
        let mut open = self.inner.open.subscribe();
        self.inner.arrivals.fetch_add(1, Ordering::AcqRel);
        self.inner.arrived.notify_waiters();
        // The sender lives in `self`, so this cannot fail.
        let _ = open.wait_for(|open| *open).await;
    }

    /// Number of calls to [`wait`](Self::wait) so far.
    pub fn arrivals(&self) -> usize {
        self.inner.arrivals.load(Ordering::Acquire)
    }

    /// Wait until at least `n` callers have arrived.
    pub async fn wait_arrivals(&self, n: usize) {
        loop {
            let notified = self.inner.arrived.notified();
            if self.arrivals() >= n {
                return;
            }
            notified.await;
        }
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gate")
            .field("open", &self.is_open())
            .field("arrivals", &self.arrivals())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Ping {
        Sent(u32),
        Echoed(u32),
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum PingTag {
        Sent,
        Echoed,
    }

    impl Action for Ping {
        type Tag = PingTag;

        fn tag(&self) -> PingTag {
            match self {
                Ping::Sent(_) => PingTag::Sent,
                Ping::Echoed(_) => PingTag::Echoed,
            }
        }
    }

    #[tokio::test]
    async fn test_recorder_keeps_bus_order() {
        let bus = Bus::new();
        let mut recorder = ActionRecorder::new(&bus);

        bus.publish(Ping::Sent(1));
        bus.publish(Ping::Echoed(1));
        bus.publish(Ping::Sent(2));

        assert_eq!(recorder.tags(), vec![PingTag::Sent, PingTag::Echoed, PingTag::Sent]);
        assert_eq!(recorder.count(PingTag::Sent), 2);
        assert_eq!(recorder.actions()[2], Ping::Sent(2));

        recorder.clear();
        assert!(recorder.actions().is_empty());
    }

    #[tokio::test]
    async fn test_wait_for_future_action() {
        let bus = Bus::new();
        let mut recorder = ActionRecorder::new(&bus);

        let publisher = bus.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            publisher.publish(Ping::Sent(7));
            publisher.publish(Ping::Echoed(7));
        });

        let found = recorder
            .wait_for(|a| matches!(a, Ping::Echoed(_)), Duration::from_secs(2))
            .await;
        assert_eq!(found, Some(Ping::Echoed(7)));
        assert_eq!(recorder.envelopes().len(), 2);
    }

    #[tokio::test]
    async fn test_wait_for_times_out() {
        let bus = Bus::<Ping>::new();
        let mut recorder = ActionRecorder::new(&bus);

        let found = recorder
            .wait_for(|_| true, Duration::from_millis(20))
            .await;
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn test_gate_holds_until_opened() {
        let gate = Gate::new();
        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.wait().await })
        };

        gate.wait_arrivals(1).await;
        assert!(!waiter.is_finished());

        gate.open();
        waiter.await.unwrap();
        assert_eq!(gate.arrivals(), 1);
    }

    #[tokio::test]
    async fn test_opened_gate_passes_through() {
        let gate = Gate::opened();
        gate.wait().await;
        gate.wait().await;
        assert_eq!(gate.arrivals(), 2);
        assert!(gate.is_open());
    }
}
