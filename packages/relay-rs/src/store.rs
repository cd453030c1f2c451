//! Reducer trait and the store runner that applies actions in bus order.
//!
//! Reducers are the pure half of the loop: no IO, no async, one state
//! transition per action. Failure actions are ordinary transitions here.

use std::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::bus::Subscription;
use crate::core::Action;

/// A pure state transition function.
///
/// # Example
///
/// ```ignore
/// struct CounterReducer;
///
/// impl Reducer for CounterReducer {
///     type State = u64;
///     type Action = CounterAction;
///
///     fn reduce(&self, state: &mut u64, action: &CounterAction) {
///         if let CounterAction::Loaded { value } = action {
///             *state = *value;
///         }
///     }
/// }
/// ```
pub trait Reducer: Send + Sync + 'static {
    /// The state snapshot type.
    type State: Clone + Send + Sync + 'static;

    /// The action type this reducer applies.
    type Action: Action;

    /// Apply one action.
    ///
    /// # Guarantees
    ///
    /// - Called synchronously (no async)
    /// - Called serially, in bus order
    fn reduce(&self, state: &mut Self::State, action: &Self::Action);
}

/// Reducer that keeps no state. Used when an engine has no store.
pub struct NoopReducer<A>(PhantomData<fn() -> A>);

impl<A> Default for NoopReducer<A> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<A: Action> Reducer for NoopReducer<A> {
    type State = ();
    type Action = A;

    fn reduce(&self, _state: &mut (), _action: &A) {}
}

/// Read side of a running store.
pub struct Store<S> {
    state: watch::Receiver<S>,
    applied: watch::Receiver<u64>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            applied: self.applied.clone(),
        }
    }
}

impl<S: Clone> Store<S> {
    /// Current state snapshot.
    pub fn snapshot(&self) -> S {
        self.state.borrow().clone()
    }

    /// A receiver notified on every state change.
    pub fn watch(&self) -> watch::Receiver<S> {
        self.state.clone()
    }

    /// Sequence number of the last applied action.
    pub fn applied(&self) -> u64 {
        *self.applied.borrow()
    }

    /// Wait until the action with sequence `seq` has been applied.
    ///
    /// Returns `false` if the store stopped first.
    pub async fn caught_up(&self, seq: u64) -> bool {
        let mut applied = self.applied.clone();
        let caught = applied.wait_for(|applied| *applied >= seq).await.is_ok();
        caught
    }
}

/// Spawn the store loop on the given subscription.
///
/// `baseline` is the last sequence number published before the subscription
/// was taken; those actions count as applied.
pub(crate) fn spawn_store<R: Reducer>(
    reducer: R,
    initial: R::State,
    mut subscription: Subscription<R::Action>,
    baseline: u64,
) -> (Store<R::State>, JoinHandle<()>) {
    let (state_tx, state_rx) = watch::channel(initial);
    let (applied_tx, applied_rx) = watch::channel(baseline);

    let task = tokio::spawn(async move {
        let name = std::any::type_name::<R>();
        while let Some(envelope) = subscription.recv().await {
            let mut next = state_tx.borrow().clone();
            let result = catch_unwind(AssertUnwindSafe(|| {
                reducer.reduce(&mut next, &envelope.action)
            }));

            match result {
                Ok(()) => {
                    state_tx.send_replace(next);
                }
                Err(_) => {
                    // Keep the previous snapshot; a half-applied action is worse.
                    error!(
                        reducer = name,
                        seq = envelope.seq,
                        tag = ?envelope.tag(),
                        "reducer panicked, action not applied"
                    );
                }
            }
            applied_tx.send_replace(envelope.seq);
        }
        debug!(reducer = name, "store stopped");
    });

    let store = Store {
        state: state_rx,
        applied: applied_rx,
    };
    (store, task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::Bus;

    #[derive(Debug, Clone, PartialEq)]
    enum Tally {
        Add(u32),
        Boom,
    }

    impl Action for Tally {
        type Tag = ();

        fn tag(&self) {}
    }

    struct TallyReducer;

    impl Reducer for TallyReducer {
        type State = Vec<u32>;
        type Action = Tally;

        fn reduce(&self, state: &mut Vec<u32>, action: &Tally) {
            match action {
                Tally::Add(n) => state.push(*n),
                Tally::Boom => {
                    state.push(0);
                    panic!("boom");
                }
            }
        }
    }

    #[tokio::test]
    async fn test_store_applies_in_bus_order() {
        let bus = Bus::new();
        let (store, _task) = spawn_store(TallyReducer, Vec::new(), bus.subscribe(), 0);

        for i in 1..=5 {
            bus.publish(Tally::Add(i));
        }

        assert!(store.caught_up(5).await);
        assert_eq!(store.snapshot(), vec![1, 2, 3, 4, 5]);
        assert_eq!(store.applied(), 5);
    }

    #[tokio::test]
    async fn test_reducer_panic_keeps_previous_state() {
        let bus = Bus::new();
        let (store, _task) = spawn_store(TallyReducer, Vec::new(), bus.subscribe(), 0);

        bus.publish(Tally::Add(1));
        bus.publish(Tally::Boom);
        bus.publish(Tally::Add(2));

        assert!(store.caught_up(3).await);
        assert_eq!(store.snapshot(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_baseline_counts_as_applied() {
        let bus = Bus::new();
        bus.publish(Tally::Add(1));
        bus.publish(Tally::Add(2));

        let (subscription, baseline) = bus.subscribe_after();
        let (store, _task) = spawn_store(TallyReducer, Vec::new(), subscription, baseline);

        assert_eq!(store.applied(), 2);
        assert!(store.caught_up(bus.last_seq()).await);
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_watch_sees_updates() {
        let bus = Bus::new();
        let (store, _task) = spawn_store(TallyReducer, Vec::new(), bus.subscribe(), 0);
        let mut watch = store.watch();

        bus.publish(Tally::Add(9));

        watch.changed().await.unwrap();
        assert_eq!(*watch.borrow(), vec![9]);
    }
}
