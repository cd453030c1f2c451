//! The dispatch bus: the single ordered stream every action flows through.
//!
//! # Guarantees
//!
//! - **Exactly-once delivery** to every subscriber present at publication
//! - **Total order**: all subscribers observe the same sequence
//! - **No back-pressure**: each subscriber owns an unbounded queue, so a slow
//!   subscriber never blocks publication or other subscribers
//! - **No replay**: late subscribers only see actions published after they
//!   subscribed
//!
//! The bus is in-memory only. It is not a log.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::trace;

use crate::core::{Action, CorrelationId, Envelope};
use crate::inflight::InflightTracker;

struct Subscriber<A> {
    sender: mpsc::UnboundedSender<Envelope<A>>,
    /// Counts deliveries this subscriber has not handled yet.
    tracker: Option<Arc<InflightTracker>>,
}

impl<A> Subscriber<A> {
    fn deliver(&self, envelope: Envelope<A>) -> bool {
        // Counted before the send so the receiver can never dec first.
        if let Some(tracker) = &self.tracker {
            tracker.inc(1);
        }
        let delivered = self.sender.send(envelope).is_ok();
        if !delivered {
            if let Some(tracker) = &self.tracker {
                tracker.dec(1);
            }
        }
        delivered
    }
}

/// Runs under the bus lock for every published envelope, before delivery.
pub(crate) type PublishHook<A> = Box<dyn Fn(&Envelope<A>) + Send + Sync>;

struct BusState<A> {
    next_seq: u64,
    subscribers: Vec<Subscriber<A>>,
    hooks: Vec<PublishHook<A>>,
}

impl<A: Action> BusState<A> {
    fn publish(&mut self, action: A, cid: CorrelationId) -> usize {
        let seq = self.next_seq;
        self.next_seq += 1;

        let envelope = Envelope {
            seq,
            cid,
            action: Arc::new(action),
        };
        trace!(seq, cid = %cid, tag = ?envelope.tag(), "publishing action");

        for hook in &self.hooks {
            hook(&envelope);
        }
        self.subscribers
            .retain(|subscriber| subscriber.deliver(envelope.clone()));
        self.subscribers.len()
    }
}

struct BusInner<A> {
    state: Mutex<BusState<A>>,
}

/// Ordered, lossless, unbounded broadcast of actions.
///
/// # Example
///
/// ```ignore
/// let bus = Bus::<MovieAction>::new();
/// let mut subscription = bus.subscribe();
///
/// bus.publish(MovieAction::LoadPopularMovies);
///
/// let envelope = subscription.recv().await.unwrap();
/// assert_eq!(envelope.tag(), ActionTag::LoadPopularMovies);
/// ```
pub struct Bus<A> {
    inner: Arc<BusInner<A>>,
}

impl<A> Clone for Bus<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A: Action> Bus<A> {
    /// Create a new bus with no subscribers.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                state: Mutex::new(BusState {
                    next_seq: 1,
                    subscribers: Vec::new(),
                    hooks: Vec::new(),
                }),
            }),
        }
    }

    /// Subscribe and start counting every later action on `tracker`.
    ///
    /// The tracker counts exactly the actions this subscription receives.
    /// The subscriber must call `tracker.dec(1)` once it has handled each.
    pub(crate) fn subscribe_counted(&self, tracker: Arc<InflightTracker>) -> Subscription<A> {
        self.attach(Some(tracker)).0
    }

    /// Subscribe, also returning the last sequence number published before
    /// the subscription existed.
    pub(crate) fn subscribe_after(&self) -> (Subscription<A>, u64) {
        self.attach(None)
    }

    /// Publish an intent with a fresh correlation ID.
    ///
    /// Returns the number of subscribers the action was delivered to.
    pub fn publish(&self, action: A) -> usize {
        self.publish_caused(action, CorrelationId::new())
    }

    /// Publish an action that belongs to an existing causal chain.
    ///
    /// Returns the number of subscribers the action was delivered to.
    pub fn publish_caused(&self, action: A, cid: CorrelationId) -> usize {
        self.lock().publish(action, cid)
    }

    /// Publish only if `admit` returns true.
    ///
    /// `admit` runs under the bus lock, so no other action can be published
    /// between the check and the publication. Returns `None` if refused.
    pub(crate) fn publish_caused_if(
        &self,
        action: A,
        cid: CorrelationId,
        admit: impl FnOnce() -> bool,
    ) -> Option<usize> {
        let mut state = self.lock();
        if !admit() {
            return None;
        }
        Some(state.publish(action, cid))
    }

    /// Observe every later publication while the bus lock is held.
    pub(crate) fn on_publish(&self, hook: PublishHook<A>) {
        self.lock().hooks.push(hook);
    }

    /// Subscribe to every action published from now on.
    pub fn subscribe(&self) -> Subscription<A> {
        self.attach(None).0
    }

    fn attach(&self, tracker: Option<Arc<InflightTracker>>) -> (Subscription<A>, u64) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut state = self.lock();
        state.subscribers.push(Subscriber { sender, tracker });
        (Subscription { receiver }, state.next_seq - 1)
    }

    /// Number of live subscribers.
    ///
    /// Dropped subscriptions are only pruned on the next publish.
    pub fn subscriber_count(&self) -> usize {
        self.lock()
            .subscribers
            .iter()
            .filter(|subscriber| !subscriber.sender.is_closed())
            .count()
    }

    /// Sequence number of the most recently published action (0 if none).
    pub fn last_seq(&self) -> u64 {
        self.lock().next_seq - 1
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BusState<A>> {
        // A poisoned lock only means a publisher panicked mid-send; the
        // state itself is still consistent.
        match self.inner.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<A: Action> Default for Bus<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Action> std::fmt::Debug for Bus<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bus")
            .field("subscriber_count", &self.subscriber_count())
            .field("last_seq", &self.last_seq())
            .finish()
    }
}

/// A subscriber's private, ordered view of the bus.
pub struct Subscription<A> {
    receiver: mpsc::UnboundedReceiver<Envelope<A>>,
}

impl<A> Subscription<A> {
    /// Receive the next action. Returns `None` once every bus handle is gone.
    pub async fn recv(&mut self) -> Option<Envelope<A>> {
        self.receiver.recv().await
    }

    /// Receive the next action if one is already queued.
    pub fn try_recv(&mut self) -> Option<Envelope<A>> {
        self.receiver.try_recv().ok()
    }
}

impl<A> std::fmt::Debug for Subscription<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Note(u32);

    impl Action for Note {
        type Tag = ();

        fn tag(&self) {}
    }

    #[tokio::test]
    async fn test_publish_and_receive() {
        let bus = Bus::new();
        let mut subscription = bus.subscribe();

        bus.publish(Note(42));

        let envelope = subscription.recv().await.unwrap();
        assert_eq!(*envelope.action, Note(42));
        assert_eq!(envelope.seq, 1);
    }

    #[tokio::test]
    async fn test_publish_caused_keeps_correlation() {
        let bus = Bus::new();
        let mut subscription = bus.subscribe();

        let cid = CorrelationId::new();
        bus.publish_caused(Note(1), cid);

        assert_eq!(subscription.recv().await.unwrap().cid, cid);
    }

    #[tokio::test]
    async fn test_all_subscribers_see_same_order() {
        let bus = Bus::new();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        for i in 0..100 {
            bus.publish(Note(i));
        }

        for i in 0..100 {
            let a = first.recv().await.unwrap();
            let b = second.recv().await.unwrap();
            assert_eq!(*a.action, Note(i));
            assert_eq!(a.seq, b.seq);
            assert!(Arc::ptr_eq(&a.action, &b.action));
        }
    }

    #[tokio::test]
    async fn test_slow_subscriber_does_not_lose_actions() {
        let bus = Bus::new();
        let mut slow = bus.subscribe();

        // Far past any bounded channel capacity.
        for i in 0..50_000 {
            bus.publish(Note(i));
        }

        let mut count = 0;
        while let Some(envelope) = slow.try_recv() {
            assert_eq!(*envelope.action, Note(count));
            count += 1;
        }
        assert_eq!(count, 50_000);
    }

    #[tokio::test]
    async fn test_publish_returns_receiver_count() {
        let bus = Bus::new();
        assert_eq!(bus.publish(Note(1)), 0);

        let _first = bus.subscribe();
        assert_eq!(bus.publish(Note(2)), 1);

        let second = bus.subscribe();
        assert_eq!(bus.publish(Note(3)), 2);

        drop(second);
        assert_eq!(bus.publish(Note(4)), 1);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_actions() {
        let bus = Bus::new();
        bus.publish(Note(1));

        let mut subscription = bus.subscribe();
        bus.publish(Note(2));

        let envelope = subscription.recv().await.unwrap();
        assert_eq!(*envelope.action, Note(2));
        assert_eq!(envelope.seq, 2);
        assert_eq!(bus.last_seq(), 2);
    }

    #[tokio::test]
    async fn test_clone_shares_stream() {
        let bus = Bus::new();
        let clone = bus.clone();
        let mut subscription = bus.subscribe();

        clone.publish(Note(55));

        assert_eq!(*subscription.recv().await.unwrap().action, Note(55));
    }

    #[test]
    fn test_publish_counts_inflight() {
        let bus = Bus::new();
        bus.publish(Note(0));

        let tracker = Arc::new(InflightTracker::new());
        let mut subscription = bus.subscribe_counted(tracker.clone());

        bus.publish(Note(1));
        bus.publish(Note(2));

        assert_eq!(tracker.pending(), 2);
        assert_eq!(*subscription.try_recv().unwrap().action, Note(1));
    }

    #[test]
    fn test_debug_impl() {
        let bus = Bus::<Note>::new();
        let _subscription = bus.subscribe();
        let debug = format!("{:?}", bus);
        assert!(debug.contains("Bus"));
        assert!(debug.contains("subscriber_count"));
    }

    #[test]
    fn test_hooks_see_every_publication_in_order() {
        let bus = Bus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        bus.on_publish(Box::new(move |envelope: &Envelope<Note>| {
            sink.lock().unwrap().push(envelope.seq);
        }));

        bus.publish(Note(1));
        bus.publish(Note(2));

        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_conditional_publish() {
        let bus = Bus::new();
        let mut subscription = bus.subscribe();

        assert_eq!(bus.publish_caused_if(Note(1), CorrelationId::new(), || false), None);
        assert_eq!(bus.last_seq(), 0);
        assert!(subscription.try_recv().is_none());

        assert_eq!(bus.publish_caused_if(Note(2), CorrelationId::new(), || true), Some(1));
        assert_eq!(*subscription.try_recv().unwrap().action, Note(2));
    }
}
