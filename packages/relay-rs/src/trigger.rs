//! Trigger runners: one per registered effect, each enforcing its policy.
//!
//! ```text
//! Router ──submit(envelope)──► TriggerRunner
//!                                  │
//!          ┌───────────────────────┼─────────────────────────┐
//!          ▼                       ▼                         ▼
//!     Serialized              Concurrent                LatestOnly
//!   FIFO + one worker      spawn per match     cancel pending, spawn, publish
//!                                              only if still the newest
//!                                              match published
//!          │                       │                         │
//!          └──────── run ─► translate ─► bus.publish_caused ─┘
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn, Instrument};

use crate::bus::Bus;
use crate::core::{Action, Envelope};
use crate::effect::{ConcurrencyPolicy, Effect, EffectContext, MatchTags};
use crate::error::{Classifier, Failure};
use crate::inflight::{InflightTracker, InvocationGuard};

/// Type-erased effect used by the runtime.
#[async_trait]
pub(crate) trait AnyEffect<A: Action, D>: Send + Sync {
    fn name(&self) -> &'static str;

    fn policy(&self) -> ConcurrencyPolicy;

    fn matches(&self) -> MatchTags<A::Tag>;

    /// Run the operation and translate its settlement into exactly one action.
    async fn invoke(&self, action: A, ctx: EffectContext<D>, classify: Classifier) -> A;
}

#[async_trait]
impl<A, D, E> AnyEffect<A, D> for E
where
    A: Action,
    D: Send + Sync + 'static,
    E: Effect<A, D>,
{
    fn name(&self) -> &'static str {
        <E as Effect<A, D>>::name(self)
    }

    fn policy(&self) -> ConcurrencyPolicy {
        <E as Effect<A, D>>::policy(self)
    }

    fn matches(&self) -> MatchTags<A::Tag> {
        <E as Effect<A, D>>::matches(self)
    }

    async fn invoke(&self, action: A, ctx: EffectContext<D>, classify: Classifier) -> A {
        let trigger = <E as Effect<A, D>>::name(self);

        // A panicking operation must not take the worker down with it.
        let outcome = AssertUnwindSafe(<E as Effect<A, D>>::run(self, action, ctx))
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(output)) => <E as Effect<A, D>>::on_success(self, output),
            Ok(Err(err)) => {
                let failure = classify(&err);
                warn!(trigger, error = %err, kind = %failure.kind, "operation failed");
                <E as Effect<A, D>>::on_failure(self, failure)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(trigger, panic = %message, "operation panicked");
                <E as Effect<A, D>>::on_failure(self, Failure::internal(format!(
                    "operation '{}' panicked: {}",
                    trigger, message
                )))
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Everything an invocation needs, shared by all invocations of one trigger.
struct TriggerCore<A: Action, D> {
    effect: Arc<dyn AnyEffect<A, D>>,
    deps: Arc<D>,
    bus: Bus<A>,
    classify: Classifier,
    name: &'static str,
    policy: ConcurrencyPolicy,
}

impl<A: Action, D: Send + Sync + 'static> TriggerCore<A, D> {
    /// Run one invocation to its follow-up action.
    async fn settle(&self, envelope: &Envelope<A>) -> A {
        let ctx = EffectContext::new(self.deps.clone(), envelope.cid, self.name);
        let action = (*envelope.action).clone();
        let follow_up = self
            .effect
            .invoke(action, ctx, self.classify)
            .instrument(tracing::debug_span!(
                "trigger",
                trigger = self.name,
                policy = %self.policy,
                seq = envelope.seq,
                cid = %envelope.cid,
            ))
            .await;
        debug!(
            trigger = self.name,
            seq = envelope.seq,
            follow_up = ?follow_up.tag(),
            "invocation settled"
        );
        follow_up
    }
}

struct Job<A> {
    envelope: Envelope<A>,
    guard: InvocationGuard,
}

/// Pending invocation of a latest-only trigger.
#[derive(Default)]
struct Latest {
    /// Sequence number of the newest matching action on the bus. Updated
    /// at publication, before the router sees the action.
    newest: u64,
    token: Option<CancellationToken>,
}

enum Lane<A> {
    Serialized(mpsc::UnboundedSender<Job<A>>),
    Concurrent,
    LatestOnly(Arc<Mutex<Latest>>),
}

/// Runs the invocations of one trigger under its concurrency policy.
pub(crate) struct TriggerRunner<A: Action, D> {
    core: Arc<TriggerCore<A, D>>,
    inflight: Arc<InflightTracker>,
    lane: Lane<A>,
}

impl<A: Action, D: Send + Sync + 'static> TriggerRunner<A, D> {
    /// Build the runner. Serialized triggers spawn their worker here, so this
    /// must be called from within a tokio runtime.
    pub(crate) fn start(
        effect: Arc<dyn AnyEffect<A, D>>,
        deps: Arc<D>,
        bus: Bus<A>,
        inflight: Arc<InflightTracker>,
        classify: Classifier,
    ) -> Self {
        let core = Arc::new(TriggerCore {
            name: effect.name(),
            policy: effect.policy(),
            effect,
            deps,
            bus,
            classify,
        });

        let lane = match core.policy {
            ConcurrencyPolicy::Serialized => {
                let (tx, rx) = mpsc::unbounded_channel();
                tokio::spawn(serial_worker(core.clone(), rx));
                Lane::Serialized(tx)
            }
            ConcurrencyPolicy::Concurrent => Lane::Concurrent,
            ConcurrencyPolicy::LatestOnly => {
                let latest = Arc::new(Mutex::new(Latest::default()));
                let tags = core.effect.matches();
                let claims = latest.clone();
                core.bus.on_publish(Box::new(move |envelope: &Envelope<A>| {
                    if tags.contains(&envelope.tag()) {
                        lock(&claims).newest = envelope.seq;
                    }
                }));
                Lane::LatestOnly(latest)
            }
        };

        Self {
            core,
            inflight,
            lane,
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        self.core.name
    }

    pub(crate) fn matches(&self) -> MatchTags<A::Tag> {
        self.core.effect.matches()
    }

    /// Hand a matched action to this trigger. Never blocks.
    pub(crate) fn submit(&self, envelope: &Envelope<A>) {
        let guard = self.inflight.begin_invocation(self.core.name);
        let envelope = envelope.clone();
        debug!(
            trigger = self.core.name,
            seq = envelope.seq,
            pending = self.inflight.in_flight(self.core.name),
            "match submitted"
        );

        match &self.lane {
            Lane::Serialized(queue) => {
                if queue.send(Job { envelope, guard }).is_err() {
                    error!(trigger = self.core.name, "serialized worker is gone, match dropped");
                }
            }
            Lane::Concurrent => {
                let core = self.core.clone();
                tokio::spawn(async move {
                    let follow_up = core.settle(&envelope).await;
                    core.bus.publish_caused(follow_up, envelope.cid);
                    drop(guard);
                });
            }
            Lane::LatestOnly(latest) => {
                let token = CancellationToken::new();
                if let Some(previous) = lock(latest).token.replace(token.clone()) {
                    debug!(trigger = self.core.name, "superseding pending invocation");
                    previous.cancel();
                }

                let core = self.core.clone();
                let latest = latest.clone();
                tokio::spawn(async move {
                    let _guard = guard;
                    let follow_up = tokio::select! {
                        biased;
                        _ = token.cancelled() => None,
                        follow_up = core.settle(&envelope) => Some(follow_up),
                    };

                    let Some(follow_up) = follow_up else {
                        debug!(trigger = core.name, seq = envelope.seq, "invocation abandoned");
                        return;
                    };

                    // A newer match may already be published but not yet
                    // routed; `newest` is set at publication, and the check
                    // runs under the bus lock.
                    let published = core.bus.publish_caused_if(follow_up, envelope.cid, || {
                        let mut latest = lock(&latest);
                        if latest.newest != envelope.seq {
                            return false;
                        }
                        latest.token = None;
                        true
                    });
                    if published.is_none() {
                        warn!(
                            trigger = core.name,
                            seq = envelope.seq,
                            "discarding stale settlement"
                        );
                    }
                });
            }
        }
    }
}

async fn serial_worker<A: Action, D: Send + Sync + 'static>(
    core: Arc<TriggerCore<A, D>>,
    mut queue: mpsc::UnboundedReceiver<Job<A>>,
) {
    while let Some(Job { envelope, guard }) = queue.recv().await {
        let follow_up = core.settle(&envelope).await;
        core.bus.publish_caused(follow_up, envelope.cid);
        drop(guard);
    }
    debug!(trigger = core.name, "serialized worker stopped");
}

fn lock(latest: &Mutex<Latest>) -> std::sync::MutexGuard<'_, Latest> {
    match latest.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
