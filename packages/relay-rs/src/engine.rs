//! Relay Engine - assembly of bus, triggers, and store.
//!
//! ```text
//! dispatch(intent) ─► Bus ─┬─► Runtime ─► TriggerRunner ─► operation
//!                          │                                   │
//!                          │       follow-up action ◄──────────┘
//!                          │
//!                          └─► Store ─► Reducer ─► watch snapshots
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use relay::EngineBuilder;
//!
//! let engine = EngineBuilder::new(deps)
//!     .with_effect(SearchMoviesEffect)
//!     .with_effect(LoginEffect)
//!     .with_reducer(MovieReducer, MovieState::default())
//!     .with_classifier(classify)
//!     .build();
//!
//! let handle = engine.start();
//!
//! // Fire and forget
//! handle.dispatch(MovieAction::LoadGenres);
//!
//! // Or dispatch and wait for the whole cascade
//! let state = handle.dispatch_and_settle(MovieAction::LoadPopularMovies).await?;
//! ```
//!
//! # Settling
//!
//! The engine is settled when no action is waiting to be routed, no
//! invocation is pending, and the store has applied every published action.
//! Because each invocation publishes its follow-up before it stops being
//! counted, settling waits for entire causal cascades.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bus::{Bus, Subscription};
use crate::core::{Action, CorrelationId};
use crate::effect::Effect;
use crate::error::{Classifier, Failure, RelayError};
use crate::inflight::InflightTracker;
use crate::runtime::Runtime;
use crate::store::{spawn_store, NoopReducer, Reducer, Store};
use crate::trigger::{AnyEffect, TriggerRunner};

/// Default bound on how long `settle` waits.
pub const DEFAULT_SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Engine Builder
// =============================================================================

/// Builder for constructing an [`Engine`].
///
/// # Example
///
/// ```ignore
/// let engine = EngineBuilder::new(my_deps)
///     .with_bus(shared_bus)  // Optional: use existing bus
///     .with_effect(LoadPopularEffect)
///     .with_effect(SearchEffect)
///     .with_reducer(MovieReducer, MovieState::default())
///     .build();
/// ```
pub struct EngineBuilder<A: Action, D, R: Reducer<Action = A> = NoopReducer<A>> {
    deps: Arc<D>,
    bus: Bus<A>,
    effects: Vec<Arc<dyn AnyEffect<A, D>>>,
    names: HashSet<&'static str>,
    reducer: R,
    initial: R::State,
    classify: Classifier,
    settle_timeout: Duration,
}

impl<A: Action, D: Send + Sync + 'static> EngineBuilder<A, D> {
    /// Create a new engine builder with the given dependencies.
    pub fn new(deps: D) -> Self {
        Self::with_arc(Arc::new(deps))
    }

    /// Create a new engine builder with Arc-wrapped dependencies.
    ///
    /// Use this when you need to share the deps with other parts of the system.
    pub fn with_arc(deps: Arc<D>) -> Self {
        Self {
            deps,
            bus: Bus::new(),
            effects: Vec::new(),
            names: HashSet::new(),
            reducer: NoopReducer::default(),
            initial: (),
            classify: Failure::from_error,
            settle_timeout: DEFAULT_SETTLE_TIMEOUT,
        }
    }
}

impl<A, D, R> EngineBuilder<A, D, R>
where
    A: Action,
    D: Send + Sync + 'static,
    R: Reducer<Action = A>,
{
    /// Use an existing bus instead of creating a new one.
    pub fn with_bus(mut self, bus: Bus<A>) -> Self {
        self.bus = bus;
        self
    }

    /// Register a trigger.
    ///
    /// # Panics
    ///
    /// Panics if the trigger matches no tags or its name is already taken.
    /// Use [`try_with_effect`](Self::try_with_effect) for a non-panicking
    /// version.
    pub fn with_effect<E>(self, effect: E) -> Self
    where
        E: Effect<A, D>,
    {
        self.try_with_effect(effect).unwrap_or_else(|e| {
            panic!("{}", e);
        })
    }

    /// Register a trigger, returning an error on a wiring mistake.
    pub fn try_with_effect<E>(mut self, effect: E) -> Result<Self, RelayError>
    where
        E: Effect<A, D>,
    {
        let name = <E as Effect<A, D>>::name(&effect);
        if <E as Effect<A, D>>::matches(&effect).is_empty() {
            return Err(RelayError::NoMatchTags { name });
        }
        if !self.names.insert(name) {
            return Err(RelayError::DuplicateTrigger { name });
        }

        self.effects.push(Arc::new(effect));
        Ok(self)
    }

    /// Replace the operation error classifier.
    ///
    /// Defaults to [`Failure::from_error`].
    pub fn with_classifier(mut self, classify: Classifier) -> Self {
        self.classify = classify;
        self
    }

    /// Bound on how long [`EngineHandle::settle`] waits.
    pub fn with_settle_timeout(mut self, timeout: Duration) -> Self {
        self.settle_timeout = timeout;
        self
    }

    /// Attach the reducer that folds every action into state.
    pub fn with_reducer<R2>(self, reducer: R2, initial: R2::State) -> EngineBuilder<A, D, R2>
    where
        R2: Reducer<Action = A>,
    {
        EngineBuilder {
            deps: self.deps,
            bus: self.bus,
            effects: self.effects,
            names: self.names,
            reducer,
            initial,
            classify: self.classify,
            settle_timeout: self.settle_timeout,
        }
    }

    /// Build the engine.
    pub fn build(self) -> Engine<A, D, R> {
        Engine {
            deps: self.deps,
            bus: self.bus,
            effects: self.effects,
            reducer: self.reducer,
            initial: self.initial,
            classify: self.classify,
            settle_timeout: self.settle_timeout,
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

/// A configured, not yet running engine.
pub struct Engine<A: Action, D, R: Reducer<Action = A>> {
    deps: Arc<D>,
    bus: Bus<A>,
    effects: Vec<Arc<dyn AnyEffect<A, D>>>,
    reducer: R,
    initial: R::State,
    classify: Classifier,
    settle_timeout: Duration,
}

impl<A, D, R> Engine<A, D, R>
where
    A: Action,
    D: Send + Sync + 'static,
    R: Reducer<Action = A>,
{
    /// The bus this engine will run on.
    pub fn bus(&self) -> &Bus<A> {
        &self.bus
    }

    /// Start the engine in the background.
    ///
    /// Must be called from within a tokio runtime. Both subscriptions are
    /// taken before this returns, so nothing dispatched afterwards is missed.
    pub fn start(self) -> EngineHandle<A, R::State> {
        let inflight = Arc::new(InflightTracker::new());

        let (store_subscription, baseline) = self.bus.subscribe_after();
        let routing = self.bus.subscribe_counted(inflight.clone());

        let (store, store_task) = spawn_store(self.reducer, self.initial, store_subscription, baseline);

        let runners: Vec<_> = self
            .effects
            .into_iter()
            .map(|effect| {
                let runner = TriggerRunner::start(
                    effect,
                    self.deps.clone(),
                    self.bus.clone(),
                    inflight.clone(),
                    self.classify,
                );
                debug!(trigger = runner.name(), "trigger registered");
                runner
            })
            .collect();

        info!(triggers = runners.len(), "starting relay engine");
        let runtime = tokio::spawn(Runtime::new(runners, inflight.clone()).run(routing));

        EngineHandle {
            bus: self.bus,
            inflight,
            store,
            settle_timeout: self.settle_timeout,
            runtime,
            store_task,
        }
    }
}

impl<A: Action, D, R: Reducer<Action = A>> std::fmt::Debug for Engine<A, D, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("triggers", &self.effects.len())
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Engine Handle
// =============================================================================

/// Handle to a running engine.
///
/// # Fire-and-Forget vs Settle
///
/// - `dispatch()`: returns immediately; triggers run in the background.
/// - `dispatch_and_settle()`: waits until the whole cascade caused by the
///   action (and anything else in flight) has run out, then returns the state.
pub struct EngineHandle<A: Action, S> {
    bus: Bus<A>,
    inflight: Arc<InflightTracker>,
    store: Store<S>,
    settle_timeout: Duration,
    runtime: JoinHandle<()>,
    store_task: JoinHandle<()>,
}

impl<A: Action, S: Clone + Send + Sync + 'static> EngineHandle<A, S> {
    /// The bus the engine runs on.
    pub fn bus(&self) -> &Bus<A> {
        &self.bus
    }

    pub(crate) fn inflight(&self) -> &Arc<InflightTracker> {
        &self.inflight
    }

    /// Publish an intent. Returns the correlation ID of the cascade it starts.
    pub fn dispatch(&self, action: A) -> CorrelationId {
        let cid = CorrelationId::new();
        self.bus.publish_caused(action, cid);
        cid
    }

    /// Publish an intent and wait for the engine to settle.
    ///
    /// Uses the engine's settle timeout (30 seconds unless configured).
    pub async fn dispatch_and_settle(&self, action: A) -> Result<S, RelayError> {
        self.dispatch(action);
        self.settle().await
    }

    /// Wait until nothing is pending and every action has been applied.
    pub async fn settle(&self) -> Result<S, RelayError> {
        self.settle_timeout(self.settle_timeout).await
    }

    /// [`settle`](Self::settle) with an explicit timeout.
    pub async fn settle_timeout(&self, timeout: Duration) -> Result<S, RelayError> {
        if self.runtime.is_finished() || self.store_task.is_finished() {
            return Err(RelayError::Stopped);
        }

        let idle = async {
            self.inflight.wait_idle().await;
            self.store.caught_up(self.bus.last_seq()).await
        };

        match tokio::time::timeout(timeout, idle).await {
            Ok(true) => Ok(self.store.snapshot()),
            Ok(false) => Err(RelayError::Stopped),
            Err(_) => {
                warn!(
                    pending = self.inflight.pending(),
                    applied = self.store.applied(),
                    published = self.bus.last_seq(),
                    "engine did not settle in time"
                );
                Err(RelayError::Timeout { duration: timeout })
            }
        }
    }

    /// Subscribe to every action published from now on.
    pub fn subscribe(&self) -> Subscription<A> {
        self.bus.subscribe()
    }

    /// Current state snapshot.
    pub fn state(&self) -> S {
        self.store.snapshot()
    }

    /// A receiver notified on every state change.
    pub fn watch_state(&self) -> watch::Receiver<S> {
        self.store.watch()
    }

    /// Abort the engine's background tasks.
    ///
    /// Call this during test teardown. Invocations already running finish on
    /// their own, but nothing new is routed or applied.
    pub fn abort(&self) {
        self.runtime.abort();
        self.store_task.abort();
    }
}

impl<A: Action, S> std::fmt::Debug for EngineHandle<A, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("inflight", &self.inflight)
            .field("settle_timeout", &self.settle_timeout)
            .finish_non_exhaustive()
    }
}
