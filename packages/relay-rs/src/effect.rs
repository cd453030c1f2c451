//! Effect trait and context for trigger operations.
//!
//! An effect is a trigger rule: the set of action tags it reacts to, the
//! concurrency policy governing overlapping invocations, the asynchronous
//! operation, and the two translators that turn the settled result into
//! exactly one follow-up action.
//!
//! # Key Properties
//!
//! - **One settlement = one action**: `on_success` or `on_failure`, never both
//! - **Stateless**: the matched action carries all the data an invocation needs
//! - **Return, don't publish**: operations cannot reach the bus directly

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use smallvec::SmallVec;

use crate::core::{Action, CorrelationId};
use crate::error::Failure;

/// How a trigger treats a new match while an earlier invocation is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConcurrencyPolicy {
    /// Queue matches and run them one at a time in arrival order.
    Serialized,
    /// Start every match immediately; outcomes arrive in any order.
    Concurrent,
    /// Abandon the pending invocation and start the new one; a superseded
    /// invocation never publishes.
    LatestOnly,
}

impl fmt::Display for ConcurrencyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConcurrencyPolicy::Serialized => write!(f, "serialized"),
            ConcurrencyPolicy::Concurrent => write!(f, "concurrent"),
            ConcurrencyPolicy::LatestOnly => write!(f, "latest_only"),
        }
    }
}

/// Match set of a trigger. Most triggers match one or two tags.
pub type MatchTags<T> = SmallVec<[T; 4]>;

/// Context passed to effect operations.
///
/// `EffectContext` is immutable and cheap to clone. It intentionally offers
/// no way to publish: the operation's return value is the only path back to
/// the bus.
pub struct EffectContext<D> {
    deps: Arc<D>,
    cid: CorrelationId,
    trigger: &'static str,
}

impl<D> EffectContext<D> {
    /// Create a context for one invocation.
    pub fn new(deps: Arc<D>, cid: CorrelationId, trigger: &'static str) -> Self {
        Self { deps, cid, trigger }
    }

    /// Shared dependencies (provider clients, session store, navigator).
    pub fn deps(&self) -> &D {
        &self.deps
    }

    /// Correlation ID of the action that triggered this invocation.
    pub fn correlation_id(&self) -> CorrelationId {
        self.cid
    }

    /// Name of the trigger running this invocation.
    pub fn trigger(&self) -> &'static str {
        self.trigger
    }
}

impl<D> Clone for EffectContext<D> {
    fn clone(&self) -> Self {
        Self {
            deps: self.deps.clone(),
            cid: self.cid,
            trigger: self.trigger,
        }
    }
}

impl<D> fmt::Debug for EffectContext<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectContext")
            .field("cid", &self.cid)
            .field("trigger", &self.trigger)
            .finish_non_exhaustive()
    }
}

/// A trigger rule binding action tags to an operation and a policy.
///
/// # Example
///
/// ```ignore
/// struct SearchEffect;
///
/// #[async_trait]
/// impl Effect<MovieAction, ClientDeps> for SearchEffect {
///     type Output = Vec<Movie>;
///
///     fn name(&self) -> &'static str {
///         "search_movies"
///     }
///
///     fn matches(&self) -> MatchTags<ActionTag> {
///         smallvec![ActionTag::SearchMovies]
///     }
///
///     fn policy(&self) -> ConcurrencyPolicy {
///         ConcurrencyPolicy::LatestOnly
///     }
///
///     async fn run(&self, action: MovieAction, ctx: EffectContext<ClientDeps>) -> Result<Vec<Movie>> {
///         let MovieAction::SearchMovies { query } = action else { unreachable!() };
///         ctx.deps().movies.search(&query).await
///     }
///
///     fn on_success(&self, movies: Vec<Movie>) -> MovieAction {
///         MovieAction::SearchMoviesSuccess { movies }
///     }
///
///     fn on_failure(&self, error: Failure) -> MovieAction {
///         MovieAction::SearchMoviesFailure { error }
///     }
/// }
/// ```
#[async_trait]
pub trait Effect<A: Action, D>: Send + Sync + 'static {
    /// Value produced by a successful operation.
    type Output: Send + 'static;

    /// Unique trigger name, used in logs and inflight counters.
    fn name(&self) -> &'static str;

    /// The action tags this trigger reacts to.
    fn matches(&self) -> MatchTags<A::Tag>;

    /// The single policy governing all invocations of this trigger.
    fn policy(&self) -> ConcurrencyPolicy;

    /// The asynchronous operation.
    ///
    /// May be a short pipeline of dependent steps; the first failing step
    /// should be returned as the operation's error.
    async fn run(&self, action: A, ctx: EffectContext<D>) -> Result<Self::Output>;

    /// Translate a successful settlement into the follow-up action.
    fn on_success(&self, output: Self::Output) -> A;

    /// Translate a failed settlement into the follow-up action.
    fn on_failure(&self, failure: Failure) -> A;
}
