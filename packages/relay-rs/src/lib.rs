//! # Relay
//!
//! An action-driven effect orchestrator: triggers react to actions, run
//! asynchronous operations, and every outcome returns to the bus as an
//! action.
//!
//! ## Core Concepts
//!
//! - An [`Action`] is a value describing something requested or something
//!   that happened. The domain defines one closed enum of them.
//! - The [`Bus`] carries every action, in one total order, to every
//!   subscriber. Nothing is dropped and nothing blocks.
//! - An [`Effect`] is a trigger rule: match tags, a [`ConcurrencyPolicy`],
//!   an operation, and two translators turning the settlement into exactly
//!   one follow-up action.
//! - A [`Reducer`] folds actions into state. Failures are ordinary actions,
//!   so they are ordinary state transitions.
//!
//! ## Architecture
//!
//! ```text
//! UI / route entry
//!     │
//!     ▼ dispatch()
//! Bus ──────────────────────────────────────────────┐
//!     │                                             │
//!     ├─► Store ─► Reducer ─► state snapshots       │
//!     │                                             │
//!     └─► Runtime (routes by tag)                   │
//!             │                                     │
//!             ├─► Serialized  ─┐                    │
//!             ├─► Concurrent  ─┼─► operation        │
//!             └─► LatestOnly  ─┘       │            │
//!                                      ▼            │
//!                         on_success / on_failure   │
//!                                      │            │
//!                                      └────────────┘
//! ```
//!
//! ## Key Invariants
//!
//! 1. **One settlement = one action** - every invocation publishes exactly
//!    one follow-up, unless a latest-only trigger superseded it
//! 2. **Return, don't publish** - operations only reach the bus through
//!    their return value
//! 3. **No raw errors on the bus** - operation errors become a [`Failure`]
//! 4. **Causality** - a follow-up is published after its cause and carries
//!    the cause's [`CorrelationId`]
//!
//! ## Guarantees
//!
//! - **Lossless**: every subscriber sees every action published after it
//!   subscribed
//! - **In-memory only**: actions are not persisted
//! - **No replay**: late subscribers start from the present
//!
//! ## Example
//!
//! ```ignore
//! use relay::{async_trait, smallvec, ConcurrencyPolicy, Effect, EffectContext, EngineBuilder};
//!
//! struct LoadGenres;
//!
//! #[async_trait]
//! impl Effect<MovieAction, ClientDeps> for LoadGenres {
//!     type Output = Vec<Genre>;
//!
//!     fn name(&self) -> &'static str { "load_genres" }
//!     fn matches(&self) -> MatchTags<ActionTag> { smallvec![ActionTag::LoadGenres] }
//!     fn policy(&self) -> ConcurrencyPolicy { ConcurrencyPolicy::Concurrent }
//!
//!     async fn run(&self, _: MovieAction, ctx: EffectContext<ClientDeps>) -> Result<Vec<Genre>> {
//!         ctx.deps().movies.genres().await
//!     }
//!
//!     fn on_success(&self, genres: Vec<Genre>) -> MovieAction {
//!         MovieAction::LoadGenresSuccess { genres }
//!     }
//!
//!     fn on_failure(&self, error: Failure) -> MovieAction {
//!         MovieAction::LoadGenresFailure { error }
//!     }
//! }
//!
//! let handle = EngineBuilder::new(deps)
//!     .with_effect(LoadGenres)
//!     .with_reducer(MovieReducer, MovieState::default())
//!     .build()
//!     .start();
//!
//! let state = handle.dispatch_and_settle(MovieAction::LoadGenres).await?;
//! ```

// Core modules
mod bus;
mod core;
mod effect;
mod engine;
mod error;
mod inflight;
mod runtime;
mod store;
mod trigger;

// Testing utilities (feature-gated)
#[cfg(any(test, feature = "testing"))]
pub mod testing;


// Re-export core types
pub use crate::core::{Action, CorrelationId, Envelope};

// Re-export bus types
pub use bus::{Bus, Subscription};

// Re-export effect types
pub use effect::{ConcurrencyPolicy, Effect, EffectContext, MatchTags};

// Re-export error types
pub use crate::error::{Categorizable, Classifier, Failure, FailureKind, RelayError};

// Re-export inflight tracking
pub use inflight::{InflightTracker, InvocationGuard};

// Re-export store types
pub use store::{NoopReducer, Reducer, Store};

// Re-export engine types (primary entry point)
pub use engine::{Engine, EngineBuilder, EngineHandle, DEFAULT_SETTLE_TIMEOUT};

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use smallvec::smallvec;
