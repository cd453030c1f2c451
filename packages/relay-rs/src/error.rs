//! Structured failures and engine errors.
//!
//! # The Error Boundary Rule
//!
//! > **No `anyhow::Error` ever crosses the bus.**
//!
//! - `anyhow` is internal transport (ergonomic inside operations)
//! - [`Failure`] is the only externalized error: a kind plus a message,
//!   carried by the domain's failure actions
//!
//! The runtime converts every operation error into a `Failure` with the
//! engine's [`Classifier`] before handing it to the trigger's
//! `on_failure` translator.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Coarse category of an operation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The provider could not be reached.
    Network,
    /// The provider rejected the credentials or session.
    Unauthorized,
    /// The requested resource does not exist.
    NotFound,
    /// The provider is throttling requests.
    RateLimited,
    /// The provider answered with something we could not understand.
    InvalidResponse,
    /// A navigation side effect failed.
    Navigation,
    /// Anything else, including panicking operations.
    Internal,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Network => write!(f, "network_error"),
            FailureKind::Unauthorized => write!(f, "unauthorized"),
            FailureKind::NotFound => write!(f, "not_found"),
            FailureKind::RateLimited => write!(f, "rate_limited"),
            FailureKind::InvalidResponse => write!(f, "invalid_response"),
            FailureKind::Navigation => write!(f, "navigation_error"),
            FailureKind::Internal => write!(f, "internal_error"),
        }
    }
}

/// Errors that know their own [`FailureKind`].
///
/// Implement this on provider error types so a classifier can turn them into
/// a [`Failure`] with [`Failure::from_categorizable`].
pub trait Categorizable: std::error::Error {
    /// The failure category.
    fn kind(&self) -> FailureKind;

    /// The message carried by the failure action.
    ///
    /// Defaults to the error's `Display` output.
    fn message(&self) -> String {
        self.to_string()
    }
}

/// The payload of every failure action.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{kind}: {message}")]
pub struct Failure {
    /// What went wrong, coarsely.
    pub kind: FailureKind,
    /// Human-readable explanation, suitable for display.
    pub message: String,
}

impl Failure {
    /// Create a failure of the given kind.
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for an `Internal` failure.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Internal, message)
    }

    /// Build a failure from a categorizable error.
    pub fn from_categorizable<E: Categorizable + ?Sized>(error: &E) -> Self {
        Self::new(error.kind(), error.message())
    }

    /// Default classification of an operation error.
    ///
    /// If a `Failure` is anywhere in the error chain it is returned as-is.
    /// Otherwise the result is `Internal` carrying the top-level message.
    pub fn from_error(error: &anyhow::Error) -> Self {
        error
            .chain()
            .find_map(|cause| cause.downcast_ref::<Failure>())
            .cloned()
            .unwrap_or_else(|| Self::internal(error.to_string()))
    }
}

/// Maps an operation error to the failure carried by the failure action.
pub type Classifier = fn(&anyhow::Error) -> Failure;

/// Engine-level errors: wiring mistakes and quiescence timeouts.
///
/// These never travel on the bus.
#[derive(Debug, Error)]
pub enum RelayError {
    /// A trigger was registered with an empty match set.
    #[error("trigger '{name}' matches no action tags")]
    NoMatchTags {
        /// Trigger name.
        name: &'static str,
    },

    /// Two triggers were registered under the same name.
    #[error("trigger '{name}' is already registered")]
    DuplicateTrigger {
        /// Trigger name.
        name: &'static str,
    },

    /// Waiting for the engine to go idle took too long.
    #[error("engine did not settle within {duration:?}")]
    Timeout {
        /// How long we waited.
        duration: Duration,
    },

    /// The engine's background task has stopped.
    #[error("engine is not running")]
    Stopped,
}
