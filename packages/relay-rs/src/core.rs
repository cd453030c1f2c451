//! Core types for the relay action-driven architecture.
//!
//! # Overview
//!
//! Relay has a single kind of message: the [`Action`]. Intents (user input,
//! navigation, lifecycle) and outcomes (success, failure, follow-up intents)
//! are all actions, and they all travel through the same bus.
//!
//! # Correlation
//!
//! Every action published from outside the engine gets a fresh
//! [`CorrelationId`]. Follow-up actions produced by triggers inherit the id of
//! the action that caused them, so one intent and everything it set in motion
//! share an id in the logs.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use uuid::Uuid;

/// An immutable, tagged description of an intent or an outcome.
///
/// Implement this on a closed enum with one variant per tag. The tag is what
/// triggers match on; the variant's fields are the payload.
///
/// # Example
///
/// ```ignore
/// #[derive(Debug, Clone)]
/// enum CounterAction {
///     Increment,
///     Loaded { value: u64 },
/// }
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// enum CounterTag {
///     Increment,
///     Loaded,
/// }
///
/// impl Action for CounterAction {
///     type Tag = CounterTag;
///
///     fn tag(&self) -> CounterTag {
///         match self {
///             CounterAction::Increment => CounterTag::Increment,
///             CounterAction::Loaded { .. } => CounterTag::Loaded,
///         }
///     }
/// }
/// ```
pub trait Action: Clone + fmt::Debug + Send + Sync + 'static {
    /// Discriminant identifying the action's semantic kind and payload shape.
    type Tag: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    /// Returns this action's tag.
    fn tag(&self) -> Self::Tag;
}

/// Correlation ID for tracing an intent and its follow-up actions.
///
/// Use `CorrelationId::NONE` for uncorrelated actions, or `CorrelationId::new()`
/// to generate a fresh ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Sentinel value for uncorrelated actions.
    pub const NONE: Self = Self(Uuid::nil());

    /// Create a new random correlation ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Check if this is the NONE sentinel value.
    pub fn is_none(&self) -> bool {
        self.0.is_nil()
    }

    /// Check if this is a real correlation ID (not NONE).
    pub fn is_some(&self) -> bool {
        !self.is_none()
    }

    /// Get the inner UUID value.
    pub fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for CorrelationId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "NONE")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Envelope wrapping an action with its transport metadata.
///
/// - `seq` is assigned by the bus at publication and strictly increases.
/// - `cid` ties the action to the intent that caused it.
///
/// The action is behind an `Arc` so fan-out to many subscribers never clones
/// the payload.
#[derive(Debug)]
pub struct Envelope<A> {
    /// Publication sequence number.
    pub seq: u64,
    /// Correlation ID of the causal chain.
    pub cid: CorrelationId,
    /// The action itself.
    pub action: Arc<A>,
}

impl<A> Clone for Envelope<A> {
    fn clone(&self) -> Self {
        Self {
            seq: self.seq,
            cid: self.cid,
            action: self.action.clone(),
        }
    }
}

impl<A: Action> Envelope<A> {
    /// Tag of the wrapped action.
    pub fn tag(&self) -> A::Tag {
        self.action.tag()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Ping {
        Ping(u32),
        Pong,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum PingTag {
        Ping,
        Pong,
    }

    impl Action for Ping {
        type Tag = PingTag;

        fn tag(&self) -> PingTag {
            match self {
                Ping::Ping(_) => PingTag::Ping,
                Ping::Pong => PingTag::Pong,
            }
        }
    }

    #[test]
    fn test_correlation_id_none() {
        assert!(CorrelationId::NONE.is_none());
        assert!(CorrelationId::new().is_some());
        assert_eq!(CorrelationId::NONE.to_string(), "NONE");
    }

    #[test]
    fn test_correlation_id_unique() {
        assert_ne!(CorrelationId::new(), CorrelationId::new());
    }

    #[test]
    fn test_envelope_tag_and_clone_share_payload() {
        let envelope = Envelope {
            seq: 7,
            cid: CorrelationId::new(),
            action: Arc::new(Ping::Ping(3)),
        };
        let copy = envelope.clone();

        assert_eq!(copy.tag(), PingTag::Ping);
        assert_eq!(copy.seq, 7);
        assert!(Arc::ptr_eq(&envelope.action, &copy.action));
        assert_ne!(Ping::Pong.tag(), envelope.tag());
    }
}
