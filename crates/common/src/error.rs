//! Error taxonomy shared by the broker, dispatcher, and channel crates.
//!
//! Every error is either *recoverable* (the dispatch loop converts it into a
//! fallback response and keeps going) or *critical* (the worker pool drains
//! and the process stops). [`Error::is_critical`] is the single place that
//! decides which is which.

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A consume found no message within the timeout. Expected whenever a
    /// queue is idle; callers back off and retry.
    #[error("queue is empty")]
    EmptyQueue,

    /// A produce hit a capacity-bounded queue.
    #[error("queue `{queue}` is full")]
    FullQueue { queue: String },

    /// Broker connection, topology, or teardown failure.
    #[error("broker failure: {reason}")]
    Broker { reason: String },

    /// The component resolver was given a name it does not know.
    #[error("component `{name}` not found")]
    ComponentNotFound { name: String },

    /// A chat policy failed to produce a reply.
    #[error("chat policy failure: {reason}")]
    Policy {
        reason: String,
        suggestion: Option<String>,
    },

    /// A renderer or agent cannot handle the given payload variant.
    #[error("unsupported message type: {kind}")]
    UnsupportedMessageType { kind: String },

    /// Settings could not be read or parsed.
    #[error("invalid configuration: {reason}")]
    Config { reason: String },
}

impl Error {
    #[must_use]
    pub fn full_queue(queue: impl Into<String>) -> Self {
        Self::FullQueue {
            queue: queue.into(),
        }
    }

    #[must_use]
    pub fn broker(reason: impl std::fmt::Display) -> Self {
        Self::Broker {
            reason: reason.to_string(),
        }
    }

    #[must_use]
    pub fn component_not_found(name: impl Into<String>) -> Self {
        Self::ComponentNotFound { name: name.into() }
    }

    #[must_use]
    pub fn policy(reason: impl std::fmt::Display) -> Self {
        Self::Policy {
            reason: reason.to_string(),
            suggestion: None,
        }
    }

    #[must_use]
    pub fn policy_with_suggestion(
        reason: impl std::fmt::Display,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Policy {
            reason: reason.to_string(),
            suggestion: Some(suggestion.into()),
        }
    }

    #[must_use]
    pub fn unsupported(kind: impl Into<String>) -> Self {
        Self::UnsupportedMessageType { kind: kind.into() }
    }

    #[must_use]
    pub fn config(reason: impl std::fmt::Display) -> Self {
        Self::Config {
            reason: reason.to_string(),
        }
    }

    /// Whether this error must halt the process (after a graceful drain)
    /// instead of being downgraded to a user-visible fallback response.
    #[must_use]
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Self::Broker { .. } | Self::ComponentNotFound { .. } | Self::Config { .. }
        )
    }

    /// Human-readable cause, suitable for a fallback response `reason`.
    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            Self::Policy { reason, .. } => reason.clone(),
            other => other.to_string(),
        }
    }

    /// Suggestion to show the user alongside the reason, when one exists.
    #[must_use]
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Policy { suggestion, .. } => suggestion.as_deref(),
            _ => None,
        }
    }
}
