//! Error types for the adapter.

use secluded_core::{ApiError, TransportError};
use thiserror::Error;

/// A frame could not be decoded.
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    /// The payload is not JSON, or not shaped like a gateway frame.
    #[error("malformed payload: {reason}")]
    MalformedPayload {
        /// What was wrong with it.
        reason: String,
    },
}

impl DecodeError {
    /// Creates a malformed-payload error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        Self::malformed(err.to_string())
    }
}

/// A decoded frame could not be turned into a domain event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    /// `data[0]` carries no fields at all.
    #[error("metadata segment is empty")]
    EmptyMetadata,

    /// A field the event needs is absent.
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    /// A field is present but is not a scalar.
    #[error("field `{0}` is not a string or number")]
    TypeMismatch(String),
}

/// Errors raised by a [`Session`](crate::session::Session).
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// The transport could not be opened.
    #[error("failed to open transport: {0}")]
    Connect(#[source] TransportError),

    /// The gateway rejected the handshake, or answered it with garbage.
    #[error("handshake rejected: {reason}")]
    Auth {
        /// Why the handshake failed.
        reason: String,
    },

    /// A frame could not be decoded. The session stays usable.
    #[error(transparent)]
    Malformed(#[from] DecodeError),

    /// An outbound frame could not be serialized. The session stays usable.
    #[error("failed to encode frame: {0}")]
    Encode(String),

    /// The transport went away.
    #[error("connection closed: {0}")]
    ConnectionClosed(#[source] TransportError),
}

impl SessionError {
    /// Creates an authentication error.
    pub fn auth(reason: impl Into<String>) -> Self {
        Self::Auth {
            reason: reason.into(),
        }
    }

    /// Returns true if the session must be torn down.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Malformed(_) | Self::Encode(_))
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Connect(e) | SessionError::ConnectionClosed(e) => ApiError::Transport(e),
            SessionError::Encode(e) => ApiError::SerializationError(e),
            other => ApiError::Transport(TransportError::SendFailed(other.to_string())),
        }
    }
}
