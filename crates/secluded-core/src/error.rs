//! Unified error types for the bridge core.

use thiserror::Error;

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors that can occur in transport operations.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {url} - {reason}")]
    ConnectionFailed {
        /// The URL that failed to connect.
        url: String,
        /// Reason for failure.
        reason: String,
    },

    /// Connection closed.
    #[error("connection closed: {reason}")]
    ConnectionClosed {
        /// Reason for closure.
        reason: String,
    },

    /// Message send failed.
    #[error("failed to send message: {0}")]
    SendFailed(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl TransportError {
    /// Creates a connection-closed error.
    pub fn closed(reason: impl Into<String>) -> Self {
        Self::ConnectionClosed {
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// =============================================================================
// API Errors
// =============================================================================

/// Error type for outbound API calls made through a [`Bot`](crate::Bot).
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The event does not carry what is needed to address a reply.
    #[error("missing session info")]
    MissingSession,
    /// Failed to serialize the outbound frame.
    #[error("serialization error: {0}")]
    SerializationError(String),
    /// Transport error.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for API calls.
pub type ApiResult<T> = Result<T, ApiError>;
