//! Transport contracts.
//!
//! A [`Connector`] opens a [`Connection`], which is split into a write half
//! ([`FrameSink`]) and a read half ([`FrameSource`]). The split lets the
//! receive loop own the read half exclusively while any number of senders
//! share the write half behind a lock.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TransportResult;

/// Write half of a connection.
#[async_trait]
pub trait FrameSink: Send + Sync {
    /// Transmits one text frame.
    async fn send_text(&mut self, text: String) -> TransportResult<()>;

    /// Closes the connection.
    async fn close(&mut self) -> TransportResult<()>;
}

/// Read half of a connection.
#[async_trait]
pub trait FrameSource: Send {
    /// Waits for the next data frame.
    ///
    /// Control frames are handled internally. Returns
    /// [`TransportError::ConnectionClosed`](crate::TransportError::ConnectionClosed)
    /// once the peer goes away.
    async fn next_frame(&mut self) -> TransportResult<Vec<u8>>;
}

/// An open connection, split into halves.
pub struct Connection {
    /// The URL the connection was opened against.
    pub url: String,
    /// Write half.
    pub sink: Box<dyn FrameSink>,
    /// Read half.
    pub source: Box<dyn FrameSource>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection").field("url", &self.url).finish()
    }
}

/// Opens connections to a gateway.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connects to `url`.
    async fn connect(&self, url: &str) -> TransportResult<Connection>;
}

/// A shared connector.
pub type BoxedConnector = Arc<dyn Connector>;
