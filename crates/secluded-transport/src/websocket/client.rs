//! WebSocket client connector.

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace};

use secluded_core::{
    Connection, Connector, FrameSink, FrameSource, TransportError, TransportResult,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Opens websocket client connections.
///
/// No read or write timeouts are applied beyond what the socket provides;
/// liveness is detected from close frames and transport errors only.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl WsConnector {
    /// Creates a new websocket connector.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> TransportResult<Connection> {
        info!(url = %url, "Connecting to WebSocket server");

        let (ws_stream, _response) =
            connect_async(url)
                .await
                .map_err(|e| TransportError::ConnectionFailed {
                    url: url.to_string(),
                    reason: format!("WebSocket connection failed: {e}"),
                })?;
        let (ws_tx, ws_rx) = ws_stream.split();

        debug!(url = %url, "WebSocket client connected");

        Ok(Connection {
            url: url.to_string(),
            sink: Box::new(WsFrameSink { inner: ws_tx }),
            source: Box::new(WsFrameSource { inner: ws_rx }),
        })
    }
}

struct WsFrameSink {
    inner: WsSink,
}

#[async_trait]
impl FrameSink for WsFrameSink {
    async fn send_text(&mut self, text: String) -> TransportResult<()> {
        trace!(len = text.len(), "Sending text frame");
        self.inner
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| match e {
                tokio_tungstenite::tungstenite::Error::ConnectionClosed
                | tokio_tungstenite::tungstenite::Error::AlreadyClosed => {
                    TransportError::closed(e.to_string())
                }
                other => TransportError::SendFailed(other.to_string()),
            })
    }

    async fn close(&mut self) -> TransportResult<()> {
        self.inner
            .close()
            .await
            .map_err(|e| TransportError::closed(e.to_string()))
    }
}

struct WsFrameSource {
    inner: WsSource,
}

#[async_trait]
impl FrameSource for WsFrameSource {
    async fn next_frame(&mut self) -> TransportResult<Vec<u8>> {
        loop {
            match self.inner.next().await {
                Some(Ok(Message::Text(text))) => {
                    trace!(len = text.len(), "Received text");
                    return Ok(text.as_bytes().to_vec());
                }
                Some(Ok(Message::Binary(data))) => {
                    trace!(len = data.len(), "Received binary");
                    return Ok(data.to_vec());
                }
                // tungstenite queues the pong reply itself
                Some(Ok(Message::Ping(_))) => trace!("Received ping"),
                Some(Ok(Message::Pong(_))) => trace!("Received pong"),
                Some(Ok(Message::Close(frame))) => {
                    info!(frame = ?frame, "Server closed connection");
                    return Err(TransportError::closed("server sent close frame"));
                }
                Some(Ok(Message::Frame(_))) => {}
                Some(Err(e)) => return Err(TransportError::closed(e.to_string())),
                None => return Err(TransportError::closed("stream ended")),
            }
        }
    }
}
