//! Connection session.
//!
//! A [`Session`] owns one transport connection through its lifecycle:
//!
//! ```text
//! Connecting ─▶ Authenticating ─▶ Discovering ─▶ Streaming ─▶ Closed
//!    open()      authenticate()   discover_account_id()  receive()*   close()
//! ```
//!
//! The read half stays inside the `Session`, owned by the receive loop. The
//! write half lives in a shared [`SessionLink`] which the supervisor
//! publishes through a [`SessionSlot`] so that any task can send.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};

use secluded_core::{Connector, FrameSink, FrameSource, TransportResult};

use crate::codec;
use crate::config::SecludedConfig;
use crate::error::SessionError;
use crate::model::wire::{InboundCommand, InboundFrame, OutboundFrame, keys};

/// The fixed retry interval shared by reconnects and queued sends.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// How often a send re-checks for a connection while none is attached.
pub const SEND_POLL_INTERVAL: Duration = RETRY_INTERVAL;

/// Plugin identity presented in the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub plugin_id: String,
    pub plugin_name: String,
    pub token: String,
}

impl From<&SecludedConfig> for Credentials {
    fn from(config: &SecludedConfig) -> Self {
        Self {
            plugin_id: config.plugin_id.clone(),
            plugin_name: config.plugin_name.clone(),
            token: config.token.clone(),
        }
    }
}

/// Lifecycle state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Authenticating,
    Discovering,
    Streaming,
    Closed,
}

/// Result of [`Session::discover_account_id`].
#[derive(Debug, Clone)]
pub struct Discovery {
    /// The account the gateway is logged in as.
    pub account_id: String,
    /// The discovery frame itself, when it also carries a sender and must
    /// be delivered like any other.
    pub pending: Option<InboundFrame>,
}

// ============================================================================
// SessionLink
// ============================================================================

/// The write half of a session, shareable across tasks.
pub struct SessionLink {
    sink: Mutex<Box<dyn FrameSink>>,
    seq: AtomicU64,
    account_id: OnceLock<String>,
}

impl SessionLink {
    fn new(sink: Box<dyn FrameSink>) -> Self {
        Self {
            sink: Mutex::new(sink),
            seq: AtomicU64::new(1),
            account_id: OnceLock::new(),
        }
    }

    /// Stamps the next sequence number on `frame` and transmits it.
    ///
    /// Returns the sequence number used. Numbers start at 1 and grow by one
    /// per frame sent over this link.
    pub async fn send(&self, mut frame: OutboundFrame) -> Result<u64, SessionError> {
        let mut sink = self.sink.lock().await;

        let seq = self.seq.load(Ordering::SeqCst);
        frame.seq = seq;
        let text = serde_json::to_string(&frame).map_err(|e| SessionError::Encode(e.to_string()))?;
        self.seq.store(seq + 1, Ordering::SeqCst);

        trace!(seq, cmd = ?frame.cmd, "Sending frame");
        sink.send_text(text)
            .await
            .map_err(SessionError::ConnectionClosed)?;
        Ok(seq)
    }

    /// The sequence number the next frame will carry.
    pub fn next_seq(&self) -> u64 {
        self.seq.load(Ordering::SeqCst)
    }

    /// The resolved account id, once discovery has finished.
    pub fn account_id(&self) -> Option<&str> {
        self.account_id.get().map(String::as_str)
    }

    async fn close(&self) -> TransportResult<()> {
        self.sink.lock().await.close().await
    }
}

impl std::fmt::Debug for SessionLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLink")
            .field("next_seq", &self.next_seq())
            .field("account_id", &self.account_id())
            .finish()
    }
}

// ============================================================================
// Session
// ============================================================================

/// One connection to the gateway.
pub struct Session {
    link: Arc<SessionLink>,
    source: Box<dyn FrameSource>,
    state: SessionState,
    url: String,
}

impl Session {
    /// Opens a transport to `url`.
    pub async fn open(connector: &dyn Connector, url: &str) -> Result<Self, SessionError> {
        trace!(url, "Connecting");
        let connection = connector.connect(url).await.map_err(SessionError::Connect)?;
        info!(url = %connection.url, "Connected, sending handshake");

        Ok(Self {
            link: Arc::new(SessionLink::new(connection.sink)),
            source: connection.source,
            state: SessionState::Authenticating,
            url: connection.url,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// The shareable write half.
    pub fn link(&self) -> &Arc<SessionLink> {
        &self.link
    }

    /// The resolved account id, once discovery has finished.
    pub fn account_id(&self) -> Option<&str> {
        self.link.account_id()
    }

    /// Performs the handshake.
    ///
    /// Sends the credentials and reads exactly one frame back. Anything but
    /// a `Response` with `status: true` fails with [`SessionError::Auth`].
    pub async fn authenticate(&mut self, credentials: &Credentials) -> Result<(), SessionError> {
        let handshake = codec::encode_handshake(
            &credentials.plugin_id,
            &credentials.plugin_name,
            &credentials.token,
            0,
        );
        let seq = self.link.send(handshake).await?;
        debug!(seq, plugin_id = %credentials.plugin_id, "Handshake sent");

        let raw = self.next_raw().await?;
        let response = codec::decode_response(&raw)
            .map_err(|e| SessionError::auth(format!("unreadable handshake response: {e}")))?;

        match response.status() {
            Some(true) => {
                info!("Handshake accepted");
                self.state = SessionState::Discovering;
                Ok(())
            }
            Some(false) => Err(SessionError::auth("gateway answered with status false")),
            None => Err(SessionError::auth("handshake response carries no status")),
        }
    }

    /// Reads frames until one reveals the account id.
    ///
    /// Frames that are not pushed messages, or whose metadata has no
    /// `Account`, are dropped. If the discovery frame also has a sender it
    /// is returned in [`Discovery::pending`] for normal delivery.
    pub async fn discover_account_id(&mut self) -> Result<Discovery, SessionError> {
        info!("Waiting for account id");
        loop {
            let frame = match self.next_frame().await {
                Ok(frame) => frame,
                Err(SessionError::Malformed(_)) => continue,
                Err(e) => return Err(e),
            };
            if frame.cmd() != InboundCommand::PushMessage {
                trace!(seq = frame.seq(), "Ignoring non-push frame during discovery");
                continue;
            }
            let Some(account_id) = frame.meta_string(keys::ACCOUNT) else {
                trace!(seq = frame.seq(), "Ignoring frame without account during discovery");
                continue;
            };

            if let Err(rejected) = self.link.account_id.set(account_id) {
                debug!(account_id = %rejected, "Account id already resolved, keeping the first");
            }
            let account_id = self.account_id().unwrap_or_default().to_owned();
            self.state = SessionState::Streaming;
            info!(account_id = %account_id, "Account id resolved");

            let pending = frame.has_meta(keys::UIN).then_some(frame);
            return Ok(Discovery {
                account_id,
                pending,
            });
        }
    }

    /// Waits for the next frame that has a sender.
    ///
    /// Frames without `Uin` in their metadata are consumed silently. An
    /// undecodable frame yields [`SessionError::Malformed`]; the session
    /// remains usable after it.
    pub async fn receive(&mut self) -> Result<InboundFrame, SessionError> {
        loop {
            let frame = self.next_frame().await?;
            if frame.has_meta(keys::UIN) {
                trace!(seq = frame.seq(), "Received frame");
                return Ok(frame);
            }
            trace!(seq = frame.seq(), "Dropping frame without sender");
        }
    }

    /// Closes the transport. Failures are logged and otherwise ignored.
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closed;
        if let Err(e) = self.link.close().await {
            debug!(error = %e, "Error while closing transport");
        }
    }

    async fn next_raw(&mut self) -> Result<Vec<u8>, SessionError> {
        self.source
            .next_frame()
            .await
            .map_err(SessionError::ConnectionClosed)
    }

    /// Next segment-list frame. Acknowledgements are skipped.
    async fn next_frame(&mut self) -> Result<InboundFrame, SessionError> {
        loop {
            let raw = self.next_raw().await?;
            let err = match codec::decode_frame(&raw) {
                Ok(frame) => return Ok(frame),
                Err(err) => err,
            };
            if let Ok(ack) = codec::decode_response(&raw) {
                debug!(seq = ack.seq, "Gateway acknowledged frame");
                continue;
            }
            warn!(error = %err, raw = %String::from_utf8_lossy(&raw), "Dropping malformed frame");
            return Err(err.into());
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("url", &self.url)
            .field("state", &self.state)
            .field("link", &self.link)
            .finish()
    }
}

// ============================================================================
// SessionSlot
// ============================================================================

/// Where the current session's link is published.
///
/// The supervisor attaches and clears it; senders only read it.
#[derive(Clone, Default)]
pub struct SessionSlot {
    inner: Arc<RwLock<Option<Arc<SessionLink>>>>,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, link: Arc<SessionLink>) {
        *self.inner.write() = Some(link);
    }

    pub fn clear(&self) {
        self.inner.write().take();
    }

    /// The attached link, if any.
    pub fn current(&self) -> Option<Arc<SessionLink>> {
        self.inner.read().clone()
    }

    pub fn is_attached(&self) -> bool {
        self.inner.read().is_some()
    }

    /// Waits until a link is attached, checking every
    /// [`SEND_POLL_INTERVAL`].
    pub async fn wait(&self) -> Arc<SessionLink> {
        loop {
            if let Some(link) = self.current() {
                return link;
            }
            debug!(
                retry_in_secs = SEND_POLL_INTERVAL.as_secs(),
                "No connection attached, holding outbound frame"
            );
            tokio::time::sleep(SEND_POLL_INTERVAL).await;
        }
    }

    /// Sends `frame` on the attached link, waiting for one if necessary.
    pub async fn send(&self, frame: OutboundFrame) -> Result<u64, SessionError> {
        self.wait().await.send(frame).await
    }
}

impl std::fmt::Debug for SessionSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSlot")
            .field("attached", &self.is_attached())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedConnector, account_frame, auth_response, push_frame, text_frame};
    use serde_json::json;
    use tokio::time::Instant;

    fn credentials() -> Credentials {
        Credentials::from(&SecludedConfig::new("ws://scripted", "secret"))
    }

    fn message(text: &str) -> OutboundFrame {
        codec::encode_outbound_message("10001", None, None, &text.into())
    }

    #[tokio::test]
    async fn test_open_refused() {
        let connector = ScriptedConnector::new();
        connector.refuse();

        let err = Session::open(connector.as_ref(), "ws://scripted").await.unwrap_err();
        assert!(matches!(err, SessionError::Connect(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_handshake_accepted() {
        let connector = ScriptedConnector::new();
        let mut peer = connector.accept();
        peer.push(auth_response(true));

        let mut session = Session::open(connector.as_ref(), "ws://scripted").await.unwrap();
        assert_eq!(session.state(), SessionState::Authenticating);
        session.authenticate(&credentials()).await.unwrap();
        assert_eq!(session.state(), SessionState::Discovering);

        assert_eq!(
            peer.next_sent().await,
            json!({
                "seq": 1,
                "cmd": "SyncOicq",
                "rsp": true,
                "data": {"pid": "nonebot", "name": "nonebot", "token": "secret"}
            })
        );
        assert_eq!(session.link().next_seq(), 2);
    }

    #[tokio::test]
    async fn test_handshake_rejected() {
        let connector = ScriptedConnector::new();
        let peer = connector.accept();
        peer.push(auth_response(false));

        let mut session = Session::open(connector.as_ref(), "ws://scripted").await.unwrap();
        let err = session.authenticate(&credentials()).await.unwrap_err();
        assert!(matches!(err, SessionError::Auth { .. }));
    }

    #[tokio::test]
    async fn test_handshake_garbage_is_auth_error() {
        let connector = ScriptedConnector::new();
        let peer = connector.accept();
        peer.push_raw(b"definitely not json");

        let mut session = Session::open(connector.as_ref(), "ws://scripted").await.unwrap();
        let err = session.authenticate(&credentials()).await.unwrap_err();
        assert!(matches!(err, SessionError::Auth { .. }));
    }

    #[tokio::test]
    async fn test_discovery_skips_until_account() {
        let connector = ScriptedConnector::new();
        let peer = connector.accept();
        peer.push(auth_response(true));
        peer.push_raw(b"{ broken");
        peer.push(json!({"cmd": "Response", "data": {"status": true}}));
        peer.push(push_frame(json!([{"Heartbeat": "Heartbeat"}])));
        peer.push(account_frame("10001"));

        let mut session = Session::open(connector.as_ref(), "ws://scripted").await.unwrap();
        session.authenticate(&credentials()).await.unwrap();
        let discovery = session.discover_account_id().await.unwrap();

        assert_eq!(discovery.account_id, "10001");
        assert!(discovery.pending.is_none());
        assert_eq!(session.account_id(), Some("10001"));
        assert_eq!(session.state(), SessionState::Streaming);
    }

    #[tokio::test]
    async fn test_second_discovery_keeps_first_account() {
        let connector = ScriptedConnector::new();
        let peer = connector.accept();
        peer.push(auth_response(true));
        peer.push(account_frame("10001"));
        peer.push(account_frame("20002"));

        let mut session = Session::open(connector.as_ref(), "ws://scripted").await.unwrap();
        session.authenticate(&credentials()).await.unwrap();
        assert_eq!(session.discover_account_id().await.unwrap().account_id, "10001");

        let again = session.discover_account_id().await.unwrap();
        assert_eq!(again.account_id, "10001");
        assert_eq!(session.account_id(), Some("10001"));
        assert_eq!(session.link().account_id(), Some("10001"));
    }

    #[tokio::test]
    async fn test_discovery_frame_with_sender_is_kept() {
        let connector = ScriptedConnector::new();
        let peer = connector.accept();
        peer.push(auth_response(true));
        peer.push(text_frame("10001", "first"));

        let mut session = Session::open(connector.as_ref(), "ws://scripted").await.unwrap();
        session.authenticate(&credentials()).await.unwrap();
        let discovery = session.discover_account_id().await.unwrap();

        let pending = discovery.pending.unwrap();
        assert_eq!(pending.content()[0]["Text"], "first");
    }

    #[tokio::test]
    async fn test_receive_filters_frames_without_sender() {
        let connector = ScriptedConnector::new();
        let mut peer = connector.accept();
        peer.push(push_frame(json!([{"Account": "10001"}, {"Text": "no sender"}])));
        peer.push(json!({"seq": 4, "cmd": "Response", "data": {"status": true}}));
        peer.push(text_frame("10001", "hello"));

        let mut session = Session::open(connector.as_ref(), "ws://scripted").await.unwrap();
        let frame = session.receive().await.unwrap();
        assert_eq!(frame.content()[0]["Text"], "hello");

        peer.hang_up();
        let err = session.receive().await.unwrap_err();
        assert!(matches!(err, SessionError::ConnectionClosed(_)));
    }

    #[tokio::test]
    async fn test_receive_survives_malformed_frame() {
        let connector = ScriptedConnector::new();
        let peer = connector.accept();
        peer.push_raw(b"\xff\xfe");
        peer.push(text_frame("10001", "after"));

        let mut session = Session::open(connector.as_ref(), "ws://scripted").await.unwrap();
        let err = session.receive().await.unwrap_err();
        assert!(matches!(err, SessionError::Malformed(_)));
        assert!(!err.is_fatal());

        let frame = session.receive().await.unwrap();
        assert_eq!(frame.content()[0]["Text"], "after");
    }

    #[tokio::test]
    async fn test_seq_increments_per_send() {
        let connector = ScriptedConnector::new();
        let mut peer = connector.accept();

        let session = Session::open(connector.as_ref(), "ws://scripted").await.unwrap();
        assert_eq!(session.link().send(message("a")).await.unwrap(), 1);
        assert_eq!(session.link().send(message("b")).await.unwrap(), 2);
        assert_eq!(session.link().send(message("c")).await.unwrap(), 3);

        for expected in 1..=3 {
            assert_eq!(peer.next_sent().await["seq"], expected);
        }
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let connector = ScriptedConnector::new();
        let peer = connector.accept();

        let mut session = Session::open(connector.as_ref(), "ws://scripted").await.unwrap();
        session.close().await;
        session.close().await;
        assert!(peer.is_closed());
        assert_eq!(session.state(), SessionState::Closed);

        let err = session.link().send(message("late")).await.unwrap_err();
        assert!(matches!(err, SessionError::ConnectionClosed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slot_send_waits_for_attach() {
        let connector = ScriptedConnector::new();
        let mut peer = connector.accept();
        let session = Session::open(connector.as_ref(), "ws://scripted").await.unwrap();

        let slot = SessionSlot::new();
        let start = Instant::now();
        let sender = {
            let slot = slot.clone();
            tokio::spawn(async move { slot.send(message("queued")).await })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!sender.is_finished());
        slot.attach(Arc::clone(session.link()));
        assert!(slot.is_attached());

        let seq = sender.await.unwrap().unwrap();
        assert_eq!(seq, 1);
        assert!(start.elapsed() >= SEND_POLL_INTERVAL);
        assert_eq!(peer.next_sent().await["data"][1]["Text"], "queued");

        slot.clear();
        assert!(slot.current().is_none());
    }
}
