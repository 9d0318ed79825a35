//! In-memory transport for tests.
//!
//! [`ScriptedConnector`] hands out connections according to a plan built
//! up front: each `refuse()` makes one connect attempt fail, each `accept()`
//! makes one succeed and returns the [`Peer`] end of that connection.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::mpsc;

use secluded_core::{
    Connection, Connector, FrameSink, FrameSource, TransportError, TransportResult,
};

enum Plan {
    Refuse,
    Accept(Connection),
}

/// A connector that follows a script.
#[derive(Default)]
pub(crate) struct ScriptedConnector {
    plan: Mutex<VecDeque<Plan>>,
    attempts: AtomicUsize,
}

impl ScriptedConnector {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The next connect attempt fails.
    pub(crate) fn refuse(&self) {
        self.plan.lock().push_back(Plan::Refuse);
    }

    /// The next connect attempt succeeds.
    pub(crate) fn accept(&self) -> Peer {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));

        let connection = Connection {
            url: "ws://scripted".to_string(),
            sink: Box::new(ScriptedSink {
                tx: outbound_tx,
                closed: Arc::clone(&closed),
            }),
            source: Box::new(ScriptedSource { rx: inbound_rx }),
        };
        self.plan.lock().push_back(Plan::Accept(connection));

        Peer {
            inbound: Some(inbound_tx),
            outbound: outbound_rx,
            closed,
        }
    }

    /// Number of connect attempts so far.
    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, url: &str) -> TransportResult<Connection> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        match self.plan.lock().pop_front() {
            Some(Plan::Accept(connection)) => Ok(connection),
            Some(Plan::Refuse) | None => Err(TransportError::ConnectionFailed {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            }),
        }
    }
}

/// The gateway side of a scripted connection.
pub(crate) struct Peer {
    inbound: Option<mpsc::UnboundedSender<Vec<u8>>>,
    outbound: mpsc::UnboundedReceiver<String>,
    closed: Arc<AtomicBool>,
}

impl Peer {
    /// Queues a JSON frame for the session to read.
    pub(crate) fn push(&self, frame: Value) {
        self.push_raw(frame.to_string().as_bytes());
    }

    /// Queues raw bytes for the session to read.
    pub(crate) fn push_raw(&self, raw: &[u8]) {
        if let Some(tx) = &self.inbound {
            let _ = tx.send(raw.to_vec());
        }
    }

    /// Closes the read side; the session sees the connection drop.
    pub(crate) fn hang_up(&mut self) {
        self.inbound = None;
    }

    /// Waits for the next frame the session sent.
    pub(crate) async fn next_sent(&mut self) -> Value {
        let text = self.outbound.recv().await.expect("session dropped its sink");
        serde_json::from_str(&text).expect("session sent invalid JSON")
    }

    /// Returns true once the session closed its end.
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct ScriptedSink {
    tx: mpsc::UnboundedSender<String>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl FrameSink for ScriptedSink {
    async fn send_text(&mut self, text: String) -> TransportResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::closed("sink closed"));
        }
        self.tx
            .send(text)
            .map_err(|_| TransportError::closed("peer dropped"))
    }

    async fn close(&mut self) -> TransportResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct ScriptedSource {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

#[async_trait]
impl FrameSource for ScriptedSource {
    async fn next_frame(&mut self) -> TransportResult<Vec<u8>> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| TransportError::closed("peer hung up"))
    }
}

/// A handshake answer.
pub(crate) fn auth_response(status: bool) -> Value {
    json!({"seq": 1, "cmd": "Response", "data": {"status": status}})
}

/// A pushed frame with the given segments.
pub(crate) fn push_frame(data: Value) -> Value {
    json!({"seq": 0, "cmd": "PushOicqMsg", "data": data})
}

/// The discovery frame: account id only, no sender.
pub(crate) fn account_frame(account_id: &str) -> Value {
    push_frame(json!([{"Account": account_id, "Online": "Online"}]))
}

/// A text message from user 42 to `account_id`.
pub(crate) fn text_frame(account_id: &str, text: &str) -> Value {
    push_frame(json!([
        {"Account": account_id, "Uin": "42", "UinName": "Alice"},
        {"Text": text}
    ]))
}
