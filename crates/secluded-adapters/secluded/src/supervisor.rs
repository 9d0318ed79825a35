//! Reconnect supervisor.
//!
//! The outer control loop. Each round opens a fresh [`Session`], performs
//! the handshake, resolves the account id, announces the bot and then
//! streams frames through the classifier to the dispatcher until the
//! connection fails. Every round ends with the same teardown:
//!
//! ```text
//! close transport ─▶ dispatcher.disconnect() ─▶ clear slot ─▶ sleep 5s ─▶ next round
//! ```
//!
//! Only shutdown ends the loop.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use secluded_core::{BoxedBot, BoxedConnector, BoxedEvent, Dispatcher};

use crate::bot::SecludedBot;
use crate::classify::classify;
use crate::config::SecludedConfig;
use crate::error::SessionError;
use crate::model::event::OtherEvent;
use crate::model::wire::InboundFrame;
use crate::session::{Credentials, Discovery, RETRY_INTERVAL, Session, SessionSlot};

/// Pause between a failed round and the next one.
pub const RECONNECT_DELAY: Duration = RETRY_INTERVAL;

/// Owns the connection lifecycle.
pub struct ReconnectSupervisor {
    config: SecludedConfig,
    credentials: Credentials,
    connector: BoxedConnector,
    dispatcher: Arc<dyn Dispatcher>,
    slot: SessionSlot,
    shutdown: CancellationToken,
}

impl ReconnectSupervisor {
    pub fn new(
        config: SecludedConfig,
        connector: BoxedConnector,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        Self {
            credentials: Credentials::from(&config),
            config,
            connector,
            dispatcher,
            slot: SessionSlot::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// The slot the current session is published in.
    pub fn slot(&self) -> SessionSlot {
        self.slot.clone()
    }

    /// Cancelling this token stops the supervisor.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Runs the supervisor on a new task.
    pub fn spawn(self) -> SupervisorHandle {
        let token = self.shutdown_token();
        let join = tokio::spawn(self.run());
        SupervisorHandle { token, join }
    }

    /// Runs until the shutdown token is cancelled.
    pub async fn run(self) {
        info!(host = %self.config.host, "Starting secluded supervisor");

        loop {
            let mut session = None;
            let outcome = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => None,
                result = self.drive(&mut session) => Some(result),
            };

            if let Some(Err(e)) = outcome {
                self.report(&e, session.is_some());
            }

            if let Some(session) = session.as_mut() {
                session.close().await;
            }
            self.dispatcher.disconnect().await;
            self.slot.clear();

            if self.shutdown.is_cancelled() {
                break;
            }

            debug!(delay_secs = RECONNECT_DELAY.as_secs(), "Reconnecting after delay");
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(RECONNECT_DELAY) => {}
            }
        }

        info!("Secluded supervisor stopped");
    }

    /// One round. Only returns on a fatal error.
    async fn drive(&self, current: &mut Option<Session>) -> Result<Infallible, SessionError> {
        let session =
            current.insert(Session::open(self.connector.as_ref(), &self.config.host).await?);
        session.authenticate(&self.credentials).await?;
        let Discovery {
            account_id,
            pending,
        } = session.discover_account_id().await?;

        self.slot.attach(Arc::clone(session.link()));
        let bot: BoxedBot = Arc::new(SecludedBot::new(&account_id, self.slot.clone()));
        self.dispatcher.connect(bot).await;
        info!(account_id = %account_id, "Bot connected");

        if let Some(frame) = pending {
            self.forward(&account_id, &frame);
        }

        loop {
            match session.receive().await {
                Ok(frame) => self.forward(&account_id, &frame),
                Err(e) if !e.is_fatal() => debug!(error = %e, "Continuing after bad frame"),
                Err(e) => return Err(e),
            }
        }
    }

    /// Classifies a frame and dispatches the event on its own task.
    fn forward(&self, account_id: &str, frame: &InboundFrame) {
        let event = match classify(frame) {
            Ok(Some(event)) => event.into_boxed(),
            Ok(None) => {
                debug!(seq = frame.seq(), "No sub-kind matched, dispatching as other event");
                BoxedEvent::new(OtherEvent::empty(account_id))
            }
            Err(e) => {
                warn!(error = %e, raw = %frame.to_json(), "Failed to classify frame");
                return;
            }
        };

        let dispatcher = Arc::clone(&self.dispatcher);
        tokio::spawn(async move {
            dispatcher.dispatch(event).await;
        });
    }

    fn report(&self, err: &SessionError, opened: bool) {
        error!(
            host = %self.config.host,
            error = %err,
            "{}",
            failure_label(err, opened)
        );
    }
}

/// Log message for a failed round. `opened` is whether a transport was
/// attached during the round.
fn failure_label(err: &SessionError, opened: bool) -> &'static str {
    match err {
        SessionError::Auth { .. } => "Handshake rejected, check token and plugin id",
        _ if !opened => "Initial connection failed",
        _ => "Connection interrupted",
    }
}

impl std::fmt::Debug for ReconnectSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconnectSupervisor")
            .field("host", &self.config.host)
            .field("slot", &self.slot)
            .finish()
    }
}

/// Handle to a spawned supervisor.
#[derive(Debug)]
pub struct SupervisorHandle {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl SupervisorHandle {
    /// Returns the shutdown token.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Stops the supervisor and waits for its teardown to finish.
    ///
    /// Dispatched event tasks are not waited for.
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = self.join.await {
            error!(error = %e, "Supervisor task failed");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::event::{DescriptionKind, MessageEvent, NoticeEvent};
    use crate::testing::{ScriptedConnector, account_frame, auth_response, push_frame, text_frame};
    use secluded_core::{BotLifecycle, ChannelDispatcher, EventType, downcast_bot};
    use serde_json::json;
    use tokio::sync::mpsc;
    use tokio::time::Instant;

    fn start(connector: &Arc<ScriptedConnector>) -> (SupervisorHandle, mpsc::Receiver<BotLifecycle>) {
        let (dispatcher, rx) = ChannelDispatcher::new(16);
        let supervisor = ReconnectSupervisor::new(
            SecludedConfig::new("ws://scripted", "secret"),
            connector.clone(),
            Arc::new(dispatcher),
        );
        (supervisor.spawn(), rx)
    }

    async fn next(rx: &mut mpsc::Receiver<BotLifecycle>) -> BotLifecycle {
        rx.recv().await.expect("dispatcher channel closed")
    }

    async fn expect_connected(rx: &mut mpsc::Receiver<BotLifecycle>) -> BoxedBot {
        match next(rx).await {
            BotLifecycle::Connected(bot) => bot,
            other => panic!("expected Connected, got {other:?}"),
        }
    }

    async fn expect_event(rx: &mut mpsc::Receiver<BotLifecycle>) -> BoxedEvent {
        match next(rx).await {
            BotLifecycle::Event(event) => event,
            other => panic!("expected Event, got {other:?}"),
        }
    }

    async fn expect_disconnected(rx: &mut mpsc::Receiver<BotLifecycle>) {
        match next(rx).await {
            BotLifecycle::Disconnected => {}
            other => panic!("expected Disconnected, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_rejected_backs_off_and_retries_with_new_session() {
        let connector = ScriptedConnector::new();
        let mut rejected = connector.accept();
        rejected.push(auth_response(false));
        let mut accepted = connector.accept();
        accepted.push(auth_response(true));
        accepted.push(account_frame("10001"));

        let start_at = Instant::now();
        let (handle, mut rx) = start(&connector);

        assert_eq!(rejected.next_sent().await["seq"], 1);
        expect_disconnected(&mut rx).await;
        assert!(rejected.is_closed());

        let handshake = accepted.next_sent().await;
        assert_eq!(handshake["cmd"], "SyncOicq");
        assert_eq!(handshake["seq"], 1);
        assert!(start_at.elapsed() >= RECONNECT_DELAY);

        let bot = expect_connected(&mut rx).await;
        assert_eq!(bot.id(), "10001");
        assert_eq!(connector.attempts(), 2);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_refused_connect_is_retried() {
        let connector = ScriptedConnector::new();
        connector.refuse();
        let peer = connector.accept();
        peer.push(auth_response(true));
        peer.push(account_frame("10001"));

        let start_at = Instant::now();
        let (handle, mut rx) = start(&connector);

        expect_disconnected(&mut rx).await;
        expect_connected(&mut rx).await;
        assert!(start_at.elapsed() >= RECONNECT_DELAY);
        assert_eq!(connector.attempts(), 2);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_frame_does_not_close_session() {
        let connector = ScriptedConnector::new();
        let peer = connector.accept();
        peer.push(auth_response(true));
        peer.push(account_frame("10001"));
        peer.push_raw(b"<<garbage>>");
        peer.push(text_frame("10001", "hello"));

        let (handle, mut rx) = start(&connector);

        expect_connected(&mut rx).await;
        let event = expect_event(&mut rx).await;
        assert_eq!(event.event_type(), EventType::Message);
        assert_eq!(event.plain_text(), "hello");
        assert!(!peer.is_closed());
        assert_eq!(connector.attempts(), 1);

        handle.shutdown().await;
        assert!(peer.is_closed());
        expect_disconnected(&mut rx).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_hang_up_reconnects_and_rediscovers() {
        let connector = ScriptedConnector::new();
        let mut first = connector.accept();
        first.push(auth_response(true));
        first.push(account_frame("10001"));
        let mut second = connector.accept();
        second.push(auth_response(true));
        second.push(account_frame("20002"));

        let (handle, mut rx) = start(&connector);

        let bot = expect_connected(&mut rx).await;
        assert_eq!(bot.id(), "10001");

        first.hang_up();
        expect_disconnected(&mut rx).await;

        let bot = expect_connected(&mut rx).await;
        assert_eq!(bot.id(), "20002");

        let bot = downcast_bot::<SecludedBot>(bot).unwrap();
        let target = crate::bot::MessageTarget::group("20002", "5000");
        assert_eq!(bot.send_to(&target, "back", false).await.unwrap(), 2);

        assert_eq!(second.next_sent().await["seq"], 1);
        let sent = second.next_sent().await;
        assert_eq!(sent["seq"], 2);
        assert_eq!(sent["data"][1]["Text"], "back");

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_discovery_frame_with_sender_is_forwarded() {
        let connector = ScriptedConnector::new();
        let peer = connector.accept();
        peer.push(auth_response(true));
        peer.push(text_frame("10001", "first"));

        let (handle, mut rx) = start(&connector);

        expect_connected(&mut rx).await;
        let event = expect_event(&mut rx).await;
        let message = event.downcast_ref::<MessageEvent>().unwrap();
        assert_eq!(message.account_id, "10001");
        assert_eq!(event.plain_text(), "first");

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_unclassifiable_frames() {
        let connector = ScriptedConnector::new();
        let peer = connector.accept();
        peer.push(auth_response(true));
        peer.push(account_frame("10001"));
        // no Account: classification fails, frame dropped
        peer.push(push_frame(json!([{"Uin": "42"}, {"Text": "lost"}])));
        // notice without a handled sub-kind: becomes an other event
        peer.push(push_frame(json!([
            {"Account": "10001", "Uin": "42", "UinName": "Alice", "GroupEssence": "x"}
        ])));
        peer.push(push_frame(json!([
            {"Account": "10001", "Uin": "42", "UinName": "Alice", "GroupMemberSignout": "x"}
        ])));

        let (handle, mut rx) = start(&connector);
        expect_connected(&mut rx).await;

        let mut events = vec![expect_event(&mut rx).await, expect_event(&mut rx).await];
        events.sort_by_key(|e| e.event_type().as_str());

        assert_eq!(events[0].event_type(), EventType::Notice);
        let notice = events[0].downcast_ref::<NoticeEvent>().unwrap();
        assert_eq!(notice.kind(), DescriptionKind::GroupMemberSignout);
        assert_eq!(events[1].event_type(), EventType::Other);
        assert_eq!(events[1].bot_id(), Some("10001"));

        handle.shutdown().await;
        expect_disconnected(&mut rx).await;
        assert!(rx.try_recv().is_err());
    }

    /// Never finishes handling a message whose text is "block".
    struct StallingDispatcher {
        started: std::sync::atomic::AtomicUsize,
        done: mpsc::UnboundedSender<String>,
    }

    #[async_trait::async_trait]
    impl Dispatcher for StallingDispatcher {
        async fn connect(&self, _bot: BoxedBot) {}

        async fn disconnect(&self) {}

        async fn dispatch(&self, event: BoxedEvent) {
            self.started
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            let text = event.plain_text();
            if text == "block" {
                std::future::pending::<()>().await;
            }
            let _ = self.done.send(text);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_handler_does_not_block_receive_loop() {
        let connector = ScriptedConnector::new();
        let peer = connector.accept();
        peer.push(auth_response(true));
        peer.push(account_frame("10001"));
        peer.push(text_frame("10001", "block"));
        peer.push(text_frame("10001", "second"));
        peer.push(text_frame("10001", "third"));

        let (done, mut done_rx) = mpsc::unbounded_channel();
        let dispatcher = Arc::new(StallingDispatcher {
            started: Default::default(),
            done,
        });
        let handle = ReconnectSupervisor::new(
            SecludedConfig::new("ws://scripted", "secret"),
            connector.clone(),
            dispatcher.clone(),
        )
        .spawn();

        let mut finished = vec![
            done_rx.recv().await.unwrap(),
            done_rx.recv().await.unwrap(),
        ];
        finished.sort();
        assert_eq!(finished, ["second", "third"]);
        assert_eq!(dispatcher.started.load(std::sync::atomic::Ordering::SeqCst), 3);
        assert!(done_rx.try_recv().is_err());
        assert!(!peer.is_closed());

        handle.shutdown().await;
    }

    #[test]
    fn test_failure_label() {
        let refused = SessionError::Connect(secluded_core::TransportError::ConnectionFailed {
            url: "ws://scripted".into(),
            reason: "refused".into(),
        });
        assert_eq!(failure_label(&refused, false), "Initial connection failed");

        let hung_up =
            SessionError::ConnectionClosed(secluded_core::TransportError::closed("stream ended"));
        assert_eq!(failure_label(&hung_up, true), "Connection interrupted");

        let rejected = SessionError::auth("gateway answered with status false");
        assert_eq!(
            failure_label(&rejected, true),
            "Handshake rejected, check token and plugin id"
        );
    }

    #[test]
    fn test_reconnect_and_send_poll_share_interval() {
        assert_eq!(RECONNECT_DELAY, crate::session::SEND_POLL_INTERVAL);
        assert_eq!(RECONNECT_DELAY, Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_backoff() {
        let connector = ScriptedConnector::new();
        connector.refuse();

        let (handle, mut rx) = start(&connector);
        expect_disconnected(&mut rx).await;

        let start_at = Instant::now();
        handle.shutdown().await;
        assert!(start_at.elapsed() < RECONNECT_DELAY);
        assert_eq!(connector.attempts(), 1);
    }
}
