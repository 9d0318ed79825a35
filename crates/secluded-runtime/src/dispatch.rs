//! The dispatcher used by the `secluded-bridge` binary.
//!
//! [`BridgeDispatcher`] logs every event it receives. With echo enabled it
//! also answers `/echo <text>` messages, which is enough to check a
//! deployment end to end.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use secluded_adapter::{MessageEvent, SecludedBot};
use secluded_core::{BoxedBot, BoxedEvent, Dispatcher, Event, EventType, downcast_bot};

/// Command prefix answered by the echo responder.
pub const ECHO_PREFIX: &str = "/echo ";

/// Logs events and optionally echoes messages back.
#[derive(Default)]
pub struct BridgeDispatcher {
    echo: bool,
    bot: RwLock<Option<Arc<SecludedBot>>>,
    events: AtomicU64,
}

impl BridgeDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables the `/echo` responder.
    pub fn with_echo(mut self, enabled: bool) -> Self {
        self.echo = enabled;
        self
    }

    /// Number of events dispatched so far.
    pub fn event_count(&self) -> u64 {
        self.events.load(Ordering::Relaxed)
    }

    /// Returns the connected bot, if any.
    pub async fn bot(&self) -> Option<Arc<SecludedBot>> {
        self.bot.read().await.clone()
    }

    async fn echo(&self, msg: &MessageEvent) {
        let Some(content) = echo_content(msg) else {
            return;
        };
        let Some(bot) = self.bot().await else {
            warn!("Echo requested while no bot is connected");
            return;
        };

        match bot.reply(msg, content, true).await {
            Ok(seq) => debug!(seq, "Echo reply sent"),
            Err(e) => error!(error = %e, "Failed to send echo reply"),
        }
    }
}

/// Returns the text to echo back, skipping messages the bot sent itself.
pub fn echo_content(msg: &MessageEvent) -> Option<String> {
    if msg.user_id == msg.account_id {
        return None;
    }
    let text = msg.plain_text();
    text.strip_prefix(ECHO_PREFIX)
        .filter(|rest| !rest.trim().is_empty())
        .map(str::to_owned)
}

fn log_event(event: &BoxedEvent) {
    match event.downcast_ref::<MessageEvent>() {
        Some(msg) => match msg.group_id() {
            Some(group_id) => info!(
                "[Group {}] {} ({}): {}",
                msg.group_name().unwrap_or(group_id),
                msg.user_name(),
                msg.user_id,
                msg.message()
            ),
            None => info!(
                "[Private] {} ({}): {}",
                msg.user_name(),
                msg.user_id,
                msg.message()
            ),
        },
        None if event.event_type() == EventType::Meta => {
            debug!(event_name = %event.event_name(), "{}", event.plain_text());
        }
        None => info!(
            event_type = %event.event_type(),
            event_name = %event.event_name(),
            "{}",
            event.plain_text()
        ),
    }
}

#[async_trait]
impl Dispatcher for BridgeDispatcher {
    async fn connect(&self, bot: BoxedBot) {
        let id = bot.id().to_owned();
        match downcast_bot::<SecludedBot>(bot) {
            Some(bot) => {
                *self.bot.write().await = Some(bot);
                info!(account_id = %id, "Bot online");
            }
            None => warn!(account_id = %id, "Connected bot is not a secluded bot, ignoring"),
        }
    }

    async fn disconnect(&self) {
        if self.bot.write().await.take().is_some() {
            info!("Bot offline");
        }
    }

    async fn dispatch(&self, event: BoxedEvent) {
        self.events.fetch_add(1, Ordering::Relaxed);
        log_event(&event);

        if self.echo
            && let Some(msg) = event.downcast_ref::<MessageEvent>()
        {
            self.echo(msg).await;
        }
    }
}
