//! The dispatcher contract.
//!
//! The bridge does not route events to handlers itself. It reports the bot
//! coming online or going away and hands every decoded event to a
//! [`Dispatcher`]. Each `dispatch` call runs in its own task, so
//! implementations must not rely on one event finishing before the next
//! starts.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::bot::BoxedBot;
use crate::event::BoxedEvent;

/// Receives lifecycle notifications and events from an adapter.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// The bot has logged in and its account id is known.
    async fn connect(&self, bot: BoxedBot);

    /// The connection went away. Called after every session, including ones
    /// that never reached [`Dispatcher::connect`].
    async fn disconnect(&self);

    /// Handles one event.
    async fn dispatch(&self, event: BoxedEvent);
}

/// A notification forwarded by [`ChannelDispatcher`].
#[derive(Clone)]
pub enum BotLifecycle {
    /// See [`Dispatcher::connect`].
    Connected(BoxedBot),
    /// See [`Dispatcher::disconnect`].
    Disconnected,
    /// See [`Dispatcher::dispatch`].
    Event(BoxedEvent),
}

impl std::fmt::Debug for BotLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BotLifecycle::Connected(bot) => f.debug_tuple("Connected").field(&bot.id()).finish(),
            BotLifecycle::Disconnected => f.write_str("Disconnected"),
            BotLifecycle::Event(event) => f.debug_tuple("Event").field(event).finish(),
        }
    }
}

/// A dispatcher that forwards everything into an mpsc channel.
///
/// Useful when the consumer wants to drive its own loop instead of
/// implementing [`Dispatcher`].
#[derive(Clone)]
pub struct ChannelDispatcher {
    tx: mpsc::Sender<BotLifecycle>,
}

impl ChannelDispatcher {
    /// Creates a dispatcher and the receiver it feeds.
    pub fn new(buffer_size: usize) -> (Self, mpsc::Receiver<BotLifecycle>) {
        let (tx, rx) = mpsc::channel(buffer_size);
        (Self { tx }, rx)
    }

    async fn forward(&self, item: BotLifecycle) {
        if self.tx.send(item).await.is_err() {
            debug!("Lifecycle receiver dropped, notification discarded");
        }
    }
}

#[async_trait]
impl Dispatcher for ChannelDispatcher {
    async fn connect(&self, bot: BoxedBot) {
        self.forward(BotLifecycle::Connected(bot)).await;
    }

    async fn disconnect(&self) {
        self.forward(BotLifecycle::Disconnected).await;
    }

    async fn dispatch(&self, event: BoxedEvent) {
        self.forward(BotLifecycle::Event(event)).await;
    }
}
