//! Bot trait and related types.
//!
//! A `Bot` is the handle a dispatcher receives when the bridge comes online.
//! It identifies the account the bridge is logged in as and lets handlers
//! send replies back through the gateway.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ApiResult;
use crate::event::Event;

/// The core Bot trait.
///
/// Concrete implementations provide strongly-typed send methods on top of
/// the plain-text [`Bot::send`] shortcut.
#[async_trait]
pub trait Bot: Send + Sync {
    /// Returns the bot's account id.
    fn id(&self) -> &str;

    /// Returns the adapter name this bot uses.
    fn adapter_name(&self) -> &str;

    /// Sends a plain-text reply in the conversation the event came from.
    async fn send(&self, event: &dyn Event, message: &str) -> ApiResult<()>;

    /// Returns self as an `Arc<dyn Any>` for safe downcasting.
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// A shared Bot trait object.
pub type BoxedBot = Arc<dyn Bot>;

/// Attempts to downcast a BoxedBot to a specific concrete type.
pub fn downcast_bot<T: Bot + 'static>(bot: BoxedBot) -> Option<Arc<T>> {
    Arc::downcast::<T>(bot.as_any()).ok()
}
