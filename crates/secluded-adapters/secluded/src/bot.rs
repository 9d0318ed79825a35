//! Secluded bot implementation.
//!
//! [`SecludedBot`] is the outbound entry point handed to the dispatcher when
//! the bridge comes online. It sends through whichever session is currently
//! attached, so a bot handle stays valid across reconnects.
//!
//! # Usage
//!
//! ```rust,ignore
//! use secluded_adapter::{SecludedBot, MessageEvent, Segment};
//! use secluded_core::downcast_bot;
//!
//! async fn on_event(bot: BoxedBot, event: BoxedEvent) {
//!     let Some(bot) = downcast_bot::<SecludedBot>(bot) else { return };
//!     if let Some(msg) = event.downcast_ref::<MessageEvent>() {
//!         bot.reply(msg, "pong", true).await.ok();
//!         bot.reply(msg, vec![Segment::at_all(), Segment::text(" hi")], false).await.ok();
//!     }
//! }
//! ```

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use secluded_core::{ApiError, ApiResult, Bot, Event};

use crate::codec;
use crate::model::event::{MessageEvent, SecludedEvent};
use crate::model::message::SecludedMessage;
use crate::session::SessionSlot;

/// Name reported by [`Bot::adapter_name`].
pub const ADAPTER_NAME: &str = "secluded";

/// Where an outbound message goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTarget {
    /// The account sending the message.
    pub account_id: String,
    /// Target group; `None` for a private conversation.
    pub group_id: Option<String>,
    /// Message being replied to, if the message is a reply.
    pub msg_id: Option<String>,
}

impl MessageTarget {
    /// A group conversation.
    pub fn group(account_id: impl Into<String>, group_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            group_id: Some(group_id.into()),
            msg_id: None,
        }
    }

    /// A private conversation.
    pub fn private(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            group_id: None,
            msg_id: None,
        }
    }

    /// Sets the message to reply to.
    pub fn replying_to(mut self, msg_id: impl Into<String>) -> Self {
        self.msg_id = Some(msg_id.into());
        self
    }
}

impl From<&MessageEvent> for MessageTarget {
    fn from(event: &MessageEvent) -> Self {
        Self {
            account_id: event.account_id.clone(),
            group_id: event.group_id.clone(),
            msg_id: event.msg_id.clone(),
        }
    }
}

/// The bot handle for one logged-in account.
pub struct SecludedBot {
    id: String,
    slot: SessionSlot,
}

impl SecludedBot {
    pub(crate) fn new(id: impl Into<String>, slot: SessionSlot) -> Self {
        Self { id: id.into(), slot }
    }

    /// Sends `message` to `target`.
    ///
    /// With `reply` set and a message id on the target, the gateway quotes
    /// that message. If no connection is attached the call waits for one.
    /// Returns the sequence number of the frame sent.
    pub async fn send_to(
        &self,
        target: &MessageTarget,
        message: impl Into<SecludedMessage>,
        reply: bool,
    ) -> ApiResult<u64> {
        let message = message.into();
        let reply_to = if reply { target.msg_id.as_deref() } else { None };
        let frame = codec::encode_outbound_message(
            &target.account_id,
            target.group_id.as_deref(),
            reply_to,
            &message,
        );

        debug!(
            account_id = %target.account_id,
            group_id = ?target.group_id,
            reply = reply_to.is_some(),
            "Sending message"
        );
        Ok(self.slot.send(frame).await?)
    }

    /// Answers `event` in the conversation it came from.
    pub async fn reply(
        &self,
        event: &MessageEvent,
        message: impl Into<SecludedMessage>,
        reply: bool,
    ) -> ApiResult<u64> {
        self.send_to(&MessageTarget::from(event), message, reply).await
    }

    /// Returns true while a connection is attached.
    pub fn is_online(&self) -> bool {
        self.slot.is_attached()
    }
}

#[async_trait]
impl Bot for SecludedBot {
    fn id(&self) -> &str {
        &self.id
    }

    fn adapter_name(&self) -> &str {
        ADAPTER_NAME
    }

    async fn send(&self, event: &dyn Event, message: &str) -> ApiResult<()> {
        let any = event.as_any();
        let event = any
            .downcast_ref::<MessageEvent>()
            .or_else(|| any.downcast_ref::<SecludedEvent>().and_then(SecludedEvent::as_message))
            .ok_or(ApiError::MissingSession)?;

        self.reply(event, message, false).await.map(|_| ())
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl std::fmt::Debug for SecludedBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecludedBot")
            .field("id", &self.id)
            .field("online", &self.is_online())
            .finish()
    }
}
