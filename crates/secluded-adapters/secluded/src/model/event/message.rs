//! Chat message events.

use std::any::Any;

use serde::{Deserialize, Serialize};

use secluded_core::{Event, EventType, Message};

use super::PLATFORM;
use crate::model::message::SecludedMessage;

/// A chat message, private or in a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEvent {
    /// The account that received the message.
    pub account_id: String,
    /// Sender id.
    pub user_id: String,
    /// Sender display name.
    pub user_name: String,
    /// Sender's name within the group, if any.
    #[serde(default)]
    pub user_group_name: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub msg_id: Option<String>,
    pub message: SecludedMessage,
}

impl MessageEvent {
    pub fn message(&self) -> &SecludedMessage {
        &self.message
    }

    pub fn is_group(&self) -> bool {
        self.group_id.is_some()
    }

    pub fn group_id(&self) -> Option<&str> {
        self.group_id.as_deref()
    }

    pub fn group_name(&self) -> Option<&str> {
        self.group_name.as_deref()
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn user_group_name(&self) -> Option<&str> {
        self.user_group_name.as_deref()
    }

    pub fn msg_id(&self) -> Option<&str> {
        self.msg_id.as_deref()
    }
}

impl Event for MessageEvent {
    fn event_name(&self) -> &str {
        &self.account_id
    }

    fn platform(&self) -> &'static str {
        PLATFORM
    }

    fn event_type(&self) -> EventType {
        EventType::Message
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn plain_text(&self) -> String {
        self.message.extract_plain_text()
    }

    fn user_id(&self) -> Option<&str> {
        Some(&self.user_id)
    }

    fn session_id(&self) -> String {
        format!(
            "{}/{}/{}",
            self.account_id,
            self.group_id.as_deref().unwrap_or_default(),
            self.user_id
        )
    }

    fn is_tome(&self) -> bool {
        self.message
            .iter()
            .any(|seg| seg.mentioned_user() == Some(self.account_id.as_str()))
    }

    fn bot_id(&self) -> Option<&str> {
        Some(&self.account_id)
    }
}
