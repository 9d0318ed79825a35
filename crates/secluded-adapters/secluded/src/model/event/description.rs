//! Request, notice, meta and other events.
//!
//! These carry no chat content, only a [`Description`] of what happened:
//!
//! ```text
//! RequestEvent { account_id, description }   GroupNotify / NewFriendNotify
//! NoticeEvent  { account_id, description }   GroupNewMember / GroupMemberSignout
//! MetaEvent    { account_id, description }   Heartbeat
//! OtherEvent   { account_id, description }   everything else
//! ```

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};

use secluded_core::{Event, EventType};

use super::PLATFORM;

/// Sub-kind of a non-message event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptionKind {
    /// Someone asks to join a group.
    GroupNewMemberRequest,
    /// Someone asks to become a friend.
    NewFriendRequest,
    /// Someone joined a group.
    GroupNewMember,
    /// Someone left a group.
    GroupMemberSignout,
    /// Gateway heartbeat.
    #[serde(rename = "Heartbeat")]
    Heartbeat,
    /// Nothing recognisable.
    #[serde(rename = "")]
    Empty,
}

impl DescriptionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GroupNewMemberRequest => "group_new_member_request",
            Self::NewFriendRequest => "new_friend_request",
            Self::GroupNewMember => "group_new_member",
            Self::GroupMemberSignout => "group_member_signout",
            Self::Heartbeat => "Heartbeat",
            Self::Empty => "",
        }
    }
}

impl fmt::Display for DescriptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a non-message event is about, and who it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    pub kind: DescriptionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
}

impl Description {
    /// A description concerning one user.
    pub fn with_user(
        kind: DescriptionKind,
        user_id: impl Into<String>,
        user_name: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            user_id: Some(user_id.into()),
            user_name: Some(user_name.into()),
        }
    }

    /// A description concerning nobody in particular.
    pub fn bare(kind: DescriptionKind) -> Self {
        Self {
            kind,
            user_id: None,
            user_name: None,
        }
    }

    /// The empty description carried by [`OtherEvent`].
    pub fn empty() -> Self {
        Self::bare(DescriptionKind::Empty)
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.user_name, &self.user_id) {
            (Some(name), Some(id)) => write!(f, "{} {name}({id})", self.kind),
            (None, Some(id)) => write!(f, "{} {id}", self.kind),
            _ => write!(f, "{}", self.kind),
        }
    }
}

macro_rules! description_event {
    ($(#[$doc:meta])* $name:ident => $event_type:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name {
            /// The account that received the event.
            pub account_id: String,
            pub description: Description,
        }

        impl $name {
            pub fn new(account_id: impl Into<String>, description: Description) -> Self {
                Self {
                    account_id: account_id.into(),
                    description,
                }
            }

            /// The description's sub-kind.
            pub fn kind(&self) -> DescriptionKind {
                self.description.kind
            }

            /// Display name of the user concerned, if any.
            pub fn user_name(&self) -> Option<&str> {
                self.description.user_name.as_deref()
            }
        }

        impl Event for $name {
            fn event_name(&self) -> &str {
                self.description.kind.as_str()
            }

            fn platform(&self) -> &'static str {
                PLATFORM
            }

            fn event_type(&self) -> EventType {
                $event_type
            }

            fn as_any(&self) -> &dyn Any {
                self
            }

            fn plain_text(&self) -> String {
                self.description.to_string()
            }

            fn user_id(&self) -> Option<&str> {
                self.description.user_id.as_deref()
            }

            fn bot_id(&self) -> Option<&str> {
                Some(&self.account_id)
            }
        }
    };
}

description_event! {
    /// A request awaiting a decision.
    RequestEvent => EventType::Request
}

description_event! {
    /// A change in group membership.
    NoticeEvent => EventType::Notice
}

description_event! {
    /// Gateway bookkeeping.
    MetaEvent => EventType::Meta
}

description_event! {
    /// Anything the classifier could not place.
    OtherEvent => EventType::Other
}

impl OtherEvent {
    /// An other-event with an empty description.
    pub fn empty(account_id: impl Into<String>) -> Self {
        Self::new(account_id, Description::empty())
    }
}
