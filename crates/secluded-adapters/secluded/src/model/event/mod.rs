//! Domain events.
//!
//! ```text
//! SecludedEvent
//! ├── Message(MessageEvent)   ← "message"
//! ├── Request(RequestEvent)   ← "request"
//! ├── Notice(NoticeEvent)     ← "notice"
//! ├── Meta(MetaEvent)         ← "meta_event"
//! └── Other(OtherEvent)       ← "other_event"
//! ```
//!
//! Every variant also implements [`Event`] on its own, so the classifier
//! output can be boxed either as the enum or as the concrete variant.

pub mod description;
pub mod message;

use std::any::Any;

use secluded_core::{BoxedEvent, Event, EventType};

pub use description::*;
pub use message::*;

/// Platform name reported by every event.
pub const PLATFORM: &str = "secluded";

/// Any event produced by the classifier.
#[derive(Debug, Clone, PartialEq)]
pub enum SecludedEvent {
    Message(MessageEvent),
    Request(RequestEvent),
    Notice(NoticeEvent),
    Meta(MetaEvent),
    Other(OtherEvent),
}

impl SecludedEvent {
    fn inner(&self) -> &dyn Event {
        match self {
            SecludedEvent::Message(e) => e,
            SecludedEvent::Request(e) => e,
            SecludedEvent::Notice(e) => e,
            SecludedEvent::Meta(e) => e,
            SecludedEvent::Other(e) => e,
        }
    }

    /// Returns the message event, if this is one.
    pub fn as_message(&self) -> Option<&MessageEvent> {
        match self {
            SecludedEvent::Message(e) => Some(e),
            _ => None,
        }
    }

    /// Boxes the concrete variant for dispatch.
    pub fn into_boxed(self) -> BoxedEvent {
        match self {
            SecludedEvent::Message(e) => BoxedEvent::new(e),
            SecludedEvent::Request(e) => BoxedEvent::new(e),
            SecludedEvent::Notice(e) => BoxedEvent::new(e),
            SecludedEvent::Meta(e) => BoxedEvent::new(e),
            SecludedEvent::Other(e) => BoxedEvent::new(e),
        }
    }
}

impl Event for SecludedEvent {
    fn event_name(&self) -> &str {
        self.inner().event_name()
    }

    fn platform(&self) -> &'static str {
        PLATFORM
    }

    fn event_type(&self) -> EventType {
        self.inner().event_type()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn plain_text(&self) -> String {
        self.inner().plain_text()
    }

    fn user_id(&self) -> Option<&str> {
        self.inner().user_id()
    }

    fn session_id(&self) -> String {
        self.inner().session_id()
    }

    fn is_tome(&self) -> bool {
        self.inner().is_tome()
    }

    fn bot_id(&self) -> Option<&str> {
        self.inner().bot_id()
    }
}

macro_rules! impl_from_variant {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for SecludedEvent {
                fn from(event: $ty) -> Self {
                    SecludedEvent::$variant(event)
                }
            }
        )*
    };
}

impl_from_variant!(
    Message(MessageEvent),
    Request(RequestEvent),
    Notice(NoticeEvent),
    Meta(MetaEvent),
    Other(OtherEvent),
);
