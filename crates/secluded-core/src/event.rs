//! Event system for the bridge.
//!
//! - [`Event`] - Base trait for all events
//! - [`EventType`] - Event category (message, request, notice, meta, other)
//! - [`BoxedEvent`] - Type-erased container handed to a dispatcher

use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

// ============================================================================
// Event Type Classification
// ============================================================================

/// Classification of event types.
///
/// This enum represents the high-level category of an event, which lets a
/// dispatcher filter events without knowing the concrete event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// Chat messages.
    Message,
    /// Requests awaiting a decision (friend requests, join requests).
    Request,
    /// Notices about state changes (members joining or leaving).
    Notice,
    /// Meta events (heartbeat and other gateway bookkeeping).
    Meta,
    /// Anything the adapter could not place in the categories above.
    Other,
}

impl EventType {
    /// Returns the wire-facing name of this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Message => "message",
            EventType::Request => "request",
            EventType::Notice => "notice",
            EventType::Meta => "meta_event",
            EventType::Other => "other_event",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "message" => EventType::Message,
            "request" => EventType::Request,
            "notice" => EventType::Notice,
            "meta" | "meta_event" => EventType::Meta,
            _ => EventType::Other,
        })
    }
}

// ============================================================================
// Core Event Trait
// ============================================================================

/// The base trait for all events produced by an adapter.
///
/// Events are type-erased using `dyn Event` and can be downcast to concrete
/// types using `as_any()`.
pub trait Event: Any + Send + Sync {
    /// Returns the name of this event.
    ///
    /// For message events this is the receiving account; for the other
    /// categories it names the sub-kind.
    fn event_name(&self) -> &str;

    /// Returns the platform/adapter name.
    fn platform(&self) -> &'static str;

    /// Returns the high-level event type classification.
    fn event_type(&self) -> EventType {
        EventType::Other
    }

    /// Returns a reference to self as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns the concatenated plain text carried by the event.
    fn plain_text(&self) -> String {
        String::new()
    }

    /// Returns the id of the user that caused this event, if any.
    fn user_id(&self) -> Option<&str> {
        None
    }

    /// Returns a key identifying the conversation this event belongs to.
    fn session_id(&self) -> String {
        String::new()
    }

    /// Returns true if the event is addressed to the bot itself.
    fn is_tome(&self) -> bool {
        false
    }

    /// Returns the bot (account) id associated with this event, if known.
    fn bot_id(&self) -> Option<&str> {
        None
    }
}

// ============================================================================
// Boxed Event
// ============================================================================

/// A type-erased container for events that supports runtime downcasting.
///
/// `BoxedEvent` wraps any type implementing [`Event`] in an `Arc`, so it is
/// cheap to clone into the task that handles it.
#[derive(Clone)]
pub struct BoxedEvent {
    inner: Arc<dyn Event>,
}

impl BoxedEvent {
    /// Creates a new `BoxedEvent` from any type implementing `Event`.
    pub fn new<E: Event + 'static>(event: E) -> Self {
        Self {
            inner: Arc::new(event),
        }
    }

    /// Returns the inner `Arc<dyn Event>`.
    pub fn inner(&self) -> &Arc<dyn Event> {
        &self.inner
    }

    /// Attempts to downcast to a concrete event type.
    pub fn downcast_ref<E: Event + 'static>(&self) -> Option<&E> {
        self.inner.as_any().downcast_ref()
    }
}

impl std::ops::Deref for BoxedEvent {
    type Target = dyn Event;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl fmt::Debug for BoxedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxedEvent")
            .field("event_type", &self.event_type())
            .field("event_name", &self.event_name())
            .field("platform", &self.platform())
            .finish()
    }
}
