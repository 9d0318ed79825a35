//! Data model: wire records and domain types.

pub mod event;
pub mod message;
pub mod segment;
pub mod wire;

pub use event::{
    Description, DescriptionKind, MessageEvent, MetaEvent, NoticeEvent, OtherEvent, PLATFORM,
    RequestEvent, SecludedEvent,
};
pub use message::SecludedMessage;
pub use segment::Segment;
pub use wire::{InboundCommand, InboundFrame, OutboundCommand, OutboundFrame, ResponseFrame};
