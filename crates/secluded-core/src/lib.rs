//! # Secluded Core
//!
//! Protocol-independent contracts shared by the gateway bridge crates.
//!
//! The bridge is split the same way the rest of the workspace is:
//!
//! ```text
//! ┌──────────────────────┐
//! │  secluded-runtime    │  config, logging, process lifecycle
//! ├──────────────────────┤
//! │  secluded-adapter    │  wire codec, classifier, session, supervisor
//! ├──────────────────────┤
//! │  secluded-core       │  <- This crate (traits and error types)
//! ├──────────────────────┤
//! │  secluded-transport  │  websocket connector
//! └──────────────────────┘
//! ```
//!
//! - **Events**: [`Event`], [`EventType`] and the type-erased [`BoxedEvent`]
//! - **Messages**: [`MessageSegment`] and [`Message`]
//! - **Bots**: [`Bot`], the handle a dispatcher uses to talk back
//! - **Transport**: [`Connector`], [`FrameSink`], [`FrameSource`]
//! - **Dispatch**: [`Dispatcher`], the contract the bridge drives

pub mod bot;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod message;
pub mod transport;

pub use bot::{Bot, BoxedBot, downcast_bot};
pub use dispatcher::{BotLifecycle, ChannelDispatcher, Dispatcher};
pub use error::{ApiError, ApiResult, TransportError, TransportResult};
pub use event::{BoxedEvent, Event, EventType};
pub use message::{Message, MessageSegment};
pub use transport::{BoxedConnector, Connection, Connector, FrameSink, FrameSource};
