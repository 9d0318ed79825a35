//! # Secluded Adapter
//!
//! Bridges a Secluded messaging gateway to a [`Dispatcher`](secluded_core::Dispatcher).
//!
//! ## Overview
//!
//! The gateway speaks a compact JSON command protocol over a websocket.
//! This crate handles:
//!
//! - Frame decoding and encoding ([`codec`], [`model::wire`])
//! - Turning frames into typed events ([`classify`])
//! - The handshake and account discovery ([`session`])
//! - Reconnecting forever with a fixed backoff ([`supervisor`])
//! - Sending messages back ([`SecludedBot`])
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use secluded_adapter::{ReconnectSupervisor, SecludedConfig};
//! use secluded_core::ChannelDispatcher;
//! use secluded_transport::WsConnector;
//!
//! let (dispatcher, mut rx) = ChannelDispatcher::new(64);
//! let supervisor = ReconnectSupervisor::new(
//!     SecludedConfig::new("ws://127.0.0.1:8080/ws", "token"),
//!     Arc::new(WsConnector::new()),
//!     Arc::new(dispatcher),
//! );
//! let handle = supervisor.spawn();
//!
//! while let Some(item) = rx.recv().await {
//!     println!("{item:?}");
//! }
//! handle.shutdown().await;
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! socket ─▶ Session::receive ─▶ classify ─▶ Dispatcher::dispatch (own task)
//! SecludedBot::send_to ─▶ codec::encode_outbound_message ─▶ SessionSlot ─▶ socket
//! ```

pub mod bot;
pub mod classify;
pub mod codec;
pub mod config;
pub mod error;
pub mod model;
pub mod session;
pub mod supervisor;

#[cfg(test)]
pub(crate) mod testing;

pub use bot::{MessageTarget, SecludedBot};
pub use config::SecludedConfig;
pub use error::{ClassifyError, DecodeError, SessionError};
pub use model::{
    Description, DescriptionKind, MessageEvent, MetaEvent, NoticeEvent, OtherEvent, RequestEvent,
    SecludedEvent, SecludedMessage, Segment,
};
pub use session::{Credentials, Session, SessionSlot, SessionState};
pub use supervisor::{RECONNECT_DELAY, ReconnectSupervisor, SupervisorHandle};
