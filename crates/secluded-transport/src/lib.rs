//! # Secluded Transport
//!
//! Concrete implementations of the transport contracts defined in
//! `secluded-core`.
//!
//! ## Features
//!
//! - `ws-client` (default): websocket client connector
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use secluded_core::Connector;
//! use secluded_transport::WsConnector;
//!
//! let connection = WsConnector::new().connect("ws://127.0.0.1:8080").await?;
//! ```

#[cfg(feature = "ws-client")]
pub mod websocket;

#[cfg(feature = "ws-client")]
pub use websocket::WsConnector;
