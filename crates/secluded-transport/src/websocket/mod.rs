//! WebSocket transport.

mod client;

pub use client::WsConnector;
