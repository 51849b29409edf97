//! Client for a local print bridge.
//!
//! [`BridgeClient`] keeps one WebSocket open to the bridge, reconnects on
//! its own when the socket drops, and pushes print jobs through it. Jobs
//! are fire-and-forget: anything submitted while the socket is down is
//! dropped, never queued.

mod client;
mod config;
mod handlers;

pub use client::BridgeClient;
pub use config::{BridgeConfig, ReconnectPolicy};
pub use handlers::BridgeHandlers;

pub use printbridge_core::{ConfigurationError, ConnectionState, Endpoint, PrintJob};
