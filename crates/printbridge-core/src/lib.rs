//! Core types for printbridge.
//!
//! This crate holds the data shared by the bridge client and the batch
//! processor: endpoints, print jobs and their wire form, and the batch
//! action vocabulary. It does no I/O.

mod action;
mod endpoint;
mod job;
pub mod labels;
mod message;

pub use action::{Action, ActionItem, ParseActionError};
pub use endpoint::{ConfigurationError, Endpoint};
pub use job::{JobContent, PrintJob};
pub use message::{BridgeReply, WireJob, WirePayload};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default address of a locally running hardware bridge.
pub const DEFAULT_ENDPOINT: &str = "ws://127.0.0.1:12212/printer";

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No socket, and no attempt in flight.
    #[default]
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Handshake done; jobs go out on the wire.
    Connected,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(s)
    }
}
