//! Bridge wire messages.
//!
//! Every job segment travels as one self-contained JSON text frame. The
//! `type` field names the bridge-side printer queue, not a message kind.

use serde::{Deserialize, Serialize};

/// One job segment as the bridge receives it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireJob {
    /// Printer queue on the bridge (e.g. "Invoice Printer").
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub payload: WirePayload,
}

/// Content of a single frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WirePayload {
    /// Rendered document, base64 encoded.
    Document { url: String, file_content: String },
    /// Raw printer language (ZPL) passed straight through.
    Raw { raw_content: String },
}

impl WireJob {
    pub fn to_text(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_text(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Status frame a bridge may push back after handling a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeReply {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
