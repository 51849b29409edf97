//! Print jobs.

use crate::message::{WireJob, WirePayload};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// File name the bridge reports for rendered documents.
const DEFAULT_FILE_NAME: &str = "file.pdf";

/// A unit of print content bound for one bridge printer queue.
///
/// Jobs are immutable once built. A label job with N segments goes out as N
/// separate frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintJob {
    kind: String,
    content: JobContent,
}

/// What a job prints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum JobContent {
    /// A rendered document (PDF), already base64 encoded.
    Document { file_name: String, base64: String },
    /// Label markup, one printer-language program per segment.
    Labels { segments: Vec<String> },
}

impl PrintJob {
    /// Job for an already encoded document.
    pub fn document(kind: impl Into<String>, base64: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            content: JobContent::Document {
                file_name: DEFAULT_FILE_NAME.to_string(),
                base64: base64.into(),
            },
        }
    }

    /// Job for raw document bytes; encodes them.
    pub fn document_bytes(kind: impl Into<String>, bytes: &[u8]) -> Self {
        Self::document(kind, STANDARD.encode(bytes))
    }

    /// Job carrying one frame per label segment.
    pub fn labels(kind: impl Into<String>, segments: Vec<String>) -> Self {
        Self {
            kind: kind.into(),
            content: JobContent::Labels { segments },
        }
    }

    /// Override the file name reported for a document job.
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        if let JobContent::Document { file_name, .. } = &mut self.content {
            *file_name = name.into();
        }
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn content(&self) -> &JobContent {
        &self.content
    }

    /// Number of frames this job occupies on the wire.
    pub fn frame_count(&self) -> usize {
        match &self.content {
            JobContent::Document { .. } => 1,
            JobContent::Labels { segments } => segments.len(),
        }
    }

    /// Consume the job into its wire frames, in print order.
    pub fn into_frames(self) -> Vec<WireJob> {
        let kind = self.kind;
        match self.content {
            JobContent::Document { file_name, base64 } => vec![WireJob {
                kind,
                payload: WirePayload::Document {
                    url: file_name,
                    file_content: base64,
                },
            }],
            JobContent::Labels { segments } => segments
                .into_iter()
                .map(|raw_content| WireJob {
                    kind: kind.clone(),
                    payload: WirePayload::Raw { raw_content },
                })
                .collect(),
        }
    }
}
