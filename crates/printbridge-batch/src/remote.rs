//! The remote state-change operation.

use async_trait::async_trait;
use printbridge_core::Action;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Applies one action to one record on the system of record.
///
/// Implementations report "already in the target state" as a
/// [`OutcomeStatus::Failure`] outcome rather than an error.
#[async_trait]
pub trait StateChange: Send + Sync {
    async fn apply_action(
        &self,
        record_id: &str,
        action: Action,
    ) -> Result<ActionOutcome, RemoteCallError>;
}

#[async_trait]
impl<T: StateChange + ?Sized> StateChange for Arc<T> {
    async fn apply_action(
        &self,
        record_id: &str,
        action: Action,
    ) -> Result<ActionOutcome, RemoteCallError> {
        (**self).apply_action(record_id, action).await
    }
}

/// Response of the state-change operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub status: OutcomeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Failure,
}

impl ActionOutcome {
    pub fn success() -> Self {
        Self {
            status: OutcomeStatus::Success,
            detail: None,
        }
    }

    pub fn failure(detail: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Failure,
            detail: Some(detail.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

/// Why one remote call did not apply its action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteCallError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("remote returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("could not decode response: {0}")]
    Decode(String),
    #[error("no response within {0:?}")]
    Timeout(Duration),
    #[error("remote refused the action{}", .detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
    Rejected { detail: Option<String> },
}
