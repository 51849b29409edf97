//! Per-record state-transition actions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// State transition requested for one invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Deliver,
    Return,
    Cancel,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Deliver, Action::Return, Action::Cancel];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Deliver => "deliver",
            Action::Return => "return",
            Action::Cancel => "cancel",
        }
    }

    /// Workflow state a record lands in once the action is applied.
    pub fn target_state(self) -> &'static str {
        match self {
            Action::Deliver => "Delivered",
            Action::Return => "Returned",
            Action::Cancel => "Cancelled",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseActionError(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action {0:?}, expected one of: deliver, return, cancel")]
pub struct ParseActionError(pub String);

/// One record paired with the action to apply to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionItem {
    pub record_id: String,
    pub action: Action,
}

impl ActionItem {
    pub fn new(record_id: impl Into<String>, action: Action) -> Self {
        Self {
            record_id: record_id.into(),
            action,
        }
    }
}

impl fmt::Display for ActionItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.action, self.record_id)
    }
}
