//! Sequential batch processing of invoice state transitions.
//!
//! [`BatchOrchestrator`] walks a list of [`ActionItem`]s strictly in order,
//! one remote call at a time, and folds the outcomes into a single
//! [`BatchResult`]. A failed item is counted and skipped past; it never
//! stops the batch.

mod http;
mod orchestrator;
mod remote;

pub use http::HttpStateChange;
pub use orchestrator::{BatchConfig, BatchOrchestrator, BatchResult, ItemFailure, NoActionsError};
pub use remote::{ActionOutcome, OutcomeStatus, RemoteCallError, StateChange};

pub use printbridge_core::{Action, ActionItem};
