//! Batch orchestrator.

use crate::remote::{RemoteCallError, StateChange};
use printbridge_core::ActionItem;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Orchestrator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Upper bound on one remote call. A call that runs over counts as
    /// failed and the batch moves on.
    pub call_timeout: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(30),
        }
    }
}

/// An empty batch was submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no actions selected")]
pub struct NoActionsError;

/// One item the remote did not apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub item: ActionItem,
    pub error: RemoteCallError,
}

/// Aggregate outcome of a batch.
///
/// `applied() + failed()` always equals the number of items submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    applied: Vec<ActionItem>,
    failures: Vec<ItemFailure>,
}

impl BatchResult {
    pub fn applied(&self) -> usize {
        self.applied.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn total(&self) -> usize {
        self.applied() + self.failed()
    }

    /// Partial progress counts: the batch succeeded if anything applied.
    pub fn is_success(&self) -> bool {
        !self.applied.is_empty()
    }

    /// Items the remote applied, in order.
    pub fn applied_items(&self) -> &[ActionItem] {
        &self.applied
    }

    /// Failed items, in the order they were attempted.
    pub fn failures(&self) -> &[ItemFailure] {
        &self.failures
    }

    /// The failed items, ready to resubmit as a new batch.
    pub fn failed_items(&self) -> Vec<ActionItem> {
        self.failures.iter().map(|f| f.item.clone()).collect()
    }

    /// One-line message for the user.
    pub fn summary(&self) -> String {
        match (self.applied(), self.failed()) {
            (0, failed) => format!("No actions applied ({failed} failed)"),
            (applied, 0) => format!("Applied {applied} of {applied} actions"),
            (applied, failed) => format!(
                "Applied {applied} of {} actions ({failed} failed)",
                applied + failed
            ),
        }
    }

    fn record_applied(&mut self, item: ActionItem) {
        self.applied.push(item);
    }

    fn record_failed(&mut self, item: ActionItem, error: RemoteCallError) {
        self.failures.push(ItemFailure { item, error });
    }
}

impl fmt::Display for BatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Applies batches of actions one item at a time.
///
/// Items are never run concurrently, reordered, or merged, even when
/// several target the same record: later actions observe the effect of
/// earlier ones. Failed items are not retried.
pub struct BatchOrchestrator<S> {
    remote: S,
    config: BatchConfig,
}

impl<S: StateChange> BatchOrchestrator<S> {
    pub fn new(remote: S) -> Self {
        Self::with_config(remote, BatchConfig::default())
    }

    pub fn with_config(remote: S, config: BatchConfig) -> Self {
        Self { remote, config }
    }

    pub fn remote(&self) -> &S {
        &self.remote
    }

    /// Apply every item in order and report the tally.
    ///
    /// Fails only for an empty batch, before any remote call. Per-item
    /// failures are folded into the result.
    pub async fn apply_batch(
        &self,
        items: impl IntoIterator<Item = ActionItem>,
    ) -> Result<BatchResult, NoActionsError> {
        let items: Vec<ActionItem> = items.into_iter().collect();
        if items.is_empty() {
            return Err(NoActionsError);
        }

        let total = items.len();
        info!("Applying {} action(s)", total);

        let mut result = BatchResult::default();
        for (index, item) in items.into_iter().enumerate() {
            match self.apply_one(&item).await {
                Ok(()) => {
                    debug!("[{}/{}] {} applied", index + 1, total, item);
                    result.record_applied(item);
                }
                Err(e) => {
                    warn!("[{}/{}] {} failed: {}", index + 1, total, item, e);
                    result.record_failed(item, e);
                }
            }
        }

        if result.is_success() {
            info!("Batch done: {}", result.summary());
        } else {
            warn!("Batch failed: {}", result.summary());
        }
        Ok(result)
    }

    async fn apply_one(&self, item: &ActionItem) -> Result<(), RemoteCallError> {
        let call = self.remote.apply_action(&item.record_id, item.action);
        let outcome = tokio::time::timeout(self.config.call_timeout, call)
            .await
            .map_err(|_| RemoteCallError::Timeout(self.config.call_timeout))??;

        if outcome.is_success() {
            Ok(())
        } else {
            Err(RemoteCallError::Rejected {
                detail: outcome.detail,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::ActionOutcome;
    use async_trait::async_trait;
    use printbridge_core::Action;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// How the fake remote answers a given record.
    #[derive(Clone)]
    enum Reply {
        Fail,
        Error,
        Hang,
    }

    /// Records calls and checks no two overlap.
    #[derive(Default)]
    struct FakeRemote {
        replies: HashMap<String, Reply>,
        calls: Mutex<Vec<(String, Action)>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl FakeRemote {
        fn with(mut self, record: &str, reply: Reply) -> Self {
            self.replies.insert(record.to_string(), reply);
            self
        }

        fn calls(&self) -> Vec<(String, Action)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StateChange for FakeRemote {
        async fn apply_action(
            &self,
            record_id: &str,
            action: Action,
        ) -> Result<ActionOutcome, RemoteCallError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.calls
                .lock()
                .unwrap()
                .push((record_id.to_string(), action));

            // Yield so an overlapping caller would be observed.
            tokio::time::sleep(Duration::from_millis(5)).await;

            let reply = self.replies.get(record_id).cloned();
            if matches!(reply, Some(Reply::Hang)) {
                std::future::pending::<()>().await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match reply {
                None => Ok(ActionOutcome::success()),
                Some(Reply::Fail) => Ok(ActionOutcome::failure(format!(
                    "{record_id} is already {}",
                    action.target_state()
                ))),
                Some(Reply::Error) => Err(RemoteCallError::Transport("connection reset".into())),
                Some(Reply::Hang) => unreachable!(),
            }
        }
    }

    fn item(id: &str, action: Action) -> ActionItem {
        ActionItem::new(id, action)
    }

    #[tokio::test]
    async fn empty_batch_makes_no_calls() {
        let orchestrator = BatchOrchestrator::new(FakeRemote::default());
        let err = orchestrator.apply_batch(Vec::new()).await.unwrap_err();
        assert_eq!(err, NoActionsError);
        assert!(orchestrator.remote().calls().is_empty());
    }

    #[tokio::test]
    async fn partial_failure_keeps_going_in_order() {
        let remote = FakeRemote::default().with("B", Reply::Fail);
        let orchestrator = BatchOrchestrator::new(remote);

        let result = orchestrator
            .apply_batch([
                item("A", Action::Deliver),
                item("B", Action::Cancel),
                item("C", Action::Deliver),
            ])
            .await
            .unwrap();

        assert_eq!((result.applied(), result.failed()), (2, 1));
        assert!(result.is_success());
        assert_eq!(
            orchestrator.remote().calls(),
            vec![
                ("A".to_string(), Action::Deliver),
                ("B".to_string(), Action::Cancel),
                ("C".to_string(), Action::Deliver),
            ]
        );
        assert_eq!(
            orchestrator.remote().max_in_flight.load(Ordering::SeqCst),
            1
        );
        assert_eq!(result.failed_items(), vec![item("B", Action::Cancel)]);
        assert_eq!(
            result.applied_items(),
            [item("A", Action::Deliver), item("C", Action::Deliver)]
        );
        assert_eq!(
            result.failures()[0].error,
            RemoteCallError::Rejected {
                detail: Some("B is already Cancelled".into())
            }
        );
        assert_eq!(result.summary(), "Applied 2 of 3 actions (1 failed)");
    }

    #[tokio::test]
    async fn same_record_is_not_merged() {
        let orchestrator = BatchOrchestrator::new(FakeRemote::default());
        let result = orchestrator
            .apply_batch([
                item("INV-1", Action::Deliver),
                item("INV-1", Action::Return),
                item("INV-1", Action::Cancel),
            ])
            .await
            .unwrap();

        assert_eq!(result.applied(), 3);
        let actions: Vec<_> = orchestrator
            .remote()
            .calls()
            .into_iter()
            .map(|(_, a)| a)
            .collect();
        assert_eq!(actions, [Action::Deliver, Action::Return, Action::Cancel]);
    }

    #[tokio::test]
    async fn nothing_applied_is_failure() {
        let remote = FakeRemote::default()
            .with("A", Reply::Error)
            .with("B", Reply::Fail);
        let orchestrator = BatchOrchestrator::new(remote);
        let result = orchestrator
            .apply_batch([item("A", Action::Return), item("B", Action::Return)])
            .await
            .unwrap();

        assert_eq!((result.applied(), result.failed()), (0, 2));
        assert!(!result.is_success());
        assert_eq!(result.summary(), "No actions applied (2 failed)");
        assert!(matches!(
            result.failures()[0].error,
            RemoteCallError::Transport(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_call_times_out_and_batch_continues() {
        let remote = FakeRemote::default().with("slow", Reply::Hang);
        let config = BatchConfig {
            call_timeout: Duration::from_secs(2),
        };
        let orchestrator = BatchOrchestrator::with_config(remote, config);

        let result = orchestrator
            .apply_batch([item("slow", Action::Deliver), item("fast", Action::Deliver)])
            .await
            .unwrap();

        assert_eq!((result.applied(), result.failed()), (1, 1));
        assert_eq!(
            result.failures()[0].error,
            RemoteCallError::Timeout(Duration::from_secs(2))
        );
        assert_eq!(orchestrator.remote().calls().len(), 2);
    }

    #[tokio::test]
    async fn counts_always_add_up() {
        for len in 1..=12usize {
            let mut remote = FakeRemote::default();
            for i in (0..len).filter(|i| i % 3 == 1) {
                remote = remote.with(&format!("R{i}"), Reply::Fail);
            }
            let items: Vec<_> = (0..len)
                .map(|i| item(&format!("R{i}"), Action::ALL[i % 3]))
                .collect();

            let result = BatchOrchestrator::new(remote)
                .apply_batch(items)
                .await
                .unwrap();
            assert_eq!(result.applied() + result.failed(), len);
            assert_eq!(result.failures().len(), result.failed());
        }
    }

    #[test]
    fn summary_when_everything_applies() {
        let mut result = BatchResult::default();
        result.record_applied(item("A", Action::Deliver));
        result.record_applied(item("B", Action::Deliver));
        assert_eq!(result.to_string(), "Applied 2 of 2 actions");
    }
}
