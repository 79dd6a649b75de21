use std::sync::Arc;

use log::{debug, info};
use model::{
    decimal::Decimal,
    delta::{CorrelationId, WorkloadDelta},
    workload::WorkloadSummary,
};
use storage::workload::WorkloadRepository;

use crate::error::WorkloadError;

#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    Applied {
        /// Month total after the delta, `None` if the month was pruned.
        hours: Option<Decimal>,
        version: u64,
    },
    /// The correlation id was already applied to this summary.
    Duplicate,
}

/// Folds deltas into per-trainer summaries.
///
/// Read-merge-write runs under optimistic concurrency: a write only lands if
/// nobody else wrote the summary since it was read, otherwise the merge is
/// redone on a fresh copy.
#[derive(Clone)]
pub struct WorkloadLedger {
    repo: Arc<dyn WorkloadRepository>,
    max_retries: u32,
}

impl WorkloadLedger {
    pub fn new(repo: Arc<dyn WorkloadRepository>, max_retries: u32) -> Self {
        WorkloadLedger {
            repo,
            max_retries: max_retries.max(1),
        }
    }

    pub async fn merge(
        &self,
        correlation_id: Option<&CorrelationId>,
        delta: &WorkloadDelta,
    ) -> Result<MergeOutcome, WorkloadError> {
        let key = delta.month_key();
        for attempt in 1..=self.max_retries {
            let current = self.repo.find(&delta.trainer_username).await?;
            if let (Some(id), Some(summary)) = (correlation_id, current.as_ref()) {
                if summary.has_applied(id) {
                    info!(
                        "Delta {} for {} already applied, skipping",
                        id, delta.trainer_username
                    );
                    return Ok(MergeOutcome::Duplicate);
                }
            }

            let mut summary = WorkloadSummary::merge(current, delta)?;
            if let Some(id) = correlation_id {
                summary.remember(id.clone());
            }
            let hours = summary.hours(&key.year, &key.month);

            match self.repo.save(&summary).await {
                Ok(version) => {
                    info!(
                        "{} {}h for {} in {}: month total {}",
                        delta.action_type,
                        delta.training_duration,
                        delta.trainer_username,
                        key,
                        hours.map(|h| h.to_string()).unwrap_or_else(|| "pruned".to_string())
                    );
                    return Ok(MergeOutcome::Applied { hours, version });
                }
                Err(err) if err.is_conflict() => {
                    debug!(
                        "Write conflict on {} (attempt {}), retrying",
                        delta.trainer_username, attempt
                    );
                    tokio::task::yield_now().await;
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(WorkloadError::TooManyConflicts {
            trainer: delta.trainer_username.clone(),
            attempts: self.max_retries,
        })
    }

    pub async fn get(&self, trainer: &str) -> Result<Option<WorkloadSummary>, WorkloadError> {
        Ok(self.repo.find(trainer).await?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use model::delta::ActionType;
    use storage::{memory::MemoryWorkloadStore, workload::WorkloadRepository as _};

    use super::*;

    pub fn delta(action: ActionType, day: u32, hours: f64) -> WorkloadDelta {
        WorkloadDelta {
            trainer_username: "john.doe".to_string(),
            trainer_first_name: "John".to_string(),
            trainer_last_name: "Doe".to_string(),
            is_active: true,
            training_date: NaiveDate::from_ymd_opt(2023, 10, day).unwrap(),
            training_duration: Decimal::from(hours),
            action_type: action,
        }
    }

    fn ledger() -> (Arc<MemoryWorkloadStore>, WorkloadLedger) {
        let store = Arc::new(MemoryWorkloadStore::new());
        let ledger = WorkloadLedger::new(store.clone(), 1000);
        (store, ledger)
    }

    #[tokio::test]
    async fn test_merge_persists() {
        let (store, ledger) = ledger();
        ledger
            .merge(None, &delta(ActionType::Add, 1, 2.5))
            .await
            .unwrap();
        let outcome = ledger
            .merge(None, &delta(ActionType::Add, 15, 1.0))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            MergeOutcome::Applied {
                hours: Some(Decimal::from(3.5)),
                version: 2
            }
        );

        let outcome = ledger
            .merge(None, &delta(ActionType::Delete, 20, 3.5))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            MergeOutcome::Applied {
                hours: None,
                version: 3
            }
        );
        let summary = store.get("john.doe").unwrap();
        assert!(summary.year("2023").unwrap().months.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_correlation_id_is_skipped() {
        let (store, ledger) = ledger();
        let id = CorrelationId::from("tx-1");
        let add = delta(ActionType::Add, 1, 2.0);
        ledger.merge(Some(&id), &add).await.unwrap();
        assert_eq!(
            ledger.merge(Some(&id), &add).await.unwrap(),
            MergeOutcome::Duplicate
        );
        assert_eq!(
            store.get("john.doe").unwrap().hours("2023", "10"),
            Some(Decimal::int(2))
        );

        // Without an id every delivery counts.
        ledger.merge(None, &add).await.unwrap();
        ledger.merge(None, &add).await.unwrap();
        assert_eq!(
            store.get("john.doe").unwrap().hours("2023", "10"),
            Some(Decimal::int(6))
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_merges_do_not_lose_updates() {
        let (store, ledger) = ledger();
        let mut handles = Vec::new();
        for i in 0..32 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                let id = CorrelationId::from(format!("tx-{}", i));
                ledger
                    .merge(Some(&id), &delta(ActionType::Add, 1 + i % 28, 0.5))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        let summary = store.get("john.doe").unwrap();
        assert_eq!(summary.hours("2023", "10"), Some(Decimal::int(16)));
        assert_eq!(summary.version, 32);
    }

    #[tokio::test]
    async fn test_overflow_is_not_persisted() {
        let (store, ledger) = ledger();
        ledger
            .merge(None, &delta(ActionType::Add, 1, 1.0))
            .await
            .unwrap();
        let mut summary = store.get("john.doe").unwrap();
        summary.years[0].months[0].total_hours = Decimal::int(i64::MAX / 10_000);
        store.save(&summary).await.unwrap();

        let err = ledger
            .merge(None, &delta(ActionType::Add, 2, 1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkloadError::Unmergeable(_)));
        let stored = store.get("john.doe").unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(
            stored.hours("2023", "10"),
            Some(Decimal::int(i64::MAX / 10_000))
        );
    }

    #[tokio::test]
    async fn test_storage_failure_leaves_summary_untouched() {
        let (store, ledger) = ledger();
        ledger
            .merge(None, &delta(ActionType::Add, 1, 1.0))
            .await
            .unwrap();
        store.set_unavailable(true);
        let err = ledger
            .merge(None, &delta(ActionType::Add, 2, 1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkloadError::Store(_)));
        store.set_unavailable(false);
        assert_eq!(
            store.get("john.doe").unwrap().hours("2023", "10"),
            Some(Decimal::int(1))
        );
    }
}
