use async_trait::async_trait;
use bson::doc;
use log::debug;
use model::workload::WorkloadSummary;
use mongodb::{error::ErrorKind, Collection, Database};

use crate::error::StoreError;

const COLLECTION: &str = "workload";

/// Versioned persistence of workload summaries keyed by trainer username.
#[async_trait]
pub trait WorkloadRepository: Send + Sync {
    async fn find(&self, trainer: &str) -> Result<Option<WorkloadSummary>, StoreError>;

    /// Writes the summary if the stored version still equals `summary.version`
    /// (zero meaning "not stored yet"). Returns the new version.
    async fn save(&self, summary: &WorkloadSummary) -> Result<u64, StoreError>;
}

#[derive(Clone)]
pub struct WorkloadStore {
    workload: Collection<WorkloadSummary>,
}

impl WorkloadStore {
    pub(crate) fn new(db: &Database) -> Self {
        WorkloadStore {
            workload: db.collection(COLLECTION),
        }
    }
}

#[async_trait]
impl WorkloadRepository for WorkloadStore {
    async fn find(&self, trainer: &str) -> Result<Option<WorkloadSummary>, StoreError> {
        Ok(self.workload.find_one(doc! { "_id": trainer }).await?)
    }

    async fn save(&self, summary: &WorkloadSummary) -> Result<u64, StoreError> {
        let expected = summary.version;
        let mut next = summary.clone();
        next.version = expected + 1;

        if expected == 0 {
            debug!("Creating workload for {}", summary.trainer_username);
            return match self.workload.insert_one(&next).await {
                Ok(_) => Ok(next.version),
                Err(err) if is_duplicate_key(&err) => Err(StoreError::Conflict {
                    trainer: summary.trainer_username.clone(),
                    version: expected,
                }),
                Err(err) => Err(err.into()),
            };
        }

        let result = self
            .workload
            .replace_one(
                doc! { "_id": &summary.trainer_username, "version": expected as i64 },
                &next,
            )
            .await?;
        if result.matched_count == 0 {
            return Err(StoreError::Conflict {
                trainer: summary.trainer_username.clone(),
                version: expected,
            });
        }
        debug!(
            "Workload for {} saved at version {}",
            summary.trainer_username, next.version
        );
        Ok(next.version)
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(mongodb::error::WriteFailure::WriteError(write)) => write.code == 11000,
        _ => false,
    }
}
