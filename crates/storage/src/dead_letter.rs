use async_trait::async_trait;
use bson::doc;
use futures_util::TryStreamExt as _;
use log::warn;
use model::dead_letter::DeadLetter;
use mongodb::{Collection, Database};

use crate::error::StoreError;

const COLLECTION: &str = "workload_dead_letters";

#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    async fn push(&self, letter: DeadLetter) -> Result<(), StoreError>;

    /// Most recent letters first.
    async fn list(&self, limit: i64) -> Result<Vec<DeadLetter>, StoreError>;
}

#[derive(Clone)]
pub struct DeadLetterStore {
    letters: Collection<DeadLetter>,
}

impl DeadLetterStore {
    pub(crate) fn new(db: &Database) -> Self {
        DeadLetterStore {
            letters: db.collection(COLLECTION),
        }
    }
}

#[async_trait]
impl DeadLetterSink for DeadLetterStore {
    async fn push(&self, letter: DeadLetter) -> Result<(), StoreError> {
        warn!(
            "Dead letter {:?}: {} ({})",
            letter.correlation_id, letter.reason, letter.detail
        );
        self.letters.insert_one(letter).await?;
        Ok(())
    }

    async fn list(&self, limit: i64) -> Result<Vec<DeadLetter>, StoreError> {
        let cursor = self
            .letters
            .find(doc! {})
            .sort(doc! { "created_at": -1 })
            .limit(limit)
            .await?;
        Ok(cursor.try_collect().await?)
    }
}
