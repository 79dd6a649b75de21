use std::time::Duration;

use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use chrono::{DateTime, Utc};
use model::envelope::DeltaEnvelope;
use mongodb::{
    options::{FindOneAndUpdateOptions, ReturnDocument},
    Collection, Database, IndexModel,
};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

const COLLECTION: &str = "workload_queue";

/// A message claimed from the queue. Stays invisible to other consumers until
/// acked, nacked, or its visibility timeout runs out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedDelta {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub envelope: DeltaEnvelope,
    /// Deliveries so far, including the current one.
    pub attempts: u32,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub available_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl QueuedDelta {
    pub fn new(envelope: DeltaEnvelope) -> Self {
        let now = Utc::now();
        QueuedDelta {
            id: ObjectId::new(),
            envelope,
            attempts: 0,
            available_at: now,
            created_at: now,
        }
    }
}

/// Durable at-least-once delivery of delta envelopes.
#[async_trait]
pub trait DeltaQueue: Send + Sync {
    /// Returns once the message is durably stored.
    async fn publish(&self, envelope: DeltaEnvelope) -> Result<(), StoreError>;

    async fn receive(&self, visibility: Duration) -> Result<Option<QueuedDelta>, StoreError>;

    async fn ack(&self, id: ObjectId) -> Result<(), StoreError>;

    /// Makes the message visible again after `delay`.
    async fn nack(&self, id: ObjectId, delay: Duration) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct QueueStore {
    queue: Collection<QueuedDelta>,
}

impl QueueStore {
    pub(crate) async fn new(db: &Database) -> Result<Self, StoreError> {
        let queue: Collection<QueuedDelta> = db.collection(COLLECTION);
        queue
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "available_at": 1, "created_at": 1 })
                    .build(),
            )
            .await?;
        Ok(QueueStore { queue })
    }
}

#[async_trait]
impl DeltaQueue for QueueStore {
    async fn publish(&self, envelope: DeltaEnvelope) -> Result<(), StoreError> {
        self.queue.insert_one(QueuedDelta::new(envelope)).await?;
        Ok(())
    }

    async fn receive(&self, visibility: Duration) -> Result<Option<QueuedDelta>, StoreError> {
        let now = Utc::now();
        let hidden_until = now + to_chrono(visibility);
        let options = FindOneAndUpdateOptions::builder()
            .sort(doc! { "created_at": 1 })
            .return_document(ReturnDocument::After)
            .build();
        Ok(self
            .queue
            .find_one_and_update(
                doc! { "available_at": { "$lte": now } },
                doc! {
                    "$set": { "available_at": hidden_until },
                    "$inc": { "attempts": 1 }
                },
            )
            .with_options(options)
            .await?)
    }

    async fn ack(&self, id: ObjectId) -> Result<(), StoreError> {
        self.queue.delete_one(doc! { "_id": id }).await?;
        Ok(())
    }

    async fn nack(&self, id: ObjectId, delay: Duration) -> Result<(), StoreError> {
        let available_at = Utc::now() + to_chrono(delay);
        self.queue
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "available_at": available_at } },
            )
            .await?;
        Ok(())
    }
}

pub(crate) fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero())
}
