use async_trait::async_trait;
use bson::doc;
use chrono::{DateTime, Utc};
use log::info;
use mongodb::{options::UpdateOptions, Collection, Database};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

const COLLECTION: &str = "revoked_tokens";

/// Denylist of bearer tokens that must be refused even if their signature is valid.
#[async_trait]
pub trait TokenRevocationStore: Send + Sync {
    async fn contains(&self, token: &str) -> Result<bool, StoreError>;

    async fn revoke(&self, token: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct RevokedToken {
    #[serde(rename = "_id")]
    token: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    revoked_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct RevocationStore {
    tokens: Collection<RevokedToken>,
}

impl RevocationStore {
    pub(crate) fn new(db: &Database) -> Self {
        RevocationStore {
            tokens: db.collection(COLLECTION),
        }
    }
}

#[async_trait]
impl TokenRevocationStore for RevocationStore {
    async fn contains(&self, token: &str) -> Result<bool, StoreError> {
        Ok(self
            .tokens
            .find_one(doc! { "_id": token })
            .await?
            .is_some())
    }

    async fn revoke(&self, token: &str) -> Result<(), StoreError> {
        info!("Revoking token");
        self.tokens
            .update_one(
                doc! { "_id": token },
                doc! { "$setOnInsert": { "revoked_at": Utc::now() } },
            )
            .with_options(UpdateOptions::builder().upsert(true).build())
            .await?;
        Ok(())
    }
}
