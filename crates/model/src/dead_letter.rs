use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{delta::CorrelationId, envelope::DeltaEnvelope};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum DeadLetterReason {
    Unauthorized,
    Revoked,
    Malformed,
    Invalid,
    RetriesExhausted,
}

/// A delta that will not be processed without manual intervention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetter {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub correlation_id: Option<CorrelationId>,
    pub reason: DeadLetterReason,
    pub detail: String,
    pub body: String,
    /// Whether the delta carried a bearer token. The token itself is never stored.
    pub has_token: bool,
    pub attempts: u32,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl DeadLetter {
    pub fn new(
        envelope: &DeltaEnvelope,
        reason: DeadLetterReason,
        detail: impl Into<String>,
        attempts: u32,
    ) -> Self {
        DeadLetter {
            id: ObjectId::new(),
            correlation_id: envelope.correlation_id.clone(),
            reason,
            detail: detail.into(),
            body: envelope.body.clone(),
            has_token: envelope.bearer_token().is_some(),
            attempts,
            created_at: Utc::now(),
        }
    }
}
