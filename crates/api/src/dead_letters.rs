use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use ledger::Ledger;
use log::error;
use model::dead_letter::DeadLetter;
use serde::{Deserialize, Serialize};
use storage::dead_letter::DeadLetterSink as _;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;

pub fn routes() -> Router<Ledger> {
    Router::new().route("/api/v1/dead-letters", get(list))
}

#[derive(Deserialize)]
struct ListQuery {
    limit: Option<i64>,
}

async fn list(State(ledger): State<Ledger>, Query(query): Query<ListQuery>) -> Response {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    match ledger.dead_letters.list(limit).await {
        Ok(letters) => Json(
            letters
                .into_iter()
                .map(DeadLetterView::from)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(err) => {
            error!("Failed to list dead letters: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetterView {
    pub id: String,
    pub correlation_id: Option<String>,
    pub reason: String,
    pub detail: String,
    pub body: String,
    pub has_token: bool,
    pub attempts: u32,
    pub created_at: String,
}

impl From<DeadLetter> for DeadLetterView {
    fn from(letter: DeadLetter) -> Self {
        DeadLetterView {
            id: letter.id.to_hex(),
            correlation_id: letter.correlation_id.map(|id| id.to_string()),
            reason: letter.reason.to_string(),
            detail: letter.detail,
            body: letter.body,
            has_token: letter.has_token,
            attempts: letter.attempts,
            created_at: letter.created_at.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header::AUTHORIZATION, Request},
    };
    use model::{
        dead_letter::DeadLetterReason, delta::CorrelationId, envelope::DeltaEnvelope,
    };
    use storage::memory::{
        MemoryDeadLetters, MemoryQueue, MemoryRevocations, MemoryWorkloadStore,
    };
    use tower::ServiceExt as _;

    use super::*;
    use crate::router;
    use storage::dead_letter::DeadLetterSink as _;

    #[tokio::test]
    async fn test_lists_latest_letters() {
        let dead_letters = Arc::new(MemoryDeadLetters::new());
        let ledger = Ledger::with_stores(
            Arc::new(MemoryWorkloadStore::new()),
            Arc::new(MemoryQueue::new()),
            dead_letters.clone(),
            Arc::new(MemoryRevocations::new()),
            "secret",
            8,
        );
        for id in ["a", "b", "c"] {
            let envelope = DeltaEnvelope {
                correlation_id: Some(CorrelationId::from(id)),
                authorization: None,
                body: "{}".to_string(),
            };
            dead_letters
                .push(DeadLetter::new(
                    &envelope,
                    DeadLetterReason::Unauthorized,
                    "missing bearer token",
                    1,
                ))
                .await
                .unwrap();
        }

        let token = ledger
            .jwt
            .issue("ops", chrono::Duration::minutes(5))
            .unwrap();
        let request = Request::get("/api/v1/dead-letters?limit=2")
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let response = router(ledger).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let letters = json.as_array().unwrap();
        assert_eq!(letters.len(), 2);
        assert_eq!(letters[0]["correlationId"], "c");
        assert_eq!(letters[0]["reason"], "Unauthorized");
        assert_eq!(letters[0]["hasToken"], false);
    }
}
