use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use ledger::{service::consumer::Outcome, Ledger};
use log::{debug, error};
use model::{
    delta::CorrelationId,
    envelope::{DeltaEnvelope, AUTHORIZATION, TRANSACTION_ID},
    workload::WorkloadSummary,
};
use serde::Serialize;

use crate::auth::Caller;

pub fn write_routes() -> Router<Ledger> {
    Router::new().route("/api/v1/working-hours", post(register))
}

pub fn read_routes() -> Router<Ledger> {
    Router::new().route("/api/v1/working-hours/:username", get(summary))
}

/// Synchronous delta delivery. Authentication happens inside the consumer so
/// rejected deltas land in the dead-letter sink like queued ones.
async fn register(State(ledger): State<Ledger>, headers: HeaderMap, body: String) -> StatusCode {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };
    let envelope = DeltaEnvelope {
        correlation_id: header(TRANSACTION_ID).map(CorrelationId::from),
        authorization: header(AUTHORIZATION),
        body,
    };

    match ledger.consumer.handle(&envelope, 1).await {
        Outcome::Done(outcome) => {
            debug!("Delta {:?} settled: {:?}", envelope.correlation_id, outcome);
            StatusCode::OK
        }
        Outcome::Rejected(rejection) if rejection.is_auth() => StatusCode::UNAUTHORIZED,
        Outcome::Rejected(_) => StatusCode::BAD_REQUEST,
        Outcome::Retry(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn summary(
    State(ledger): State<Ledger>,
    Extension(caller): Extension<Caller>,
    Path(username): Path<String>,
) -> Response {
    debug!("{} reads workload of {}", caller.0, username);
    match ledger.workload.get(&username).await {
        Ok(Some(summary)) => Json(SummaryView::from(summary)).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to load workload of {}: {}", username, err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryView {
    pub trainer_username: String,
    pub trainer_first_name: String,
    pub trainer_last_name: String,
    pub trainer_status: bool,
    pub years: Vec<YearView>,
}

#[derive(Serialize)]
pub struct YearView {
    pub year: String,
    pub months: Vec<MonthView>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthView {
    pub month: String,
    pub total_hours: f64,
}

impl From<WorkloadSummary> for SummaryView {
    fn from(summary: WorkloadSummary) -> Self {
        SummaryView {
            trainer_username: summary.trainer_username,
            trainer_first_name: summary.first_name,
            trainer_last_name: summary.last_name,
            trainer_status: summary.status,
            years: summary
                .years
                .into_iter()
                .map(|year| YearView {
                    year: year.year,
                    months: year
                        .months
                        .into_iter()
                        .map(|month| MonthView {
                            month: month.month,
                            total_hours: month.total_hours.to_f64(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}
