use std::sync::Arc;

use log::{error, info, warn};
use model::{
    delta::{ActionType, CorrelationId, WorkloadDelta},
    envelope::DeltaEnvelope,
};
use thiserror::Error;

pub mod breaker;
pub mod context;
pub mod fanout;
pub mod training;
pub mod transport;

use breaker::{BreakerConfig, CircuitBreaker};
use context::RequestContext;
use fanout::FanoutReport;
use training::TrainingSession;
use transport::{DeltaTransport, TransportError};

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("failed to update workload; try again later")]
    WorkloadUnavailable,
    #[error("Failed to publish workload delta: {0}")]
    Publish(TransportError),
    #[error("Failed to encode workload delta: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Workload updated partially: {sent} sent, {failed} failed")]
    PartialFanout { sent: usize, failed: usize },
}

pub enum Delivery {
    /// Request/response call guarded by a circuit breaker.
    Direct {
        transport: Arc<dyn DeltaTransport>,
        breaker: CircuitBreaker,
    },
    /// Durable publish. Redelivery is the queue's business, so no breaker.
    Queued { transport: Arc<dyn DeltaTransport> },
}

/// Primary-side emitter of workload deltas.
#[derive(Clone)]
pub struct DeltaDispatcher {
    delivery: Arc<Delivery>,
}

impl DeltaDispatcher {
    pub fn direct(transport: Arc<dyn DeltaTransport>, config: BreakerConfig) -> Self {
        DeltaDispatcher {
            delivery: Arc::new(Delivery::Direct {
                transport,
                breaker: CircuitBreaker::new(config),
            }),
        }
    }

    pub fn queued(transport: Arc<dyn DeltaTransport>) -> Self {
        DeltaDispatcher {
            delivery: Arc::new(Delivery::Queued { transport }),
        }
    }

    pub fn breaker(&self) -> Option<&CircuitBreaker> {
        match self.delivery.as_ref() {
            Delivery::Direct { breaker, .. } => Some(breaker),
            Delivery::Queued { .. } => None,
        }
    }

    pub async fn training_created(
        &self,
        ctx: &RequestContext,
        training: &TrainingSession,
    ) -> Result<CorrelationId, DispatchError> {
        self.dispatch(ctx, &training.delta(ActionType::Add)).await
    }

    pub async fn training_deleted(
        &self,
        ctx: &RequestContext,
        training: &TrainingSession,
    ) -> Result<CorrelationId, DispatchError> {
        self.dispatch(ctx, &training.delta(ActionType::Delete)).await
    }

    /// Emits one DELETE per historical training of a removed trainee.
    pub async fn trainee_deleted(
        &self,
        ctx: &RequestContext,
        trainings: &[TrainingSession],
    ) -> FanoutReport {
        let deltas = trainings
            .iter()
            .map(|training| training.delta(ActionType::Delete))
            .collect();
        self.dispatch_all(ctx, deltas).await
    }

    pub async fn dispatch(
        &self,
        ctx: &RequestContext,
        delta: &WorkloadDelta,
    ) -> Result<CorrelationId, DispatchError> {
        if ctx.token.is_none() {
            warn!(
                "[{}] No bearer token, sending {} delta for {} anonymously",
                ctx.transaction_id, delta.action_type, delta.trainer_username
            );
        }
        let id = CorrelationId::new();
        let envelope = DeltaEnvelope::seal(delta, id.clone(), ctx.token.as_deref())?;

        match self.delivery.as_ref() {
            Delivery::Direct { transport, breaker } => {
                let Some(permit) = breaker.try_acquire() else {
                    return Err(fallback(ctx, delta, "circuit open"));
                };
                match transport.deliver(&envelope).await {
                    Ok(()) => permit.success(),
                    Err(err) => {
                        permit.failure();
                        return Err(fallback(ctx, delta, &err.to_string()));
                    }
                }
            }
            Delivery::Queued { transport } => {
                transport
                    .deliver(&envelope)
                    .await
                    .map_err(DispatchError::Publish)?;
            }
        }
        info!(
            "[{}] Sent {} delta {} for {}",
            ctx.transaction_id, delta.action_type, id, delta.trainer_username
        );
        Ok(id)
    }

    /// Emits every delta regardless of earlier failures and reports which went out.
    pub async fn dispatch_all(
        &self,
        ctx: &RequestContext,
        deltas: Vec<WorkloadDelta>,
    ) -> FanoutReport {
        let mut report = FanoutReport::default();
        for delta in deltas {
            match self.dispatch(ctx, &delta).await {
                Ok(id) => report.sent.push((id, delta)),
                Err(err) => report.failed.push((delta, err)),
            }
        }
        if !report.is_complete() {
            warn!(
                "[{}] Fan-out incomplete: {} sent, {} failed",
                ctx.transaction_id,
                report.sent.len(),
                report.failed.len()
            );
        }
        report
    }

    /// Undoes the sent part of a fan-out by emitting the inverse deltas.
    pub async fn compensate(&self, ctx: &RequestContext, report: &FanoutReport) -> FanoutReport {
        let inverse = report
            .sent
            .iter()
            .map(|(_, delta)| delta.inverse())
            .collect();
        self.dispatch_all(ctx, inverse).await
    }
}

fn fallback(ctx: &RequestContext, delta: &WorkloadDelta, cause: &str) -> DispatchError {
    error!(
        "[{}] Failed to update workload for {} ({} {}h on {}): {}",
        ctx.transaction_id,
        delta.trainer_username,
        delta.action_type,
        delta.training_duration,
        delta.training_date,
        cause
    );
    DispatchError::WorkloadUnavailable
}
