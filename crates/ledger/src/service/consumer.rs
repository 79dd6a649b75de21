use std::sync::Arc;

use log::{error, info, warn};
use model::{dead_letter::DeadLetter, envelope::DeltaEnvelope};
use storage::dead_letter::DeadLetterSink;

use crate::{
    error::{AuthFailure, Rejection, WorkloadError},
    service::{
        auth::Authenticator,
        workload::{MergeOutcome, WorkloadLedger},
    },
};

#[derive(Debug)]
pub enum Outcome {
    /// Acknowledge.
    Done(MergeOutcome),
    /// Permanently undeliverable, already dead-lettered. Acknowledge.
    Rejected(Rejection),
    /// Transient failure. Leave for redelivery.
    Retry(WorkloadError),
}

/// Receiving end of both transports: authenticates, decodes and merges deltas.
#[derive(Clone)]
pub struct WorkloadConsumer {
    auth: Authenticator,
    dead_letters: Arc<dyn DeadLetterSink>,
    ledger: WorkloadLedger,
}

impl WorkloadConsumer {
    pub fn new(
        auth: Authenticator,
        dead_letters: Arc<dyn DeadLetterSink>,
        ledger: WorkloadLedger,
    ) -> Self {
        WorkloadConsumer {
            auth,
            dead_letters,
            ledger,
        }
    }

    /// Runs one delivery attempt. `attempts` counts deliveries including this one.
    pub async fn handle(&self, envelope: &DeltaEnvelope, attempts: u32) -> Outcome {
        let tx = envelope
            .correlation_id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());

        let sender = match self.auth.authenticate(envelope.bearer_token()).await {
            Ok(sender) => sender,
            Err(AuthFailure::Rejected(rejection)) => {
                return self.reject(envelope, rejection, attempts).await;
            }
            Err(AuthFailure::Unavailable(err)) => {
                warn!("[{}] Token check unavailable: {}", tx, err);
                return Outcome::Retry(err.into());
            }
        };

        let delta = match envelope.open() {
            Ok(delta) => delta,
            Err(err) => {
                return self
                    .reject(envelope, Rejection::Malformed(err.to_string()), attempts)
                    .await;
            }
        };
        if let Err(err) = delta.validate() {
            return self.reject(envelope, err.into(), attempts).await;
        }

        info!(
            "[{}] {} delta for {} from {} (attempt {})",
            tx, delta.action_type, delta.trainer_username, sender, attempts
        );
        match self
            .ledger
            .merge(envelope.correlation_id.as_ref(), &delta)
            .await
        {
            Ok(outcome) => Outcome::Done(outcome),
            Err(WorkloadError::Unmergeable(err)) => {
                self.reject(envelope, err.into(), attempts).await
            }
            Err(err) => {
                warn!("[{}] Failed to merge delta: {}", tx, err);
                Outcome::Retry(err)
            }
        }
    }

    async fn reject(
        &self,
        envelope: &DeltaEnvelope,
        rejection: Rejection,
        attempts: u32,
    ) -> Outcome {
        warn!("[{:?}] Rejecting delta: {}", envelope.correlation_id, rejection);
        let letter = DeadLetter::new(
            envelope,
            rejection.reason(),
            rejection.to_string(),
            attempts,
        );
        match self.dead_letters.push(letter).await {
            Ok(()) => Outcome::Rejected(rejection),
            Err(err) => {
                error!("Failed to dead-letter rejected delta: {}", err);
                Outcome::Retry(err.into())
            }
        }
    }
}
