use std::time::Duration;

use eyre::{Context as _, Error};
use ledger::{service::consumer::Outcome, Ledger};
use log::{error, info, warn};
use model::dead_letter::{DeadLetter, DeadLetterReason};
use storage::{dead_letter::DeadLetterSink as _, queue::DeltaQueue as _};
use tokio::{sync::watch, task::JoinHandle};

#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    pub workers: usize,
    pub max_attempts: u32,
    pub visibility: Duration,
    /// Redelivery delay grows linearly with the attempt number.
    pub retry_delay: Duration,
    pub idle_poll: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig {
            workers: 4,
            max_attempts: 5,
            visibility: Duration::from_secs(30),
            retry_delay: Duration::from_secs(2),
            idle_poll: Duration::from_millis(500),
        }
    }
}

/// Spawns the queue consumers. They stop once `shutdown` flips to `true`.
pub fn start(
    ledger: Ledger,
    config: WorkerConfig,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    info!("Starting {} workload queue workers", config.workers);
    (0..config.workers.max(1))
        .map(|worker| {
            let ledger = ledger.clone();
            let mut shutdown = shutdown.clone();
            tokio::spawn(async move {
                loop {
                    if *shutdown.borrow() {
                        break;
                    }
                    let idle = match process(&ledger, &config).await {
                        Ok(handled) => !handled,
                        Err(err) => {
                            error!("Worker {} failed: {:#}", worker, err);
                            true
                        }
                    };
                    if idle {
                        let closed = tokio::select! {
                            _ = tokio::time::sleep(config.idle_poll) => false,
                            changed = shutdown.changed() => changed.is_err(),
                        };
                        if closed {
                            break;
                        }
                    }
                }
                info!("Worker {} stopped", worker);
            })
        })
        .collect()
}

/// Takes one message off the queue and settles it. Returns `false` if the queue was empty.
pub async fn process(ledger: &Ledger, config: &WorkerConfig) -> Result<bool, Error> {
    let Some(message) = ledger
        .queue
        .receive(config.visibility)
        .await
        .context("receive")?
    else {
        return Ok(false);
    };

    match ledger.consumer.handle(&message.envelope, message.attempts).await {
        Outcome::Done(_) | Outcome::Rejected(_) => {
            ledger.queue.ack(message.id).await.context("ack")?;
        }
        Outcome::Retry(err) if message.attempts >= config.max_attempts => {
            warn!(
                "Delta {:?} exhausted {} attempts: {}",
                message.envelope.correlation_id, message.attempts, err
            );
            let letter = DeadLetter::new(
                &message.envelope,
                DeadLetterReason::RetriesExhausted,
                err.to_string(),
                message.attempts,
            );
            ledger
                .dead_letters
                .push(letter)
                .await
                .context("dead letter")?;
            ledger.queue.ack(message.id).await.context("ack")?;
        }
        Outcome::Retry(_) => {
            let delay = config.retry_delay * message.attempts;
            ledger
                .queue
                .nack(message.id, delay)
                .await
                .context("nack")?;
        }
    }
    Ok(true)
}
