use bg_process::WorkerConfig;
use eyre::Context;
use log::{error, info};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let env = env::Env::load()?;
    pretty_env_logger::init();
    color_eyre::install()?;

    info!("connecting to mongo");
    let storage = storage::Storage::new(env.mongo_url())
        .await
        .context("Failed to create storage")?;
    info!("creating ledger");
    let ledger = ledger::Ledger::new(storage, env.jwt_secret(), env.merge_max_retries());

    let (stop, shutdown) = watch::channel(false);
    let workers = bg_process::start(
        ledger.clone(),
        WorkerConfig {
            workers: env.queue_workers(),
            max_attempts: env.queue_max_attempts(),
            visibility: env.queue_visibility(),
            ..WorkerConfig::default()
        },
        shutdown.clone(),
    );

    let server = tokio::spawn({
        let ledger = ledger.clone();
        let addr = env.http_addr().to_string();
        async move { api::serve(ledger, &addr, shutdown).await }
    });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;
    info!("Shutting down...");
    stop.send(true).ok();

    for worker in workers {
        if let Err(err) = worker.await {
            error!("Worker panicked: {}", err);
        }
    }
    server.await.context("HTTP server task panicked")??;
    Ok(())
}
