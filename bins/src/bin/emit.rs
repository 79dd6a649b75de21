//! Sends a single workload delta the way the primary service does.
//!
//! Usage: `emit <ADD|DELETE> <username> <first> <last> <YYYY-MM-DD> <hours>`

use std::{str::FromStr as _, sync::Arc};

use chrono::NaiveDate;
use dispatcher::{
    breaker::BreakerConfig,
    context::RequestContext,
    transport::{HttpTransport, QueueTransport},
    DeltaDispatcher,
};
use env::DeliveryMode;
use eyre::{bail, eyre, Context as _};
use ledger::service::auth::JwtValidator;
use log::info;
use model::{
    decimal::Decimal,
    delta::{ActionType, WorkloadDelta},
};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let env = env::Env::load()?;
    pretty_env_logger::init();
    color_eyre::install()?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [action, username, first_name, last_name, date, hours] = args.as_slice() else {
        bail!("usage: emit <ADD|DELETE> <username> <first> <last> <YYYY-MM-DD> <hours>");
    };
    let delta = WorkloadDelta {
        trainer_username: username.clone(),
        trainer_first_name: first_name.clone(),
        trainer_last_name: last_name.clone(),
        is_active: true,
        training_date: NaiveDate::from_str(date).context("Invalid date")?,
        training_duration: Decimal::try_from(hours.as_str())
            .map_err(|err| eyre!("Invalid hours {}: {}", hours, err))?,
        action_type: ActionType::from_str(action).context("Invalid action")?,
    };
    delta.validate()?;

    let token = match std::env::var("WORKLOAD_TOKEN") {
        Ok(token) => token,
        Err(_) => JwtValidator::new(env.jwt_secret()).issue("emit", chrono::Duration::minutes(5))?,
    };
    let ctx = RequestContext::new(Some(token));

    let dispatcher = match env.delivery_mode() {
        DeliveryMode::Sync => {
            let url = env
                .workload_url()
                .ok_or_else(|| eyre!("WORKLOAD_URL is not set"))?;
            let transport = HttpTransport::new(url, env.http_timeout())?;
            DeltaDispatcher::direct(
                Arc::new(transport),
                BreakerConfig {
                    failure_threshold: env.breaker_failure_threshold(),
                    open_duration: env.breaker_open(),
                },
            )
        }
        DeliveryMode::Async => {
            let storage = storage::Storage::new(env.mongo_url())
                .await
                .context("Failed to create storage")?;
            DeltaDispatcher::queued(Arc::new(QueueTransport::new(Arc::new(storage.queue))))
        }
    };

    let id = dispatcher.dispatch(&ctx, &delta).await?;
    info!("Delta sent with transaction id {}", id);
    println!("{}", id);
    Ok(())
}
