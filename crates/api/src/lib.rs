use axum::{middleware, Router};
use eyre::{Context as _, Result};
use ledger::Ledger;
use log::info;
use tokio::{net::TcpListener, sync::watch};

pub mod auth;
pub mod dead_letters;
pub mod working_hours;

pub fn router(ledger: Ledger) -> Router {
    let protected = Router::new()
        .merge(working_hours::read_routes())
        .merge(dead_letters::routes())
        .layer(middleware::from_fn_with_state(
            ledger.clone(),
            auth::middleware,
        ));
    Router::new()
        .merge(working_hours::write_routes())
        .merge(protected)
        .with_state(ledger)
}

pub async fn serve(ledger: Ledger, addr: &str, mut shutdown: watch::Receiver<bool>) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router(ledger))
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await
        .context("HTTP server failed")?;
    info!("HTTP server stopped");
    Ok(())
}
