use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use schedule_server::config::ServerConfig;
use schedule_server::events::Broadcaster;
use schedule_server::store::Store;
use schedule_server::web::{AppState, create_router};

const DEFAULT_LOG_FILTER: &str = "schedule_server=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = ServerConfig::from_env()?;
    info!(?config, "starting schedule server");

    let store = Arc::new(
        Store::open(
            config.snapshot_file(),
            config.open_attempts,
            config.open_retry_delay(),
        )
        .await?,
    );

    // Periodic snapshot
    if config.snapshot_path.is_some() {
        let store = store.clone();
        let period = config.snapshot_interval();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await; // First tick is immediate, skip it
            loop {
                interval.tick().await;
                if let Err(e) = store.flush().await {
                    warn!(error = %e, "periodic snapshot failed");
                }
            }
        });
    }

    let events = Broadcaster::new(config.event_capacity);
    let app = create_router(AppState::new(store.clone(), events));

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutting down");
    if let Err(e) = store.close().await {
        error!(error = %e, "failed to write final snapshot");
        return Err(e.into());
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
