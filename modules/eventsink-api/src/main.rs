mod routes;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use eventsink_common::{AppConfig, TableCatalog};
use eventsink_ingest::{IngestConfig, IngestDispatcher};
use eventsink_store::{MemoryStore, PgTableStore, TableStore};

use routes::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let config = AppConfig::from_env()?;
    info!(service = %config.service_name, "Starting event sink");

    let store: Arc<dyn TableStore> = match &config.database_url {
        Some(url) => {
            let pg = PgTableStore::connect(url, 10)
                .await
                .context("Failed to connect to DATABASE_URL")?;
            pg.migrate().await?;
            Arc::new(pg)
        }
        None => {
            warn!("DATABASE_URL not set; rows are kept in memory and lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let dispatcher = Arc::new(IngestDispatcher::new(
        store.clone(),
        TableCatalog::reference(),
        IngestConfig::from(&config),
    ));

    if config.provision_catalog {
        dispatcher.provision_catalog().await?;
    }

    let app = build_router(AppState::new(dispatcher, &config.service_name), &config);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Event sink listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    info!("Event sink stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
