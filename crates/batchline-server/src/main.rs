//! Batchline Server - Main entry point

use anyhow::Result;
use batchline_common::logging::{init_logging, LogConfig};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tracing::info;

use batchline_server::{
    api,
    batch::{InMemoryJobRepository, JobLauncher},
    config::Config,
    features::{FeatureState, JobsState},
    persons::import_persons_job,
    store,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with configuration from environment
    let log_config = LogConfig::builder()
        .log_file_prefix("batchline-server".to_string())
        .filter_directives("batchline_server=debug,tower_http=debug,sqlx=info".to_string())
        .build();

    // Environment variables override the values set above
    let log_config = log_config.merge_env()?;

    let _guard = init_logging(&log_config)?;

    info!("Starting Batchline Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let store = store::connect(config.store, &config.database).await?;

    let job = Arc::new(import_persons_job(&config.import, store.clone()));
    info!(
        input = %config.import.input_path.display(),
        chunk_size = config.import.chunk_size,
        skip_limit = config.import.skip_limit,
        "Import job configured"
    );

    let state = FeatureState {
        store,
        jobs: JobsState {
            launcher: Arc::new(JobLauncher::new(Arc::new(InMemoryJobRepository::new()))),
            job,
        },
    };

    let app = api::create_router(state, &config.cors);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    info!("Server shut down gracefully");

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
