//! MediScan server - disease-risk prediction API
//!
//! Loads the trained model bundles once at startup and serves predictions,
//! account registration/login and model metadata over HTTP.

use anyhow::{Context, Result};
use mediscan_lib::{
    health::HealthRegistry,
    observability::{AppMetrics, StructuredLogger},
    AppContext,
};
use mediscan_server::{api, config::ServerConfig};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting mediscan-server");

    let config = ServerConfig::load()?;
    info!(
        instance = %config.instance_name,
        models_dir = %config.models_dir.display(),
        data_dir = %config.data_dir.display(),
        "Server configured"
    );

    let settings = config.context_settings();
    let context = tokio::task::spawn_blocking(move || AppContext::load(&settings))
        .await
        .context("Model loading task failed")?;
    if context.models_loaded() == 0 {
        warn!("No models could be loaded, predictions will be rejected");
    }

    let metrics = AppMetrics::new();
    let logger = StructuredLogger::new(&config.instance_name);
    let state = Arc::new(api::AppState::new(
        context,
        HealthRegistry::new(),
        metrics,
        logger.clone(),
    ));
    state.initialize().await;
    logger.log_startup(SERVICE_VERSION, state.context.models_loaded());

    api::serve(config.api_port, state, shutdown_signal(logger)).await?;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal(logger: StructuredLogger) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal, running until killed");
        std::future::pending::<()>().await;
    }
    logger.log_shutdown("SIGINT received");
}
