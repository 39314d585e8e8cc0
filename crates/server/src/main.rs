//! Diabetes prediction API
//!
//! Loads the classifier artifact once at startup and serves predictions
//! over HTTP until interrupted.

use anyhow::Result;
use diabetes_api::{api, config::ServiceConfig};
use predict_lib::{ClassifierHandle, PredictionService, ServiceMetrics, StructuredLogger};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting diabetes-api");

    let config = ServiceConfig::load()?;
    let logger = StructuredLogger::new(&config.instance);
    let metrics = ServiceMetrics::new();

    // Load the classifier exactly once; failure leaves the service up without it
    let model_path = config.resolve_model_path()?;
    let handle = ClassifierHandle::load(&model_path, config.model_sha256.as_deref());
    match handle.classifier() {
        Some(classifier) => {
            let probabilistic = classifier.probabilities().is_some();
            logger.log_model_loaded(
                &model_path.display().to_string(),
                classifier.format(),
                probabilistic,
            );
            metrics.set_model_state(Some(classifier.format()), probabilistic);
        }
        None => {
            logger.log_model_load_failed(
                &model_path.display().to_string(),
                handle.unavailable_reason().unwrap_or("unknown"),
            );
            metrics.set_model_state(None, false);
        }
    }

    let model_loaded = handle.is_loaded();
    let service = PredictionService::new(handle, metrics, logger.clone());
    let state = Arc::new(api::AppState::new(service));
    let router = api::create_router(state, api::cors_layer(&config.allowed_origins)?);

    let addr = config.bind_addr();
    logger.log_startup(SERVICE_VERSION, &addr, model_loaded);

    let shutdown_logger = logger.clone();
    api::serve(&addr, router, async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        shutdown_logger.log_shutdown("SIGINT received");
    })
    .await?;

    info!("Shut down");
    Ok(())
}
