//! HTTP API: prediction endpoints, health probes and Prometheus metrics

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use predict_lib::{
    HealthResponse, PredictionResult, PredictionService, ServiceError, StatusResponse,
    ValidationErrors, MODEL_UNAVAILABLE_MESSAGE,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shared application state
pub struct AppState {
    pub service: PredictionService,
}

impl AppState {
    pub fn new(service: PredictionService) -> Self {
        Self { service }
    }
}

/// HTTP mapping of [`ServiceError`]
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            ServiceError::InvalidInput(errors) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "detail": errors })))
                    .into_response()
            }
            ServiceError::ModelUnavailable => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "detail": MODEL_UNAVAILABLE_MESSAGE })),
            )
                .into_response(),
            ServiceError::Inference(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "detail": message })),
            )
                .into_response(),
        }
    }
}

/// Service status; always OK while the process is up
async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(state.service.health())
}

/// Predict from a JSON feature record
async fn predict(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Bytes,
) -> Result<Json<PredictionResult>, ApiError> {
    let body = decode_json_body(&headers, &payload).map_err(|errors| {
        state
            .service
            .record_failure(ServiceError::InvalidInput(errors))
    })?;

    let result = state.service.predict_json(&body)?;
    Ok(Json(result))
}

/// Parse a request body as JSON.
///
/// A body without a content type is read as JSON; any other non-JSON
/// content type is rejected.
fn decode_json_body(headers: &HeaderMap, body: &[u8]) -> Result<Value, ValidationErrors> {
    if let Some(content_type) = headers.get(header::CONTENT_TYPE) {
        if !is_json_content_type(content_type) {
            return Err(ValidationErrors::json_invalid(
                "Expected request with `Content-Type: application/json`",
            ));
        }
    }

    serde_json::from_slice(body)
        .map_err(|e| ValidationErrors::json_invalid(format!("JSON decode error: {}", e)))
}

fn is_json_content_type(value: &HeaderValue) -> bool {
    let Ok(value) = value.to_str() else {
        return false;
    };
    let essence = value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    essence == "application/json"
        || (essence.starts_with("application/") && essence.ends_with("+json"))
}

/// Health check response - returns 200 if healthy, 503 if the classifier is unloaded
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = HealthResponse::for_classifier(state.service.classifier());

    let status_code = if health.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = HealthResponse::for_classifier(state.service.classifier()).readiness();

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// CORS policy for the configured origins.
///
/// Credentials are allowed, so methods and headers are mirrored from the
/// preflight request rather than answered with a wildcard.
pub fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| {
            if origin.trim() == "*" {
                anyhow::bail!("Wildcard origin cannot be combined with credentialed CORS");
            }
            HeaderValue::from_str(origin)
                .with_context(|| format!("Invalid allowed origin {:?}", origin))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request()))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>, cors: CorsLayer) -> Router {
    Router::new()
        .route("/api/", get(status))
        .route("/api/predict", post(predict))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the API server and run until `shutdown` resolves
pub async fn serve(
    addr: &str,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
