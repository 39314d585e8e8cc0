//! Observability infrastructure for the prediction service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, outcomes, errors, model state)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter_vec, register_int_gauge,
    GaugeVec, Histogram, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.5,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct ServiceMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounterVec,
    prediction_errors_total: IntCounterVec,
    model_loaded: IntGauge,
    model_info: GaugeVec,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "diabetes_api_prediction_latency_seconds",
                "Time spent running classifier inference for a request",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter_vec!(
                "diabetes_api_predictions_total",
                "Total number of successful predictions by outcome",
                &["outcome"]
            )
            .expect("Failed to register predictions_total"),

            prediction_errors_total: register_int_counter_vec!(
                "diabetes_api_prediction_errors_total",
                "Total number of failed prediction requests by kind",
                &["kind"]
            )
            .expect("Failed to register prediction_errors_total"),

            model_loaded: register_int_gauge!(
                "diabetes_api_model_loaded",
                "Whether a classifier was loaded at startup (1) or not (0)"
            )
            .expect("Failed to register model_loaded"),

            model_info: register_gauge_vec!(
                "diabetes_api_model_info",
                "Information about the loaded classifier",
                &["format", "probabilistic"]
            )
            .expect("Failed to register model_info"),
        }
    }
}

/// Service metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    /// Record an inference latency observation
    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    /// Count a successful prediction
    pub fn inc_predictions(&self, is_diabetic: u8) {
        let outcome = if is_diabetic == 1 { "positive" } else { "negative" };
        self.inner()
            .predictions_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Count a failed prediction request
    pub fn inc_prediction_errors(&self, kind: &str) {
        self.inner()
            .prediction_errors_total
            .with_label_values(&[kind])
            .inc();
    }

    /// Record the classifier state fixed at startup
    pub fn set_model_state(&self, format: Option<&str>, probabilistic: bool) {
        let inner = self.inner();
        inner.model_info.reset();
        match format {
            Some(format) => {
                inner.model_loaded.set(1);
                inner
                    .model_info
                    .with_label_values(&[format, if probabilistic { "true" } else { "false" }])
                    .set(1.0);
            }
            None => inner.model_loaded.set(0),
        }
    }
}

/// Structured logger for service events
///
/// Provides consistent JSON-formatted logging for predictions and
/// lifecycle events. Feature values are never logged.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str, addr: &str, model_loaded: bool) {
        info!(
            event = "service_started",
            instance = %self.instance,
            service_version = %version,
            addr = %addr,
            model_loaded = model_loaded,
            "Prediction service started"
        );
    }

    /// Log a successful classifier load
    pub fn log_model_loaded(&self, path: &str, format: &str, probabilistic: bool) {
        info!(
            event = "model_loaded",
            instance = %self.instance,
            path = %path,
            format = %format,
            probabilistic = probabilistic,
            "Classifier loaded"
        );
    }

    /// Log a classifier load failure
    pub fn log_model_load_failed(&self, path: &str, reason: &str) {
        warn!(
            event = "model_load_failed",
            instance = %self.instance,
            path = %path,
            reason = %reason,
            "Classifier failed to load, predictions will be rejected until restart"
        );
    }

    /// Log a prediction
    pub fn log_prediction(&self, is_diabetic: u8, probability: f64, latency_us: u64) {
        debug!(
            event = "prediction_generated",
            instance = %self.instance,
            is_diabetic = is_diabetic,
            probability = probability,
            latency_us = latency_us,
            "Generated prediction"
        );
    }

    /// Log a failed prediction
    pub fn log_prediction_failed(&self, kind: &str, details: &str) {
        match kind {
            "validation" => {
                debug!(
                    event = "prediction_failed",
                    instance = %self.instance,
                    kind = %kind,
                    details = %details,
                    "Rejected prediction request"
                );
            }
            _ => {
                warn!(
                    event = "prediction_failed",
                    instance = %self.instance,
                    kind = %kind,
                    details = %details,
                    "Prediction failed"
                );
            }
        }
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Prediction service shutting down"
        );
    }
}
