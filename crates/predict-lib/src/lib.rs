//! Prediction library for the diabetes classifier service
//!
//! This crate provides the core functionality for:
//! - Feature record validation and vector assembly
//! - Classifier adapters (JSON linear models, ONNX via tract)
//! - The prediction service used by the HTTP layer
//! - Health checks and observability

pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod service;

pub use error::{LoadError, ServiceError, MODEL_UNAVAILABLE_MESSAGE};
pub use health::{ComponentHealth, ComponentStatus, HealthResponse, ReadinessResponse};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use predictor::{Classifier, ClassifierHandle, ProbabilityEstimator};
pub use service::PredictionService;
