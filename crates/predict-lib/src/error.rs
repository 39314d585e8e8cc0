//! Error types for classifier loading and prediction

use crate::models::ValidationErrors;
use std::path::PathBuf;
use thiserror::Error;

/// Message returned to callers when no classifier is available
pub const MODEL_UNAVAILABLE_MESSAGE: &str = "Model not loaded on server";

/// Per-request prediction failures
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Request body is missing a field or holds a non-coercible value
    #[error("invalid input: {0}")]
    InvalidInput(ValidationErrors),

    /// The classifier failed to load at startup
    #[error("Model not loaded on server")]
    ModelUnavailable,

    /// The classifier failed while evaluating the request
    #[error("{0}")]
    Inference(String),
}

impl ServiceError {
    /// Short label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::InvalidInput(_) => "validation",
            ServiceError::ModelUnavailable => "model_unavailable",
            ServiceError::Inference(_) => "inference",
        }
    }

    pub(crate) fn inference(err: anyhow::Error) -> Self {
        ServiceError::Inference(format!("{:#}", err))
    }
}

/// Startup failures while loading a classifier artifact
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("model file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read model file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("model checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("unsupported model format {0:?} (expected .json or .onnx)")]
    UnsupportedFormat(String),

    #[error("invalid model artifact: {0:#}")]
    InvalidArtifact(anyhow::Error),
}
