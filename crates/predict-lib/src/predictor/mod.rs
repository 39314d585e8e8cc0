//! Classifier abstraction and artifact loading
//!
//! A classifier is anything that maps a batch of feature rows to class
//! labels. Probability estimation is an optional capability exposed through
//! [`Classifier::probabilities`]. Artifacts are loaded once at startup into a
//! [`ClassifierHandle`], which records why loading failed instead of aborting.

mod inference;
mod linear;

pub use inference::OnnxClassifier;
pub use linear::{LinearClassifier, LinearKind, LinearModelArtifact};

use crate::error::LoadError;
use crate::models::FeatureRow;
use anyhow::Result;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Trait for classifier implementations
pub trait Classifier: Send + Sync {
    /// Predict one class label per row
    fn predict(&self, batch: &[FeatureRow]) -> Result<Vec<i64>>;

    /// Probability estimation capability, if the model has one
    fn probabilities(&self) -> Option<&dyn ProbabilityEstimator> {
        None
    }

    /// Short name of the artifact format, e.g. `onnx`
    fn format(&self) -> &'static str;
}

/// Per-class probability estimation
pub trait ProbabilityEstimator: Send + Sync {
    /// One row of class probabilities per input row, indexed by class
    fn predict_proba(&self, batch: &[FeatureRow]) -> Result<Vec<Vec<f64>>>;
}

/// The process-wide classifier, fixed at startup
#[derive(Clone)]
pub enum ClassifierHandle {
    Loaded(Arc<dyn Classifier>),
    Unloaded { reason: String },
}

impl fmt::Debug for ClassifierHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifierHandle::Loaded(c) => f
                .debug_struct("Loaded")
                .field("format", &c.format())
                .field("probabilistic", &c.probabilities().is_some())
                .finish(),
            ClassifierHandle::Unloaded { reason } => {
                f.debug_struct("Unloaded").field("reason", reason).finish()
            }
        }
    }
}

impl ClassifierHandle {
    pub fn loaded(classifier: impl Classifier + 'static) -> Self {
        ClassifierHandle::Loaded(Arc::new(classifier))
    }

    pub fn unloaded(reason: impl Into<String>) -> Self {
        ClassifierHandle::Unloaded {
            reason: reason.into(),
        }
    }

    /// Load an artifact, falling back to `Unloaded` on any failure
    pub fn load(path: &Path, expected_sha256: Option<&str>) -> Self {
        match load_classifier(path, expected_sha256) {
            Ok(classifier) => {
                debug!(
                    path = %path.display(),
                    format = classifier.format(),
                    probabilistic = classifier.probabilities().is_some(),
                    "Classifier loaded"
                );
                ClassifierHandle::Loaded(classifier)
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Classifier unavailable");
                ClassifierHandle::unloaded(e.to_string())
            }
        }
    }

    pub fn classifier(&self) -> Option<&dyn Classifier> {
        match self {
            ClassifierHandle::Loaded(c) => Some(c.as_ref()),
            ClassifierHandle::Unloaded { .. } => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, ClassifierHandle::Loaded(_))
    }

    /// Why the classifier is missing, if it is
    pub fn unavailable_reason(&self) -> Option<&str> {
        match self {
            ClassifierHandle::Loaded(_) => None,
            ClassifierHandle::Unloaded { reason } => Some(reason),
        }
    }
}

/// Read, verify and parse a classifier artifact, dispatching on extension
pub fn load_classifier(
    path: &Path,
    expected_sha256: Option<&str>,
) -> Result<Arc<dyn Classifier>, LoadError> {
    let bytes = std::fs::read(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            LoadError::NotFound(path.to_path_buf())
        } else {
            LoadError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    if let Some(expected) = expected_sha256 {
        verify_checksum(&bytes, expected)?;
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    debug!(path = %path.display(), size_bytes = bytes.len(), "Parsing model artifact");

    match extension.as_str() {
        "json" => LinearClassifier::from_slice(&bytes)
            .map(|c| Arc::new(c) as Arc<dyn Classifier>)
            .map_err(LoadError::InvalidArtifact),
        "onnx" => OnnxClassifier::from_bytes(&bytes)
            .map(|c| Arc::new(c) as Arc<dyn Classifier>)
            .map_err(LoadError::InvalidArtifact),
        other => Err(LoadError::UnsupportedFormat(other.to_string())),
    }
}

/// Hex-encoded SHA256 digest of an artifact
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn verify_checksum(bytes: &[u8], expected: &str) -> Result<(), LoadError> {
    let actual = sha256_hex(bytes);
    let expected = expected.trim().to_ascii_lowercase();
    if actual != expected {
        return Err(LoadError::ChecksumMismatch { expected, actual });
    }
    Ok(())
}
