//! Linear binary classifiers stored as JSON
//!
//! The artifact carries the fitted coefficients of a linear model:
//!
//! ```json
//! {
//!   "kind": "logistic_regression",
//!   "classes": [0, 1],
//!   "feature_names": ["Pregnancies", "Glucose", "..."],
//!   "coefficients": [0.12, 0.035, ...],
//!   "intercept": -8.4
//! }
//! ```
//!
//! The decision value is `intercept + coefficients . x`. The predicted label
//! is `classes[1]` when the decision is strictly positive. Logistic models
//! report `sigmoid(decision)` as the positive-class probability; SVC-style
//! models have no probability estimate.

use super::{Classifier, ProbabilityEstimator};
use crate::models::{FeatureRow, FEATURE_NAMES, NUM_FEATURES};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Estimator family the coefficients came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinearKind {
    LogisticRegression,
    LinearSvc,
}

/// On-disk representation of a linear classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModelArtifact {
    pub kind: LinearKind,
    pub classes: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

/// Linear classifier evaluated natively
#[derive(Debug, Clone)]
pub struct LinearClassifier {
    kind: LinearKind,
    classes: [i64; 2],
    coefficients: FeatureRow,
    intercept: f64,
}

impl LinearClassifier {
    /// Parse and validate a JSON artifact
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let artifact: LinearModelArtifact =
            serde_json::from_slice(bytes).context("Failed to parse linear model JSON")?;
        Self::from_artifact(artifact)
    }

    pub fn from_artifact(artifact: LinearModelArtifact) -> Result<Self> {
        let classes: [i64; 2] = artifact.classes.as_slice().try_into().map_err(|_| {
            anyhow::anyhow!(
                "Expected a binary classifier with 2 classes, got {}",
                artifact.classes.len()
            )
        })?;

        let coefficients: FeatureRow =
            artifact.coefficients.as_slice().try_into().map_err(|_| {
                anyhow::anyhow!(
                    "Model has {} coefficients, expected {}",
                    artifact.coefficients.len(),
                    NUM_FEATURES
                )
            })?;

        if let Some(names) = &artifact.feature_names {
            if names.iter().map(String::as_str).ne(FEATURE_NAMES) {
                anyhow::bail!(
                    "Model feature order {:?} does not match expected {:?}",
                    names,
                    FEATURE_NAMES
                );
            }
        }

        if !artifact.intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            anyhow::bail!("Model parameters must be finite");
        }

        Ok(Self {
            kind: artifact.kind,
            classes,
            coefficients,
            intercept: artifact.intercept,
        })
    }

    pub fn kind(&self) -> LinearKind {
        self.kind
    }

    /// Signed distance to the separating hyperplane
    pub fn decision_function(&self, row: &FeatureRow) -> f64 {
        self.coefficients
            .iter()
            .zip(row)
            .fold(self.intercept, |acc, (w, x)| acc + w * x)
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl Classifier for LinearClassifier {
    fn predict(&self, batch: &[FeatureRow]) -> Result<Vec<i64>> {
        Ok(batch
            .iter()
            .map(|row| {
                if self.decision_function(row) > 0.0 {
                    self.classes[1]
                } else {
                    self.classes[0]
                }
            })
            .collect())
    }

    fn probabilities(&self) -> Option<&dyn ProbabilityEstimator> {
        match self.kind {
            LinearKind::LogisticRegression => Some(self),
            LinearKind::LinearSvc => None,
        }
    }

    fn format(&self) -> &'static str {
        "linear-json"
    }
}

impl ProbabilityEstimator for LinearClassifier {
    fn predict_proba(&self, batch: &[FeatureRow]) -> Result<Vec<Vec<f64>>> {
        Ok(batch
            .iter()
            .map(|row| {
                let p = sigmoid(self.decision_function(row));
                vec![1.0 - p, p]
            })
            .collect())
    }
}
