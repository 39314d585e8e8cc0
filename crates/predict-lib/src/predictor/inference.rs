//! ONNX inference using tract
//!
//! Evaluates classifiers exported to ONNX. The graph takes a single
//! `f32[1, 8]` input. Output 0 holds the predicted label; an optional
//! output 1 holds a `[1, n_classes]` probability tensor. Exporters that wrap
//! probabilities in a sequence of maps must be configured to emit a plain
//! tensor instead.

use super::{Classifier, ProbabilityEstimator};
use crate::models::{FeatureRow, NUM_FEATURES};
use anyhow::{Context, Result};
use std::sync::Mutex;
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Decoded outputs of one graph run
#[derive(Debug, Clone)]
struct Evaluation {
    row: FeatureRow,
    label: i64,
    probabilities: Option<Vec<f64>>,
}

/// ONNX-based classifier using tract for lightweight inference
pub struct OnnxClassifier {
    model: TractModel,
    has_probabilities: bool,
    // Label and probabilities for a row come from one run; the service asks
    // for them in two calls.
    last: Mutex<Option<Evaluation>>,
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("has_probabilities", &self.has_probabilities)
            .finish()
    }
}

impl OnnxClassifier {
    /// Create a classifier from model bytes
    pub fn from_bytes(model_bytes: &[u8]) -> Result<Self> {
        let typed = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, NUM_FEATURES]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?;

        let outputs = typed.output_outlets()?.len();
        if outputs == 0 {
            anyhow::bail!("ONNX model declares no outputs");
        }

        let model = typed
            .into_runnable()
            .context("Failed to create runnable model")?;

        Ok(Self {
            model,
            has_probabilities: outputs > 1,
            last: Mutex::new(None),
        })
    }

    fn row_to_tensor(row: &FeatureRow) -> Result<Tensor> {
        let data: Vec<f32> = row.iter().map(|v| *v as f32).collect();
        let array = tract_ndarray::Array2::from_shape_vec((1, NUM_FEATURES), data)?;
        Ok(array.into())
    }

    fn run(&self, row: &FeatureRow) -> Result<TVec<TValue>> {
        let start = Instant::now();
        let input = Self::row_to_tensor(row)?;
        let outputs = self.model.run(tvec!(input.into()))?;

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        Ok(outputs)
    }

    fn evaluate(&self, row: &FeatureRow) -> Result<Evaluation> {
        if let Some(hit) = self.cached(row) {
            return Ok(hit);
        }

        let outputs = self.run(row)?;

        let label_output = outputs.first().context("No label output from model")?;
        let label = label_output
            .cast_to::<i64>()
            .context("Label output is not numeric")?
            .as_slice::<i64>()?
            .first()
            .copied()
            .context("Label output is empty")?;

        let probabilities = if self.has_probabilities {
            let output = outputs.get(1).context("No probability output from model")?;
            let casted = output
                .cast_to::<f32>()
                .context("Probability output is not numeric")?;
            let values: Vec<f64> = casted
                .to_array_view::<f32>()?
                .iter()
                .map(|p| *p as f64)
                .collect();
            Some(values)
        } else {
            None
        };

        let evaluation = Evaluation {
            row: *row,
            label,
            probabilities,
        };
        if let Ok(mut last) = self.last.lock() {
            *last = Some(evaluation.clone());
        }
        Ok(evaluation)
    }

    fn cached(&self, row: &FeatureRow) -> Option<Evaluation> {
        let last = self.last.lock().ok()?;
        last.as_ref().filter(|e| e.row == *row).cloned()
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, batch: &[FeatureRow]) -> Result<Vec<i64>> {
        batch
            .iter()
            .map(|row| self.evaluate(row).map(|e| e.label))
            .collect()
    }

    fn probabilities(&self) -> Option<&dyn ProbabilityEstimator> {
        if self.has_probabilities {
            Some(self)
        } else {
            None
        }
    }

    fn format(&self) -> &'static str {
        "onnx"
    }
}

impl ProbabilityEstimator for OnnxClassifier {
    fn predict_proba(&self, batch: &[FeatureRow]) -> Result<Vec<Vec<f64>>> {
        batch
            .iter()
            .map(|row| {
                self.evaluate(row)?
                    .probabilities
                    .context("No probability output from model")
            })
            .collect()
    }
}
