//! Prediction service
//!
//! Validates feature records, runs them through the startup classifier and
//! assembles the response. Each call is independent; the only shared state
//! is the read-only [`ClassifierHandle`].

use crate::error::ServiceError;
use crate::models::{
    FeatureRecord, PredictionResult, StatusResponse, FALLBACK_PROBABILITY, POSITIVE_CLASS,
};
use crate::observability::{ServiceMetrics, StructuredLogger};
use crate::predictor::{Classifier, ClassifierHandle};
use anyhow::Context;
use serde_json::Value;
use std::time::Instant;

pub struct PredictionService {
    classifier: ClassifierHandle,
    metrics: ServiceMetrics,
    logger: StructuredLogger,
}

impl PredictionService {
    pub fn new(
        classifier: ClassifierHandle,
        metrics: ServiceMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            classifier,
            metrics,
            logger,
        }
    }

    pub fn classifier(&self) -> &ClassifierHandle {
        &self.classifier
    }

    /// Liveness status; independent of the classifier state
    pub fn health(&self) -> StatusResponse {
        StatusResponse::ok()
    }

    /// Validate a decoded JSON body, then predict
    pub fn predict_json(&self, body: &Value) -> Result<PredictionResult, ServiceError> {
        match FeatureRecord::from_json(body) {
            Ok(record) => self.predict(&record),
            Err(errors) => Err(self.record_failure(ServiceError::InvalidInput(errors))),
        }
    }

    /// Predict the class and positive-class probability of one record
    pub fn predict(&self, record: &FeatureRecord) -> Result<PredictionResult, ServiceError> {
        let classifier = match self.classifier.classifier() {
            Some(classifier) => classifier,
            None => return Err(self.record_failure(ServiceError::ModelUnavailable)),
        };

        let start = Instant::now();
        let result = run_classifier(classifier, record).map_err(ServiceError::inference);
        let elapsed = start.elapsed();

        match result {
            Ok(prediction) => {
                self.metrics.observe_prediction_latency(elapsed.as_secs_f64());
                self.metrics.inc_predictions(prediction.is_diabetic);
                self.logger.log_prediction(
                    prediction.is_diabetic,
                    prediction.probability,
                    elapsed.as_micros() as u64,
                );
                Ok(prediction)
            }
            Err(e) => Err(self.record_failure(e)),
        }
    }

    /// Count and log a failure before handing it back to the caller
    pub fn record_failure(&self, error: ServiceError) -> ServiceError {
        self.metrics.inc_prediction_errors(error.kind());
        self.logger
            .log_prediction_failed(error.kind(), &error.to_string());
        error
    }
}

fn run_classifier(
    classifier: &dyn Classifier,
    record: &FeatureRecord,
) -> anyhow::Result<PredictionResult> {
    let batch = [record.to_row()];

    let labels = classifier.predict(&batch)?;
    let label = *labels.first().context("Classifier returned no labels")?;
    let is_diabetic = match label {
        0 => 0,
        1 => 1,
        other => anyhow::bail!("Classifier produced unexpected class label {}", other),
    };

    let probability = match classifier.probabilities() {
        Some(estimator) => {
            let rows = estimator.predict_proba(&batch)?;
            rows.first()
                .and_then(|row| row.get(POSITIVE_CLASS))
                .copied()
                .context("Probability output has no positive-class column")?
        }
        None => FALLBACK_PROBABILITY,
    };

    Ok(PredictionResult {
        is_diabetic,
        probability,
    })
}
