//! Health reporting for the `/healthz` and `/readyz` probes
//!
//! The only component whose state can differ between deployments is the
//! classifier, and it is fixed once at startup, so reports are derived from
//! the [`ClassifierHandle`] on every probe.

use crate::predictor::ClassifierHandle;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Component names used in health reports
pub mod components {
    pub const CLASSIFIER: &str = "classifier";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

/// Body of `/healthz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: BTreeMap<String, ComponentHealth>,
}

/// Body of `/readyz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl HealthResponse {
    /// Report for a service running with `handle`
    pub fn for_classifier(handle: &ClassifierHandle) -> Self {
        let classifier = ComponentHealth {
            status: if handle.is_loaded() {
                ComponentStatus::Healthy
            } else {
                ComponentStatus::Unhealthy
            },
            message: handle.unavailable_reason().map(str::to_string),
            last_check_timestamp: chrono::Utc::now().timestamp(),
        };

        let components = BTreeMap::from([(components::CLASSIFIER.to_string(), classifier)]);
        Self {
            status: overall_status(&components),
            components,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == ComponentStatus::Healthy
    }

    /// Ready once every component is healthy
    pub fn readiness(&self) -> ReadinessResponse {
        let failing: Vec<&str> = self
            .components
            .iter()
            .filter(|(_, h)| h.status == ComponentStatus::Unhealthy)
            .map(|(name, _)| name.as_str())
            .collect();

        if failing.is_empty() {
            ReadinessResponse {
                ready: true,
                reason: None,
            }
        } else {
            ReadinessResponse {
                ready: false,
                reason: Some(format!("Unhealthy components: {}", failing.join(", "))),
            }
        }
    }
}

fn overall_status(components: &BTreeMap<String, ComponentHealth>) -> ComponentStatus {
    if components
        .values()
        .any(|h| h.status == ComponentStatus::Unhealthy)
    {
        ComponentStatus::Unhealthy
    } else {
        ComponentStatus::Healthy
    }
}
