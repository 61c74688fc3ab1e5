//! Remote prediction service integration
//!
//! The scheduler treats the prediction service as optional: every call
//! can fail or time out and the caller falls back to the local score.

mod client;
mod features;

pub use client::{ClientConfig, HttpPredictionClient};
pub use features::{FeatureExtractor, FeatureInputs, FeatureValue, Features};

use crate::error::PredictionError;
use crate::models::MetricsEvent;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /analyze`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub node_name: String,
    pub features: Features,
    /// Unix seconds
    pub timestamp: i64,
}

/// Parsed prediction result; non-numeric fields are treated as absent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub score: Option<f64>,
    pub confidence: Option<f64>,
}

impl PredictionResponse {
    /// Pull `score` and `confidence` out of an arbitrary JSON body
    pub fn from_json(body: &Value) -> Self {
        Self {
            score: body.get("score").and_then(Value::as_f64),
            confidence: body.get("confidence").and_then(Value::as_f64),
        }
    }
}

/// A remote service that scores nodes and accepts forwarded metrics
#[async_trait]
pub trait PredictionService: Send + Sync {
    /// Ask for a score for one node
    async fn analyze(&self, request: &PredictionRequest) -> Result<PredictionResponse, PredictionError>;

    /// Forward one collected metrics item
    async fn push_metric(&self, event: &MetricsEvent) -> Result<(), PredictionError>;
}
