//! HTTP client for the prediction service
//!
//! - `POST {endpoint}/analyze` for node scores
//! - `POST {endpoint}/metrics` for forwarded samples
//! - Bounded retries with exponential backoff on transient failures

use super::{PredictionRequest, PredictionResponse, PredictionService};
use crate::error::PredictionError;
use crate::models::MetricsEvent;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Configuration for the prediction client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the service (e.g., "http://ai-service:5000")
    pub endpoint: String,
    /// Per-attempt request timeout
    pub request_timeout: Duration,
    /// Extra attempts after the first one
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://ai-service:5000".to_string(),
            request_timeout: Duration::from_secs(2),
            max_retries: 2,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
        }
    }
}

/// reqwest-backed `PredictionService`
#[derive(Debug, Clone)]
pub struct HttpPredictionClient {
    client: reqwest::Client,
    base_url: Url,
    config: ClientConfig,
}

impl HttpPredictionClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut endpoint = config.endpoint.clone();
        if !endpoint.ends_with('/') {
            endpoint.push('/');
        }
        let base_url = Url::parse(&endpoint)
            .with_context(|| format!("Invalid prediction service URL: {}", config.endpoint))?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// POST a JSON body, retrying transient failures
    async fn post_with_retry<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Value, PredictionError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| PredictionError::Transport(e.to_string()))?;

        let mut backoff = self.config.initial_backoff;
        let mut attempt = 0;
        loop {
            match self.post_once(&url, body).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    debug!(
                        url = %url,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Retrying prediction service request"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = std::cmp::min(backoff * 2, self.config.max_backoff);
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn post_once<B: Serialize>(&self, url: &Url, body: &B) -> Result<Value, PredictionError> {
        let response = self.client.post(url.clone()).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PredictionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| PredictionError::Decode(e.to_string()))
    }
}

#[async_trait]
impl PredictionService for HttpPredictionClient {
    async fn analyze(&self, request: &PredictionRequest) -> Result<PredictionResponse, PredictionError> {
        let body = self.post_with_retry("analyze", request).await?;
        let parsed = PredictionResponse::from_json(&body);
        if parsed.score.is_none() {
            warn!(node = %request.node_name, "Prediction response carried no numeric score");
        }
        Ok(parsed)
    }

    async fn push_metric(&self, event: &MetricsEvent) -> Result<(), PredictionError> {
        self.post_with_retry("metrics", event).await.map(|_| ())
    }
}
