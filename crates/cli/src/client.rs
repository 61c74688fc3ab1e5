//! API client for the scheduler HTTP API

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// API client for the scheduler
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    /// Like `get` but returns the body on any status; health endpoints
    /// answer 503 with a useful payload
    pub async fn get_any_status<T: DeserializeOwned>(&self, path: &str) -> Result<(u16, T)> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status().as_u16();
        let body = response.json().await.context("Failed to parse response")?;
        Ok((status, body))
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, message);
        }

        response.json().await.context("Failed to parse response")
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

// API request and response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    pub pod_name: String,
    pub namespace: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeScore {
    pub node_name: String,
    pub score: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeList {
    pub nodes: Vec<NodeScore>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeAnalysis {
    pub node_name: String,
    pub total_pods: usize,
    pub failed_pods: usize,
    pub successful_pods: usize,
    pub failure_rate: f64,
    pub avg_restart_count: f64,
    pub avg_lifetime_secs: i64,
    pub stability_score: f64,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodEvent {
    pub pod_name: String,
    pub namespace: String,
    pub status: String,
    pub restart_count: u32,
    pub created_at: String,
    pub observed_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeHistory {
    pub node_name: String,
    pub failure_rate: f64,
    pub restart_rate: f64,
    pub last_updated: Option<String>,
    pub events: Vec<PodEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub components: BTreeMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Readiness {
    pub ready: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_parses_node_list() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/nodes")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"nodes": [{"node_name": "worker-1", "score": 120.5, "reason": "ok"}]})
                    .to_string(),
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let list: NodeList = client.get("api/v1/nodes").await.unwrap();

        mock.assert_async().await;
        assert_eq!(list.nodes.len(), 1);
        assert_eq!(list.nodes[0].node_name, "worker-1");
    }

    #[tokio::test]
    async fn test_error_body_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/predict")
            .with_status(404)
            .with_body(json!({"error": "pod not found: default/ghost"}).to_string())
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let request = PredictRequest {
            pod_name: "ghost".to_string(),
            namespace: "default".to_string(),
        };
        let err = client
            .post::<NodeScore, _>("api/v1/predict", &request)
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("404"));
        assert!(message.contains("pod not found: default/ghost"));
    }

    #[tokio::test]
    async fn test_get_any_status_keeps_unhealthy_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/readyz")
            .with_status(503)
            .with_body(json!({"ready": false, "reason": "Cluster state unavailable"}).to_string())
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let (status, readiness): (u16, Readiness) = client.get_any_status("readyz").await.unwrap();

        assert_eq!(status, 503);
        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("Cluster state unavailable"));
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(ApiClient::new("not a url").is_err());
    }
}
