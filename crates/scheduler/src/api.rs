//! HTTP API: placement, node analysis, history ingestion, health and metrics

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use prometheus::{Encoder, TextEncoder};
use scheduler_lib::{
    health::{ComponentStatus, HealthRegistry},
    parse_window, NodeScore, PodEvent, PodIdentity, PodStatus, SchedulerEngine, SchedulerError,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SchedulerEngine>,
    pub health_registry: HealthRegistry,
    /// Window used when an analysis request names none
    pub default_window: Duration,
}

impl AppState {
    pub fn new(engine: Arc<SchedulerEngine>, health_registry: HealthRegistry, default_window: Duration) -> Self {
        Self {
            engine,
            health_registry,
            default_window,
        }
    }
}

/// Engine errors mapped onto HTTP statuses
pub struct ApiError(SchedulerError);

impl From<SchedulerError> for ApiError {
    fn from(err: SchedulerError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SchedulerError::NotFound { .. } => StatusCode::NOT_FOUND,
            SchedulerError::InvalidWindow(_) => StatusCode::BAD_REQUEST,
            SchedulerError::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            SchedulerError::ClusterState(_) => StatusCode::BAD_GATEWAY,
        };
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": message.into() })),
    )
        .into_response()
}

/// Health check response - 200 while operational, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub pod_name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_namespace() -> String {
    "default".to_string()
}

async fn predict(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<NodeScore>, ApiError> {
    let pod = PodIdentity::new(request.namespace, request.pod_name);
    let best = state.engine.predict_best_node(&pod).await?;
    Ok(Json(best))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NodesResponse {
    pub nodes: Vec<NodeScore>,
}

async fn list_nodes(State(state): State<Arc<AppState>>) -> Result<Json<NodesResponse>, ApiError> {
    let nodes = state.engine.rank_nodes().await?;
    Ok(Json(NodesResponse { nodes }))
}

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    pub window: Option<String>,
}

async fn node_analysis(
    State(state): State<Arc<AppState>>,
    Path(node): Path<String>,
    Query(query): Query<WindowQuery>,
) -> Result<Response, ApiError> {
    let window = match query.window.as_deref() {
        Some(raw) => parse_window(raw)?,
        None => state.default_window,
    };
    let analysis = state.engine.get_node_analysis(&node, window)?;
    Ok(Json(analysis).into_response())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub node_name: String,
    pub failure_rate: f64,
    pub restart_rate: f64,
    pub last_updated: Option<DateTime<Utc>>,
    pub events: Vec<PodEvent>,
}

async fn node_history(
    State(state): State<Arc<AppState>>,
    Path(node): Path<String>,
) -> Json<HistoryResponse> {
    let cache = state.engine.cache();
    Json(HistoryResponse {
        failure_rate: cache.failure_rate(&node),
        restart_rate: cache.restart_rate(&node),
        last_updated: cache.last_updated(&node),
        events: state.engine.get_node_history(&node),
        node_name: node,
    })
}

/// Pod event pushed by an external observer; timestamps default to now
#[derive(Debug, Deserialize)]
pub struct EventRequest {
    pub pod_name: String,
    pub node_name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    pub status: PodStatus,
    #[serde(default)]
    pub restart_count: u32,
    pub created_at: Option<DateTime<Utc>>,
    pub observed_at: Option<DateTime<Utc>>,
}

async fn record_event(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EventRequest>,
) -> Response {
    if request.node_name.trim().is_empty() {
        return bad_request("node_name must not be empty");
    }

    let now = Utc::now();
    let event = PodEvent {
        pod_name: request.pod_name,
        node_name: request.node_name,
        namespace: request.namespace,
        status: request.status,
        restart_count: request.restart_count,
        created_at: request.created_at.unwrap_or(now),
        observed_at: request.observed_at.unwrap_or(now),
    };
    state.engine.record_pod_event(event);

    (StatusCode::ACCEPTED, Json(json!({ "status": "recorded" }))).into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(healthz))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/predict", post(predict))
        .route("/api/v1/nodes", get(list_nodes))
        .route("/api/v1/nodes/:node/analysis", get(node_analysis))
        .route("/api/v1/nodes/:node/history", get(node_history))
        .route("/api/v1/events", post(record_event))
        .with_state(state)
}

/// Start the API server, stopping on the shutdown broadcast
pub async fn serve(
    addr: String,
    state: Arc<AppState>,
    mut shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;

    Ok(())
}
