//! AI Scheduler - history-aware node placement service
//!
//! Runs the collection loop against the cluster, keeps per-node pod
//! history, and serves placement decisions over HTTP.

use anyhow::{Context, Result};
use scheduler_lib::{
    cluster::{ClusterState, InMemoryClusterState, KubeClusterState},
    collector::{fanout_queue, CollectionLoopBuilder, FanoutReceiver, MetricsForwarder},
    health::{components, HealthRegistry},
    observability::{SchedulerMetrics, StructuredLogger},
    prediction::{HttpPredictionClient, PredictionService},
    scoring::{DecisionBlender, ScoringEngine},
    HistoryCache, SchedulerEngine,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

use config::{LogFormat, SchedulerConfig};

const SCHEDULER_VERSION: &str = env!("CARGO_PKG_VERSION");

fn init_tracing(config: &SchedulerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty())
            .init(),
    }
}

async fn connect_cluster(config: &SchedulerConfig) -> Result<(Arc<dyn ClusterState>, &'static str)> {
    if config.kubernetes.enabled {
        let cluster = KubeClusterState::try_default()
            .await
            .context("Failed to connect to Kubernetes")?;
        Ok((Arc::new(cluster), "kubernetes"))
    } else {
        warn!("Kubernetes disabled, using built-in sample cluster");
        Ok((Arc::new(InMemoryClusterState::with_sample_cluster()), "in-memory"))
    }
}

/// Consume the fan-out queue when nothing forwards it
async fn drain(mut rx: FanoutReceiver, mut shutdown: broadcast::Receiver<()>) {
    loop {
        tokio::select! {
            item = rx.recv() => {
                if item.is_none() {
                    break;
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = SchedulerConfig::load()?;
    init_tracing(&config);

    info!(addr = %config.listen_addr(), "Starting ai-scheduler");

    // Initialize health registry
    let health_registry = HealthRegistry::new();
    health_registry.register(components::CLUSTER_STATE).await;
    health_registry.register(components::COLLECTOR).await;
    health_registry.register(components::PREDICTION_SERVICE).await;
    health_registry.register(components::HISTORY_CACHE).await;

    // Register metrics before anything observes them
    let _metrics = SchedulerMetrics::new();

    let (cluster, cluster_mode) = connect_cluster(&config).await?;
    let cache = Arc::new(HistoryCache::new(config.retention()));

    let prediction: Option<Arc<dyn PredictionService>> = match config.prediction_client() {
        Some(client_config) => Some(Arc::new(HttpPredictionClient::new(client_config)?)),
        None => None,
    };

    let instance = std::env::var("HOSTNAME").unwrap_or_else(|_| "ai-scheduler".to_string());
    let logger = StructuredLogger::new(instance);
    logger.log_startup(
        SCHEDULER_VERSION,
        cluster_mode,
        config.prediction.ai_api_url.as_deref(),
    );

    let mut engine = SchedulerEngine::new(cluster.clone(), cache.clone())
        .with_scoring(ScoringEngine::new(config.scoring.clone()))
        .with_blender(DecisionBlender::new(config.blend.clone()))
        .with_config(config.engine())
        .with_health(health_registry.clone());
    if let Some(service) = &prediction {
        engine = engine.with_prediction(service.clone());
    }
    let engine = Arc::new(engine);

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // Collection loop feeds the history cache and the fan-out queue
    let (fanout_tx, fanout_rx) = fanout_queue(&config.fanout());
    let collection_loop = CollectionLoopBuilder::new()
        .cluster(cluster)
        .cache(cache)
        .fanout(fanout_tx)
        .health(health_registry.clone())
        .interval(config.collection_interval())
        .build()?;
    let collector_handle = tokio::spawn(collection_loop.run(shutdown_tx.subscribe()));

    let forwarder_handle = match prediction {
        Some(service) if config.prediction.forward_metrics => {
            let forwarder =
                MetricsForwarder::new(service, fanout_rx).with_health(health_registry.clone());
            tokio::spawn(forwarder.run(shutdown_tx.subscribe()))
        }
        _ => tokio::spawn(drain(fanout_rx, shutdown_tx.subscribe())),
    };

    let app_state = Arc::new(api::AppState::new(
        engine,
        health_registry.clone(),
        config.engine().analysis_window,
    ));

    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(
        config.listen_addr(),
        app_state,
        shutdown_tx.subscribe(),
    ));

    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");
    health_registry.set_ready(false).await;

    let _ = shutdown_tx.send(());
    let _ = collector_handle.await;
    let _ = forwarder_handle.await;
    match api_handle.await {
        Ok(Err(e)) => warn!(error = %e, "API server exited with error"),
        Err(e) => warn!(error = %e, "API server task failed"),
        Ok(Ok(())) => {}
    }

    info!("Shutdown complete");
    Ok(())
}
