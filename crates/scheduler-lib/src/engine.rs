//! Placement engine
//!
//! Ties the cluster-state provider, history cache, local scoring and the
//! optional prediction service together behind the engine API.

use crate::cluster::ClusterState;
use crate::error::{Result, SchedulerError};
use crate::health::{components, HealthRegistry};
use crate::history::{validate_window, HistoryCache};
use crate::models::{NodeAnalysis, NodeInfo, NodeScore, NodeUsageSample, PodEvent, PodIdentity};
use crate::observability::{SchedulerMetrics, StructuredLogger};
use crate::prediction::{
    FeatureExtractor, FeatureInputs, PredictionRequest, PredictionResponse, PredictionService,
};
use crate::scoring::{DecisionBlender, DecisionSource, ScoreBreakdown, ScoringEngine};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::task::JoinSet;
use tokio::time::{timeout, Instant};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Window of the analysis used for scoring
    pub analysis_window: Duration,
    /// Window of the analysis used for the trend feature
    pub trend_window: Duration,
    /// Upper bound on a whole placement request
    pub placement_deadline: StdDuration,
    /// Upper bound on one node's remote prediction
    pub prediction_timeout: StdDuration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            analysis_window: Duration::hours(24),
            trend_window: Duration::days(7),
            placement_deadline: StdDuration::from_secs(10),
            prediction_timeout: StdDuration::from_secs(5),
        }
    }
}

/// Per-node state gathered before any remote call
struct Candidate {
    node: NodeInfo,
    local: ScoreBreakdown,
    request: PredictionRequest,
}

pub struct SchedulerEngine {
    cluster: Arc<dyn ClusterState>,
    cache: Arc<HistoryCache>,
    scoring: ScoringEngine,
    blender: DecisionBlender,
    prediction: Option<Arc<dyn PredictionService>>,
    config: EngineConfig,
    health: Option<HealthRegistry>,
    metrics: SchedulerMetrics,
    logger: StructuredLogger,
}

impl SchedulerEngine {
    pub fn new(cluster: Arc<dyn ClusterState>, cache: Arc<HistoryCache>) -> Self {
        Self {
            cluster,
            cache,
            scoring: ScoringEngine::default(),
            blender: DecisionBlender::default(),
            prediction: None,
            config: EngineConfig::default(),
            health: None,
            metrics: SchedulerMetrics::new(),
            logger: StructuredLogger::new("engine"),
        }
    }

    pub fn with_scoring(mut self, scoring: ScoringEngine) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn with_blender(mut self, blender: DecisionBlender) -> Self {
        self.blender = blender;
        self
    }

    pub fn with_prediction(mut self, service: Arc<dyn PredictionService>) -> Self {
        self.prediction = Some(service);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn cache(&self) -> &Arc<HistoryCache> {
        &self.cache
    }

    /// Pick the best node for a pod within the placement deadline
    pub async fn predict_best_node(&self, pod: &PodIdentity) -> Result<NodeScore> {
        timeout(self.config.placement_deadline, self.place(pod))
            .await
            .map_err(|_| SchedulerError::DeadlineExceeded)?
    }

    async fn place(&self, pod: &PodIdentity) -> Result<NodeScore> {
        self.cluster
            .get_pod(pod)
            .await?
            .ok_or_else(|| SchedulerError::not_found("pod", pod.to_string()))?;

        let ranked = self.rank_nodes().await?;
        let best = select_best(&ranked)
            .cloned()
            .ok_or_else(|| SchedulerError::not_found("node", "no schedulable nodes"))?;

        self.metrics.inc_placements();
        self.logger
            .log_placement(&pod.to_string(), &best.node_name, best.score, ranked.len());
        Ok(best)
    }

    /// Final score of every node, in the provider's listing order
    pub async fn rank_nodes(&self) -> Result<Vec<NodeScore>> {
        let start = Instant::now();
        let nodes = self.cluster.list_nodes().await?;
        let now = Utc::now();

        let mut candidates = Vec::with_capacity(nodes.len());
        for node in nodes {
            candidates.push(self.candidate(node, now).await);
        }

        let remote = self.remote_predictions(&candidates).await;

        let scores = candidates
            .into_iter()
            .zip(remote)
            .map(|(candidate, remote)| {
                let decision = self
                    .blender
                    .finalize(candidate.local.score, remote.as_ref());
                if decision.source == DecisionSource::LocalOnly && self.prediction.is_some() {
                    self.metrics.inc_prediction_fallbacks();
                    self.logger.log_prediction_fallback(
                        &candidate.node.name,
                        candidate.local.score,
                        "no usable remote score",
                    );
                }
                NodeScore {
                    node_name: candidate.node.name,
                    score: decision.score,
                    reason: format!("{} | {}", candidate.local.reason(), decision.reason),
                }
            })
            .collect();

        self.metrics
            .observe_scoring_latency(start.elapsed().as_secs_f64());
        Ok(scores)
    }

    async fn candidate(&self, node: NodeInfo, now: DateTime<Utc>) -> Candidate {
        let usage = self.usage(&node.name).await;
        let recent = self
            .cache
            .analysis_at(&node.name, self.config.analysis_window, now);
        let trend = self
            .cache
            .analysis_at(&node.name, self.config.trend_window, now);

        let local = self.scoring.score(&node, usage.as_ref(), &recent);
        let features = FeatureExtractor::extract(&FeatureInputs {
            node: &node,
            usage: usage.as_ref(),
            recent: &recent,
            trend: &trend,
            now,
        });
        let request = PredictionRequest {
            node_name: node.name.clone(),
            features,
            timestamp: now.timestamp(),
        };

        Candidate {
            node,
            local,
            request,
        }
    }

    async fn usage(&self, node_name: &str) -> Option<NodeUsageSample> {
        match self.cluster.node_usage(node_name).await {
            Ok(usage) => usage,
            Err(e) => {
                warn!(node = %node_name, error = %e, "Failed to read node usage, assuming idle");
                None
            }
        }
    }

    /// Remote predictions aligned with `candidates`.
    ///
    /// Calls run concurrently, each under its own timeout. Dropping the
    /// returned future aborts every call still in flight.
    async fn remote_predictions(&self, candidates: &[Candidate]) -> Vec<Option<PredictionResponse>> {
        let mut results = vec![None; candidates.len()];
        let Some(service) = &self.prediction else {
            return results;
        };

        let start = Instant::now();
        let mut calls = JoinSet::new();
        for (index, candidate) in candidates.iter().enumerate() {
            let service = Arc::clone(service);
            let request = candidate.request.clone();
            let limit = self.config.prediction_timeout;
            calls.spawn(async move {
                let outcome = timeout(limit, service.analyze(&request)).await;
                (index, request.node_name, outcome)
            });
        }

        let mut failures = 0usize;
        while let Some(joined) = calls.join_next().await {
            let (index, node, outcome) = match joined {
                Ok(done) => done,
                Err(e) => {
                    failures += 1;
                    warn!(error = %e, "Prediction task failed");
                    continue;
                }
            };
            match outcome {
                Ok(Ok(response)) => results[index] = Some(response),
                Ok(Err(e)) => {
                    failures += 1;
                    debug!(node = %node, error = %e, "Prediction request failed");
                }
                Err(_) => {
                    failures += 1;
                    debug!(node = %node, "Prediction request timed out");
                }
            }
        }
        self.metrics
            .observe_prediction_latency(start.elapsed().as_secs_f64());

        if let Some(health) = &self.health {
            if failures > 0 {
                health
                    .set_degraded(
                        components::PREDICTION_SERVICE,
                        format!("{failures} of {} predictions failed", candidates.len()),
                    )
                    .await;
            } else if !candidates.is_empty() {
                health.set_healthy(components::PREDICTION_SERVICE).await;
            }
        }

        results
    }

    /// Windowed analysis of a node ending now
    pub fn get_node_analysis(&self, node_name: &str, window: Duration) -> Result<NodeAnalysis> {
        let window = validate_window(window)?;
        Ok(self.cache.analysis(node_name, window))
    }

    /// Record an externally observed pod event
    pub fn record_pod_event(&self, event: PodEvent) {
        self.logger
            .log_history_recorded(&event.node_name, &event.pod_name, event.status.as_str());
        self.cache.record(event);
        let stats = self.cache.stats();
        self.metrics
            .set_cache_size(stats.tracked_nodes, stats.cached_events);
    }

    /// Retained events of a node in insertion order
    pub fn get_node_history(&self, node_name: &str) -> Vec<PodEvent> {
        self.cache.query(node_name).to_vec()
    }
}

/// Highest score wins; on ties the earliest entry is kept
pub fn select_best(scores: &[NodeScore]) -> Option<&NodeScore> {
    let mut iter = scores.iter();
    let mut best = iter.next()?;
    for candidate in iter {
        if candidate.score > best.score {
            best = candidate;
        }
    }
    Some(best)
}
