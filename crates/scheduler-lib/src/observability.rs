//! Observability infrastructure for the scheduler
//!
//! Provides:
//! - Prometheus metrics (collection/scoring/prediction latency, cache size, fallbacks)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, Histogram, IntCounter, IntGauge,
};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<SchedulerMetricsInner> = OnceLock::new();

struct SchedulerMetricsInner {
    collection_latency_seconds: Histogram,
    scoring_latency_seconds: Histogram,
    prediction_latency_seconds: Histogram,
    tracked_nodes: IntGauge,
    cached_events: IntGauge,
    placements: IntCounter,
    prediction_fallbacks: IntCounter,
    fanout_dropped: IntCounter,
    collection_errors: IntCounter,
}

impl SchedulerMetricsInner {
    fn new() -> Self {
        Self {
            collection_latency_seconds: register_histogram!(
                "ai_scheduler_collection_latency_seconds",
                "Time spent on one cluster collection cycle",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register collection_latency_seconds"),

            scoring_latency_seconds: register_histogram!(
                "ai_scheduler_scoring_latency_seconds",
                "Time spent ranking all nodes for one placement",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register scoring_latency_seconds"),

            prediction_latency_seconds: register_histogram!(
                "ai_scheduler_prediction_latency_seconds",
                "Time spent waiting on the remote prediction service",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            tracked_nodes: register_int_gauge!(
                "ai_scheduler_tracked_nodes",
                "Number of nodes with pod history in the cache"
            )
            .expect("Failed to register tracked_nodes"),

            cached_events: register_int_gauge!(
                "ai_scheduler_cached_events",
                "Number of pod events retained in the cache"
            )
            .expect("Failed to register cached_events"),

            placements: register_int_counter!(
                "ai_scheduler_placements_total",
                "Total number of placement decisions made"
            )
            .expect("Failed to register placements"),

            prediction_fallbacks: register_int_counter!(
                "ai_scheduler_prediction_fallbacks_total",
                "Node scores that fell back to the local score"
            )
            .expect("Failed to register prediction_fallbacks"),

            fanout_dropped: register_int_counter!(
                "ai_scheduler_fanout_dropped_total",
                "Metrics items dropped because the fan-out queue was full"
            )
            .expect("Failed to register fanout_dropped"),

            collection_errors: register_int_counter!(
                "ai_scheduler_collection_errors_total",
                "Total number of cluster collection errors"
            )
            .expect("Failed to register collection_errors"),
        }
    }
}

/// Scheduler metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share it.
#[derive(Clone)]
pub struct SchedulerMetrics {
    _private: (),
}

impl Default for SchedulerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(SchedulerMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &SchedulerMetricsInner {
        GLOBAL_METRICS.get_or_init(SchedulerMetricsInner::new)
    }

    pub fn observe_collection_latency(&self, duration_secs: f64) {
        self.inner().collection_latency_seconds.observe(duration_secs);
    }

    pub fn observe_scoring_latency(&self, duration_secs: f64) {
        self.inner().scoring_latency_seconds.observe(duration_secs);
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    /// Update cache size gauges
    pub fn set_cache_size(&self, nodes: usize, events: usize) {
        self.inner().tracked_nodes.set(nodes as i64);
        self.inner().cached_events.set(events as i64);
    }

    pub fn inc_placements(&self) {
        self.inner().placements.inc();
    }

    pub fn inc_prediction_fallbacks(&self) {
        self.inner().prediction_fallbacks.inc();
    }

    pub fn inc_fanout_dropped(&self) {
        self.inner().fanout_dropped.inc();
    }

    pub fn inc_collection_errors(&self) {
        self.inner().collection_errors.inc();
    }
}

/// Structured logger for scheduler events
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    /// Log a placement decision
    pub fn log_placement(&self, pod: &str, node: &str, score: f64, candidates: usize) {
        info!(
            event = "placement_decided",
            instance = %self.instance,
            pod = %pod,
            node = %node,
            score = score,
            candidates = candidates,
            "Selected node for pod"
        );
    }

    /// Log a node score that fell back to the local score
    pub fn log_prediction_fallback(&self, node: &str, local_score: f64, reason: &str) {
        warn!(
            event = "prediction_fallback",
            instance = %self.instance,
            node = %node,
            local_score = local_score,
            reason = %reason,
            "Remote prediction unavailable, using local score"
        );
    }

    /// Log a metrics item dropped by a full fan-out queue
    pub fn log_fanout_overflow(&self, node: &str, dropped_total: u64) {
        warn!(
            event = "fanout_overflow",
            instance = %self.instance,
            node = %node,
            dropped_total = dropped_total,
            "Fan-out queue full, dropping metrics item"
        );
    }

    /// Log an externally recorded pod event
    pub fn log_history_recorded(&self, node: &str, pod: &str, status: &str) {
        debug!(
            event = "history_recorded",
            instance = %self.instance,
            node = %node,
            pod = %pod,
            status = %status,
            "Recorded pod event"
        );
    }

    pub fn log_startup(&self, version: &str, cluster_mode: &str, prediction_url: Option<&str>) {
        info!(
            event = "scheduler_started",
            instance = %self.instance,
            version = %version,
            cluster_mode = %cluster_mode,
            prediction_url = prediction_url.unwrap_or("none"),
            "AI scheduler started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "scheduler_shutdown",
            instance = %self.instance,
            reason = %reason,
            "AI scheduler shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_metrics_creation() {
        // Registration happens once per process; repeated handles share it.
        let metrics = SchedulerMetrics::new();
        let again = SchedulerMetrics::new();

        metrics.observe_collection_latency(0.01);
        metrics.observe_scoring_latency(0.002);
        again.observe_prediction_latency(0.2);
        metrics.set_cache_size(3, 120);
        metrics.inc_placements();
        metrics.inc_prediction_fallbacks();
        metrics.inc_fanout_dropped();
        metrics.inc_collection_errors();
    }

    #[test]
    fn test_metrics_are_exposed() {
        let metrics = SchedulerMetrics::new();
        metrics.set_cache_size(2, 10);

        let families = prometheus::gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "ai_scheduler_tracked_nodes"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("scheduler-0");
        assert_eq!(logger.instance, "scheduler-0");
    }
}
