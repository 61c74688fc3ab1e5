//! Per-node pod history with retention pruning
//!
//! Each node owns an immutable event snapshot (`Arc<[PodEvent]>`) plus
//! aggregates derived from it. A write rebuilds the snapshot and its
//! aggregates under the node's shard lock, so readers only ever see a
//! snapshot together with the aggregates computed from it.

use super::analyzer::NodeAnalyzer;
use crate::models::{NodeAnalysis, PodEvent};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Default retention of recorded events
pub const DEFAULT_RETENTION_HOURS: i64 = 7 * 24;

#[derive(Debug, Clone)]
struct NodeHistory {
    events: Arc<[PodEvent]>,
    failure_rate: f64,
    restart_rate: f64,
    last_updated: DateTime<Utc>,
}

impl NodeHistory {
    fn build(events: Vec<PodEvent>, now: DateTime<Utc>) -> Self {
        let (failure_rate, restart_rate) = if events.is_empty() {
            (0.0, 0.0)
        } else {
            let total = events.len() as f64;
            let failed = events.iter().filter(|e| e.status.is_failed()).count();
            let restarts: u64 = events.iter().map(|e| e.restart_count as u64).sum();
            (failed as f64 / total, restarts as f64 / total)
        };

        Self {
            events: events.into(),
            failure_rate,
            restart_rate,
            last_updated: now,
        }
    }
}

/// Size of the cache for metrics and diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub tracked_nodes: usize,
    pub cached_events: usize,
}

/// Thread-safe history store keyed by node name
pub struct HistoryCache {
    nodes: DashMap<String, NodeHistory>,
    retention: Duration,
}

impl Default for HistoryCache {
    fn default() -> Self {
        Self::new(Duration::hours(DEFAULT_RETENTION_HOURS))
    }
}

impl HistoryCache {
    pub fn new(retention: Duration) -> Self {
        Self {
            nodes: DashMap::new(),
            retention,
        }
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Record an event against its node, pruning at the current time
    pub fn record(&self, event: PodEvent) {
        self.record_at(event, Utc::now());
    }

    /// Record an event and prune everything observed before `now - retention`.
    ///
    /// The new event is subject to the same cutoff: a stale event is dropped.
    pub fn record_at(&self, event: PodEvent, now: DateTime<Utc>) {
        let cutoff = now - self.retention;
        let mut entry = self
            .nodes
            .entry(event.node_name.clone())
            .or_insert_with(|| NodeHistory::build(Vec::new(), now));

        let before = entry.events.len();
        let kept: Vec<PodEvent> = entry
            .events
            .iter()
            .cloned()
            .chain(std::iter::once(event))
            .filter(|e| e.observed_at >= cutoff)
            .collect();
        let pruned = (before + 1).saturating_sub(kept.len());

        *entry = NodeHistory::build(kept, now);

        if pruned > 0 {
            debug!(node = %entry.key(), pruned, "Pruned expired pod events");
        }
    }

    /// Snapshot of a node's retained events in insertion order
    pub fn query(&self, node_name: &str) -> Arc<[PodEvent]> {
        self.nodes
            .get(node_name)
            .map(|h| Arc::clone(&h.events))
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }

    /// Failure rate over all retained events of a node
    pub fn failure_rate(&self, node_name: &str) -> f64 {
        self.nodes.get(node_name).map_or(0.0, |h| h.failure_rate)
    }

    /// Average restart count over all retained events of a node
    pub fn restart_rate(&self, node_name: &str) -> f64 {
        self.nodes.get(node_name).map_or(0.0, |h| h.restart_rate)
    }

    pub fn last_updated(&self, node_name: &str) -> Option<DateTime<Utc>> {
        self.nodes.get(node_name).map(|h| h.last_updated)
    }

    /// Windowed analysis ending now
    pub fn analysis(&self, node_name: &str, window: Duration) -> NodeAnalysis {
        self.analysis_at(node_name, window, Utc::now())
    }

    pub fn analysis_at(&self, node_name: &str, window: Duration, now: DateTime<Utc>) -> NodeAnalysis {
        // Take the snapshot first so the shard lock is not held while analyzing
        let events = self.query(node_name);
        NodeAnalyzer::analyze(node_name, &events, window, now)
    }

    /// Names of all nodes with recorded history
    pub fn node_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.nodes.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats {
            tracked_nodes: 0,
            cached_events: 0,
        };
        for entry in self.nodes.iter() {
            stats.tracked_nodes += 1;
            stats.cached_events += entry.events.len();
        }
        stats
    }
}
