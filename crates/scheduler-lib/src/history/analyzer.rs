//! Windowed stability analysis over a node's pod events

use crate::models::{NodeAnalysis, PodEvent};
use chrono::{DateTime, Duration, Utc};

/// Failure rate above which a node is flagged
pub const HIGH_FAILURE_RATE: f64 = 0.1;

/// Average restarts per pod above which a node is flagged
pub const HIGH_RESTART_COUNT: f64 = 2.0;

/// Stability below which a node is flagged
pub const LOW_STABILITY: f64 = 0.7;

/// Weight of average restarts in the stability formula
const RESTART_PENALTY: f64 = 0.1;

pub const RECOMMEND_HIGH_FAILURE: &str =
    "High failure rate detected: consider checking node health";
pub const RECOMMEND_HIGH_RESTARTS: &str =
    "High restart rate: pods are unstable on this node";
pub const RECOMMEND_LOW_STABILITY: &str =
    "Low stability score: avoid scheduling critical workloads here";

/// Stateless analyzer turning an event snapshot into a `NodeAnalysis`
pub struct NodeAnalyzer;

impl NodeAnalyzer {
    /// Analyze the events of `node_name` observed in `[now - window, now]`.
    ///
    /// Both bounds are inclusive. An empty window yields a zero-valued
    /// analysis carrying the requested node name.
    pub fn analyze(
        node_name: &str,
        events: &[PodEvent],
        window: Duration,
        now: DateTime<Utc>,
    ) -> NodeAnalysis {
        let cutoff = now - window;
        let in_window: Vec<&PodEvent> = events
            .iter()
            .filter(|e| e.observed_at >= cutoff && e.observed_at <= now)
            .collect();

        if in_window.is_empty() {
            return NodeAnalysis::empty(node_name);
        }

        let total = in_window.len();
        let failed = in_window.iter().filter(|e| e.status.is_failed()).count();
        let restarts: u64 = in_window.iter().map(|e| e.restart_count as u64).sum();
        let lifetime_ms: i64 = in_window
            .iter()
            .map(|e| (now - e.created_at).num_milliseconds())
            .sum();

        let failure_rate = failed as f64 / total as f64;
        let avg_restart_count = restarts as f64 / total as f64;
        let avg_lifetime = Duration::milliseconds(lifetime_ms / total as i64);
        let stability_score = 1.0 - failure_rate - RESTART_PENALTY * avg_restart_count;

        let mut recommendations = Vec::new();
        if failure_rate > HIGH_FAILURE_RATE {
            recommendations.push(RECOMMEND_HIGH_FAILURE.to_string());
        }
        if avg_restart_count > HIGH_RESTART_COUNT {
            recommendations.push(RECOMMEND_HIGH_RESTARTS.to_string());
        }
        if stability_score < LOW_STABILITY {
            recommendations.push(RECOMMEND_LOW_STABILITY.to_string());
        }

        NodeAnalysis {
            node_name: node_name.to_string(),
            total_pods: total,
            failed_pods: failed,
            successful_pods: total - failed,
            failure_rate,
            avg_restart_count,
            avg_lifetime,
            stability_score,
            recommendations,
        }
    }
}
