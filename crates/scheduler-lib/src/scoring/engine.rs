//! Deterministic local scoring of a node

use crate::history::HIGH_FAILURE_RATE;
use crate::models::{NodeAnalysis, NodeInfo, NodeUsageSample};
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Stability above which the full history weight is granted
const HIGH_STABILITY: f64 = 0.8;
/// Stability above which half the history weight is granted
const MEDIUM_STABILITY: f64 = 0.6;
/// Failure rate below which the full history weight is granted
const LOW_FAILURE_RATE: f64 = 0.05;
const LOW_RESTARTS: f64 = 1.0;
const MEDIUM_RESTARTS: f64 = 2.0;
/// Bonus or penalty applied for pod lifetime
pub const LIFETIME_BONUS: f64 = 10.0;

/// Per-term weights of the local score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub cpu_weight: f64,
    pub memory_weight: f64,
    pub node_ready_weight: f64,
    pub taint_weight: f64,
    /// Weight of the stability and failure-rate tiers
    pub failed_pods_weight: f64,
    pub restart_weight: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            cpu_weight: 30.0,
            memory_weight: 30.0,
            node_ready_weight: 20.0,
            taint_weight: 10.0,
            failed_pods_weight: 20.0,
            restart_weight: 10.0,
        }
    }
}

/// Local score with its per-term trace
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBreakdown {
    pub score: f64,
    pub reasons: Vec<String>,
}

impl ScoreBreakdown {
    /// Caller-visible reason: the trace prefixed with the total
    pub fn reason(&self) -> String {
        format!("total score: {:.2} - {}", self.score, self.reasons.join("; "))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    weights: ScoringWeights,
}

impl ScoringEngine {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score a node from its capacity, live usage and 24h analysis.
    ///
    /// A missing usage sample counts as zero usage and is noted in the trace.
    pub fn score(
        &self,
        node: &NodeInfo,
        usage: Option<&NodeUsageSample>,
        analysis: &NodeAnalysis,
    ) -> ScoreBreakdown {
        let w = &self.weights;
        let mut score = 0.0;
        let mut reasons = Vec::with_capacity(8);

        let (cpu_used, mem_used) = usage.map_or((0.0, 0.0), |u| (u.cpu_cores, u.memory_gb));
        let note = if usage.is_none() { ", no live usage" } else { "" };

        match resource_term(w.cpu_weight, cpu_used, node.cpu_capacity_cores) {
            Some(term) => {
                score += term;
                reasons.push(format!(
                    "cpu: {:.2} (usage {:.2}/{:.2} cores{})",
                    term,
                    cpu_used,
                    node.cpu_capacity_cores.unwrap_or_default(),
                    note
                ));
            }
            None => reasons.push("cpu: skipped, capacity unknown".to_string()),
        }

        match resource_term(w.memory_weight, mem_used, node.memory_capacity_gb) {
            Some(term) => {
                score += term;
                reasons.push(format!(
                    "memory: {:.2} (usage {:.2}/{:.2} GB{})",
                    term,
                    mem_used,
                    node.memory_capacity_gb.unwrap_or_default(),
                    note
                ));
            }
            None => reasons.push("memory: skipped, capacity unknown".to_string()),
        }

        if node.ready {
            score += w.node_ready_weight;
            reasons.push(format!("ready: {:.2}", w.node_ready_weight));
        } else {
            reasons.push("not ready: 0.00".to_string());
        }

        if node.taints.is_empty() {
            score += w.taint_weight;
            reasons.push(format!("no taints: {:.2}", w.taint_weight));
        } else {
            reasons.push(format!("tainted ({}): 0.00", node.taints.len()));
        }

        let (history, history_reasons) = self.history_terms(analysis);
        score += history;
        reasons.extend(history_reasons);

        ScoreBreakdown { score, reasons }
    }

    /// Stability, failure-rate, restart and lifetime tiers
    fn history_terms(&self, analysis: &NodeAnalysis) -> (f64, Vec<String>) {
        let history = self.weights.failed_pods_weight;
        let restart = self.weights.restart_weight;
        let mut total = 0.0;
        let mut reasons = Vec::with_capacity(4);

        let stability = if analysis.stability_score > HIGH_STABILITY {
            history
        } else if analysis.stability_score > MEDIUM_STABILITY {
            history / 2.0
        } else {
            0.0
        };
        total += stability;
        reasons.push(format!(
            "stability {:.2}: {:.2}",
            analysis.stability_score, stability
        ));

        let failures = if analysis.failure_rate < LOW_FAILURE_RATE {
            history
        } else if analysis.failure_rate < HIGH_FAILURE_RATE {
            history / 2.0
        } else {
            -history
        };
        total += failures;
        reasons.push(format!(
            "failure rate {:.2}: {:.2}",
            analysis.failure_rate, failures
        ));

        let restarts = if analysis.avg_restart_count <= LOW_RESTARTS {
            restart
        } else if analysis.avg_restart_count <= MEDIUM_RESTARTS {
            0.0
        } else {
            -restart
        };
        total += restarts;
        reasons.push(format!(
            "restarts {:.2}: {:.2}",
            analysis.avg_restart_count, restarts
        ));

        let lifetime = if analysis.avg_lifetime > Duration::hours(24) {
            LIFETIME_BONUS
        } else if analysis.avg_lifetime > Duration::hours(1) {
            0.0
        } else {
            -LIFETIME_BONUS
        };
        total += lifetime;
        reasons.push(format!(
            "lifetime {:.1}h: {:.2}",
            analysis.avg_lifetime.num_minutes() as f64 / 60.0,
            lifetime
        ));

        (total, reasons)
    }
}

/// `max(0, weight * (1 - used/capacity))`, `None` when capacity is unknown or zero
fn resource_term(weight: f64, used: f64, capacity: Option<f64>) -> Option<f64> {
    let capacity = capacity.filter(|c| *c > 0.0)?;
    let percent = used / capacity * 100.0;
    Some((weight * (1.0 - percent / 100.0)).max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn node(ready: bool, taints: usize) -> NodeInfo {
        NodeInfo {
            name: "node-a".to_string(),
            cpu_capacity_cores: Some(4.0),
            memory_capacity_gb: Some(16.0),
            ready,
            taints: (0..taints).map(|i| format!("t{i}=x:NoSchedule")).collect(),
        }
    }

    fn usage(cpu: f64, mem: f64) -> NodeUsageSample {
        NodeUsageSample {
            node_name: "node-a".to_string(),
            cpu_cores: cpu,
            memory_gb: mem,
            pod_count: 0,
            observed_at: Utc::now(),
        }
    }

    fn analysis(stability: f64, failure_rate: f64, restarts: f64, lifetime: Duration) -> NodeAnalysis {
        NodeAnalysis {
            node_name: "node-a".to_string(),
            total_pods: 10,
            failed_pods: 0,
            successful_pods: 10,
            failure_rate,
            avg_restart_count: restarts,
            avg_lifetime: lifetime,
            stability_score: stability,
            recommendations: Vec::new(),
        }
    }

    #[test]
    fn test_ideal_node_takes_every_maximum() {
        let engine = ScoringEngine::default();
        let result = engine.score(
            &node(true, 0),
            Some(&usage(0.0, 0.0)),
            &analysis(1.0, 0.0, 0.0, Duration::hours(48)),
        );

        // 30 + 30 + 20 + 10 + 20 (stability) + 20 (failure) + 10 + 10
        assert!((result.score - 150.0).abs() < 1e-9);
        assert_eq!(result.reasons.len(), 8);
    }

    #[test]
    fn test_resource_terms_follow_usage() {
        let engine = ScoringEngine::default();
        let empty = NodeAnalysis::empty("node-a");
        let half = engine.score(&node(true, 0), Some(&usage(2.0, 8.0)), &empty);
        let idle = engine.score(&node(true, 0), Some(&usage(0.0, 0.0)), &empty);

        assert!((idle.score - half.score - 30.0).abs() < 1e-9);
        assert!(half.reasons[0].starts_with("cpu: 15.00"));
        assert!(half.reasons[1].starts_with("memory: 15.00"));
    }

    #[test]
    fn test_overcommitted_node_is_clamped_at_zero() {
        let engine = ScoringEngine::default();
        let result = engine.score(
            &node(true, 0),
            Some(&usage(8.0, 32.0)),
            &NodeAnalysis::empty("node-a"),
        );
        assert!(result.reasons[0].starts_with("cpu: 0.00"));
        assert!(result.reasons[1].starts_with("memory: 0.00"));
    }

    #[test]
    fn test_missing_usage_counts_as_idle_with_note() {
        let engine = ScoringEngine::default();
        let result = engine.score(&node(true, 0), None, &NodeAnalysis::empty("node-a"));
        assert!(result.reasons[0].contains("no live usage"));
        assert!(result.reasons[0].starts_with("cpu: 30.00"));
    }

    #[test]
    fn test_unknown_capacity_is_skipped() {
        let engine = ScoringEngine::default();
        let mut info = node(true, 0);
        info.cpu_capacity_cores = None;
        info.memory_capacity_gb = Some(0.0);

        let result = engine.score(&info, Some(&usage(1.0, 1.0)), &NodeAnalysis::empty("node-a"));
        assert_eq!(result.reasons[0], "cpu: skipped, capacity unknown");
        assert_eq!(result.reasons[1], "memory: skipped, capacity unknown");
    }

    #[test]
    fn test_not_ready_and_tainted() {
        let engine = ScoringEngine::default();
        let empty = NodeAnalysis::empty("node-a");
        let good = engine.score(&node(true, 0), None, &empty);
        let bad = engine.score(&node(false, 2), None, &empty);

        assert!((good.score - bad.score - 30.0).abs() < 1e-9);
        assert_eq!(bad.reasons[2], "not ready: 0.00");
        assert_eq!(bad.reasons[3], "tainted (2): 0.00");
    }

    #[test]
    fn test_one_failure_in_ten_tiers() {
        let engine = ScoringEngine::default();
        // stability 0.85, failure rate exactly 0.1, avg restarts 0.5
        let a = analysis(0.85, 0.1, 0.5, Duration::hours(2));
        let (history, reasons) = engine.history_terms(&a);

        // +20 stability, -20 failure rate, +10 restarts, 0 lifetime
        assert!((history - 10.0).abs() < 1e-9);
        assert_eq!(reasons[1], "failure rate 0.10: -20.00");
    }

    #[test]
    fn test_history_tier_boundaries() {
        let engine = ScoringEngine::default();

        let (medium, _) = engine.history_terms(&analysis(0.7, 0.07, 1.5, Duration::hours(2)));
        // +10 stability, +10 failure rate, 0 restarts, 0 lifetime
        assert!((medium - 20.0).abs() < 1e-9);

        let (poor, _) = engine.history_terms(&analysis(0.5, 0.3, 2.5, Duration::minutes(30)));
        // 0 stability, -20 failure rate, -10 restarts, -10 lifetime
        assert!((poor + 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_history_is_neutral_to_negative() {
        let engine = ScoringEngine::default();
        let (history, _) = engine.history_terms(&NodeAnalysis::empty("node-a"));
        // 0 stability, +20 failure rate, +10 restarts, -10 lifetime
        assert!((history - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_is_deterministic() {
        let engine = ScoringEngine::default();
        let info = node(true, 1);
        let sample = usage(1.3, 5.7);
        let a = analysis(0.9, 0.02, 0.3, Duration::hours(30));

        let first = engine.score(&info, Some(&sample), &a);
        let second = engine.score(&info, Some(&sample), &a);
        assert_eq!(first, second);
        assert_eq!(first.reason(), second.reason());
        assert!(first.reason().starts_with(&format!("total score: {:.2} - ", first.score)));
    }
}
