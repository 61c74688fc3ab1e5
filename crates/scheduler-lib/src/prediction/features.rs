//! Feature extraction for remote node scoring
//!
//! Turns a node's capacity, live usage and history analyses into the flat
//! feature map sent with every prediction request.

use crate::history::{HIGH_FAILURE_RATE, HIGH_RESTART_COUNT};
use crate::models::{NodeAnalysis, NodeInfo, NodeUsageSample};
use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Usage ratio above which a resource counts as a risk factor
const HIGH_USAGE_RATIO: f64 = 0.8;
/// Number of risk factors that can be raised
const RISK_FACTOR_COUNT: f64 = 4.0;
/// Pods per node treated as full density
const POD_DENSITY_SCALE: f64 = 10.0;
const TREND_SCALE: f64 = 10.0;

/// A single feature value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        FeatureValue::Number(v)
    }
}

impl From<Vec<String>> for FeatureValue {
    fn from(v: Vec<String>) -> Self {
        FeatureValue::List(v)
    }
}

impl FeatureValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Number(v) => Some(*v),
            _ => None,
        }
    }
}

/// Ordered feature map
pub type Features = BTreeMap<String, FeatureValue>;

/// Everything known about one node at decision time
pub struct FeatureInputs<'a> {
    pub node: &'a NodeInfo,
    pub usage: Option<&'a NodeUsageSample>,
    /// 24h analysis
    pub recent: &'a NodeAnalysis,
    /// 7d analysis
    pub trend: &'a NodeAnalysis,
    pub now: DateTime<Utc>,
}

pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn extract(inputs: &FeatureInputs<'_>) -> Features {
        let mut features = Features::new();
        let node = inputs.node;
        let recent = inputs.recent;

        let cpu_capacity = node.cpu_capacity_cores.unwrap_or_default();
        let memory_capacity = node.memory_capacity_gb.unwrap_or_default();
        let cpu_used = inputs.usage.map_or(0.0, |u| u.cpu_cores);
        let memory_used = inputs.usage.map_or(0.0, |u| u.memory_gb);

        let cpu_ratio = ratio(cpu_used, cpu_capacity);
        let memory_ratio = ratio(memory_used, memory_capacity);

        let mut put = |key: &str, value: FeatureValue| {
            features.insert(key.to_string(), value);
        };

        put("cpu_usage_ratio", cpu_ratio.into());
        put("memory_usage_ratio", memory_ratio.into());
        put("pod_count", (recent.total_pods as f64).into());
        put("cpu_capacity", cpu_capacity.into());
        put("memory_capacity_gb", memory_capacity.into());
        // negative when usage exceeds allocatable
        put("available_cpu", (cpu_capacity - cpu_used).into());
        put("available_memory_gb", (memory_capacity - memory_used).into());

        put("failed_pods_ratio", recent.failure_rate.into());
        put("avg_restart_count", recent.avg_restart_count.into());
        put(
            "avg_pod_lifetime_hours",
            (recent.avg_lifetime.num_seconds() as f64 / 3600.0).into(),
        );
        put("stability_score", recent.stability_score.into());
        put("pod_density", (recent.total_pods as f64 / POD_DENSITY_SCALE).into());
        put(
            "trend_score",
            ((inputs.trend.stability_score - recent.stability_score) * TREND_SCALE).into(),
        );
        // a node without history counts as fully successful
        put("success_rate", (1.0 - recent.failure_rate).into());

        let mut risks = Vec::new();
        if recent.failure_rate > HIGH_FAILURE_RATE {
            risks.push("high_failure_rate".to_string());
        }
        if recent.avg_restart_count > HIGH_RESTART_COUNT {
            risks.push("high_restart_rate".to_string());
        }
        if cpu_ratio > HIGH_USAGE_RATIO {
            risks.push("high_cpu_usage".to_string());
        }
        if memory_ratio > HIGH_USAGE_RATIO {
            risks.push("high_memory_usage".to_string());
        }
        put("risk_score", (risks.len() as f64 / RISK_FACTOR_COUNT).into());
        put("risk_factors", risks.into());

        put("hour_of_day", (inputs.now.hour() as f64 / 24.0).into());
        put(
            "day_of_week",
            (inputs.now.weekday().num_days_from_sunday() as f64 / 7.0).into(),
        );

        features
    }
}

fn ratio(used: f64, capacity: f64) -> f64 {
    if capacity > 0.0 {
        used / capacity
    } else {
        0.0
    }
}
