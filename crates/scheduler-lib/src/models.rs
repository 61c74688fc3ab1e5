//! Core data models for the scheduler engine

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Pod lifecycle phase as reported by the cluster
///
/// Unrecognised phase strings are kept verbatim in `Other` so that a
/// malformed event is recorded as-is instead of being rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PodStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
    Other(String),
}

impl PodStatus {
    pub fn as_str(&self) -> &str {
        match self {
            PodStatus::Pending => "Pending",
            PodStatus::Running => "Running",
            PodStatus::Succeeded => "Succeeded",
            PodStatus::Failed => "Failed",
            PodStatus::Unknown => "Unknown",
            PodStatus::Other(raw) => raw,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, PodStatus::Failed)
    }
}

impl From<&str> for PodStatus {
    fn from(raw: &str) -> Self {
        match raw {
            "Pending" => PodStatus::Pending,
            "Running" => PodStatus::Running,
            "Succeeded" => PodStatus::Succeeded,
            "Failed" => PodStatus::Failed,
            "Unknown" => PodStatus::Unknown,
            other => PodStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for PodStatus {
    fn from(raw: String) -> Self {
        PodStatus::from(raw.as_str())
    }
}

impl From<PodStatus> for String {
    fn from(status: PodStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for PodStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single observation of a pod, owned by the node it ran on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodEvent {
    pub pod_name: String,
    pub node_name: String,
    pub namespace: String,
    pub status: PodStatus,
    pub restart_count: u32,
    pub created_at: DateTime<Utc>,
    pub observed_at: DateTime<Utc>,
}

/// Live resource usage of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeUsageSample {
    pub node_name: String,
    pub cpu_cores: f64,
    pub memory_gb: f64,
    pub pod_count: u32,
    pub observed_at: DateTime<Utc>,
}

/// Node state needed for scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub name: String,
    /// Allocatable CPU in cores, `None` when not reported
    pub cpu_capacity_cores: Option<f64>,
    /// Allocatable memory in GB, `None` when not reported
    pub memory_capacity_gb: Option<f64>,
    pub ready: bool,
    /// Taints rendered as `key=value:Effect`
    pub taints: Vec<String>,
}

/// Pod state as listed by the cluster-state provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodSnapshot {
    pub pod_name: String,
    pub namespace: String,
    /// Assigned node, `None` while unscheduled
    pub node_name: Option<String>,
    pub status: PodStatus,
    pub restart_count: u32,
    pub created_at: DateTime<Utc>,
}

impl PodSnapshot {
    /// Turn the snapshot into a history event observed at `observed_at`.
    /// Unscheduled pods belong to no node and yield `None`.
    pub fn into_event(self, observed_at: DateTime<Utc>) -> Option<PodEvent> {
        let node_name = self.node_name.filter(|n| !n.is_empty())?;
        Some(PodEvent {
            pod_name: self.pod_name,
            node_name,
            namespace: self.namespace,
            status: self.status,
            restart_count: self.restart_count,
            created_at: self.created_at,
            observed_at,
        })
    }
}

/// Identity of the pod a placement is requested for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PodIdentity {
    pub name: String,
    pub namespace: String,
}

impl PodIdentity {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for PodIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Windowed stability analysis of a node's pod history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeAnalysis {
    pub node_name: String,
    pub total_pods: usize,
    pub failed_pods: usize,
    pub successful_pods: usize,
    pub failure_rate: f64,
    pub avg_restart_count: f64,
    #[serde(rename = "avg_lifetime_secs", serialize_with = "serialize_duration_secs")]
    pub avg_lifetime: Duration,
    /// Not clamped: heavy restarts push it below zero
    pub stability_score: f64,
    pub recommendations: Vec<String>,
}

impl NodeAnalysis {
    /// Zero-valued analysis used when a node has no events in the window
    pub fn empty(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
            total_pods: 0,
            failed_pods: 0,
            successful_pods: 0,
            failure_rate: 0.0,
            avg_restart_count: 0.0,
            avg_lifetime: Duration::zero(),
            stability_score: 0.0,
            recommendations: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_pods == 0
    }
}

fn serialize_duration_secs<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_i64(d.num_seconds())
}

/// Result of a placement decision for one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeScore {
    pub node_name: String,
    pub score: f64,
    pub reason: String,
}

/// Item carried by the metrics fan-out queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetricsEvent {
    Node(NodeUsageSample),
    Pod(PodEvent),
}

impl MetricsEvent {
    pub fn node_name(&self) -> &str {
        match self {
            MetricsEvent::Node(sample) => &sample.node_name,
            MetricsEvent::Pod(event) => &event.node_name,
        }
    }
}
