//! Cluster state backed by the Kubernetes API and metrics.k8s.io

use super::quantity;
use super::ClusterState;
use crate::models::{NodeInfo, NodeUsageSample, PodIdentity, PodSnapshot, PodStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use k8s_openapi::api::core::v1::{Node, Pod};
use k8s_openapi::apimachinery::pkg::{api::resource::Quantity, apis::meta::v1::ObjectMeta};
use kube::api::{Api, ListParams};
use kube::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// `metrics.k8s.io/v1beta1` node usage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeMetrics {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub window: Option<String>,
    pub usage: NodeMetricsUsage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeMetricsUsage {
    pub cpu: Quantity,
    pub memory: Quantity,
}

impl k8s_openapi::Resource for NodeMetrics {
    type Scope = k8s_openapi::ClusterResourceScope;

    const API_VERSION: &'static str = "metrics.k8s.io/v1beta1";
    const GROUP: &'static str = "metrics.k8s.io";
    const KIND: &'static str = "NodeMetrics";
    const URL_PATH_SEGMENT: &'static str = "nodes";
    const VERSION: &'static str = "v1beta1";
}

impl k8s_openapi::Metadata for NodeMetrics {
    type Ty = ObjectMeta;

    fn metadata(&self) -> &Self::Ty {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut Self::Ty {
        &mut self.metadata
    }
}

#[derive(Clone)]
pub struct KubeClusterState {
    client: Client,
}

impl KubeClusterState {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using in-cluster config or the local kubeconfig
    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default()
            .await
            .context("Failed to create Kubernetes client")?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl ClusterState for KubeClusterState {
    async fn list_nodes(&self) -> Result<Vec<NodeInfo>> {
        let nodes: Api<Node> = Api::all(self.client.clone());
        let list = nodes
            .list(&ListParams::default())
            .await
            .context("Failed to list nodes")?;
        Ok(list.items.iter().map(node_info).collect())
    }

    async fn list_pods(&self) -> Result<Vec<PodSnapshot>> {
        let pods: Api<Pod> = Api::all(self.client.clone());
        let list = pods
            .list(&ListParams::default())
            .await
            .context("Failed to list pods")?;
        Ok(list.items.iter().map(pod_snapshot).collect())
    }

    async fn get_pod(&self, pod: &PodIdentity) -> Result<Option<PodSnapshot>> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), &pod.namespace);
        let found = pods
            .get_opt(&pod.name)
            .await
            .with_context(|| format!("Failed to get pod {pod}"))?;
        Ok(found.as_ref().map(pod_snapshot))
    }

    async fn node_usage(&self, node_name: &str) -> Result<Option<NodeUsageSample>> {
        let metrics: Api<NodeMetrics> = Api::all(self.client.clone());
        let Some(found) = metrics
            .get_opt(node_name)
            .await
            .with_context(|| format!("Failed to read metrics for node {node_name}"))?
        else {
            debug!(node = %node_name, "No usage reported by metrics API");
            return Ok(None);
        };

        Ok(Some(NodeUsageSample {
            node_name: node_name.to_string(),
            cpu_cores: quantity::cpu_cores(&found.usage.cpu.0).unwrap_or_default(),
            memory_gb: quantity::memory_gb(&found.usage.memory.0).unwrap_or_default(),
            pod_count: 0,
            observed_at: Utc::now(),
        }))
    }
}

/// Capacity from `status.allocatable`, readiness from the Ready condition
pub(crate) fn node_info(node: &Node) -> NodeInfo {
    let status = node.status.as_ref();
    let allocatable = status.and_then(|s| s.allocatable.as_ref());

    let ready = status
        .and_then(|s| s.conditions.as_ref())
        .map_or(false, |conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "True")
        });

    let taints = node
        .spec
        .as_ref()
        .and_then(|s| s.taints.as_ref())
        .map(|taints| {
            taints
                .iter()
                .map(|t| match &t.value {
                    Some(v) => format!("{}={}:{}", t.key, v, t.effect),
                    None => format!("{}:{}", t.key, t.effect),
                })
                .collect()
        })
        .unwrap_or_default();

    NodeInfo {
        name: node.metadata.name.clone().unwrap_or_default(),
        cpu_capacity_cores: allocatable
            .and_then(|a| a.get("cpu"))
            .and_then(|q| quantity::cpu_cores(&q.0)),
        memory_capacity_gb: allocatable
            .and_then(|a| a.get("memory"))
            .and_then(|q| quantity::memory_gb(&q.0)),
        ready,
        taints,
    }
}

/// Phase, summed container restarts and assigned node of a pod
pub(crate) fn pod_snapshot(pod: &Pod) -> PodSnapshot {
    let status = pod.status.as_ref();
    let restart_count = status
        .and_then(|s| s.container_statuses.as_ref())
        .map_or(0, |statuses| {
            statuses
                .iter()
                .map(|c| c.restart_count.max(0) as u32)
                .sum()
        });

    PodSnapshot {
        pod_name: pod.metadata.name.clone().unwrap_or_default(),
        namespace: pod
            .metadata
            .namespace
            .clone()
            .unwrap_or_else(|| "default".to_string()),
        node_name: pod.spec.as_ref().and_then(|s| s.node_name.clone()),
        status: status
            .and_then(|s| s.phase.as_deref())
            .map_or(PodStatus::Unknown, PodStatus::from),
        restart_count,
        created_at: pod
            .metadata
            .creation_timestamp
            .as_ref()
            .map_or_else(Utc::now, |t| t.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{
        ContainerStatus, NodeCondition, NodeSpec, NodeStatus, PodSpec, PodStatus as K8sPodStatus,
        Taint,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
    use std::collections::BTreeMap;

    fn node(ready: &str, taints: Option<Vec<Taint>>) -> Node {
        let mut allocatable = BTreeMap::new();
        allocatable.insert("cpu".to_string(), Quantity("3500m".to_string()));
        allocatable.insert("memory".to_string(), Quantity("8Gi".to_string()));

        Node {
            metadata: ObjectMeta {
                name: Some("node-a".to_string()),
                ..Default::default()
            },
            spec: Some(NodeSpec {
                taints,
                ..Default::default()
            }),
            status: Some(NodeStatus {
                allocatable: Some(allocatable),
                conditions: Some(vec![NodeCondition {
                    type_: "Ready".to_string(),
                    status: ready.to_string(),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_node_info_from_api_object() {
        let info = node_info(&node("True", None));
        assert_eq!(info.name, "node-a");
        assert_eq!(info.cpu_capacity_cores, Some(3.5));
        assert_eq!(info.memory_capacity_gb, Some(8.0));
        assert!(info.ready);
        assert!(info.taints.is_empty());
    }

    #[test]
    fn test_node_taints_and_not_ready() {
        let taints = vec![Taint {
            key: "dedicated".to_string(),
            value: Some("gpu".to_string()),
            effect: "NoSchedule".to_string(),
            time_added: None,
        }];
        let info = node_info(&node("False", Some(taints)));
        assert!(!info.ready);
        assert_eq!(info.taints, vec!["dedicated=gpu:NoSchedule"]);
    }

    #[test]
    fn test_node_without_status() {
        let info = node_info(&Node::default());
        assert_eq!(info.cpu_capacity_cores, None);
        assert!(!info.ready);
    }

    #[test]
    fn test_pod_snapshot_sums_restarts() {
        let created = Utc::now();
        let container = |restarts: i32| ContainerStatus {
            restart_count: restarts,
            ..Default::default()
        };
        let pod = Pod {
            metadata: ObjectMeta {
                name: Some("web-0".to_string()),
                namespace: Some("shop".to_string()),
                creation_timestamp: Some(Time(created)),
                ..Default::default()
            },
            spec: Some(PodSpec {
                node_name: Some("node-a".to_string()),
                ..Default::default()
            }),
            status: Some(K8sPodStatus {
                phase: Some("Failed".to_string()),
                container_statuses: Some(vec![container(2), container(3)]),
                ..Default::default()
            }),
        };

        let snapshot = pod_snapshot(&pod);
        assert_eq!(snapshot.pod_name, "web-0");
        assert_eq!(snapshot.namespace, "shop");
        assert_eq!(snapshot.node_name.as_deref(), Some("node-a"));
        assert_eq!(snapshot.status, PodStatus::Failed);
        assert_eq!(snapshot.restart_count, 5);
        assert_eq!(snapshot.created_at, created);
    }

    #[test]
    fn test_pod_without_phase_is_unknown() {
        let snapshot = pod_snapshot(&Pod::default());
        assert_eq!(snapshot.status, PodStatus::Unknown);
        assert_eq!(snapshot.node_name, None);
    }
}
