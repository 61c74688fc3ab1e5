//! In-memory cluster state for tests and mock mode

use super::ClusterState;
use crate::models::{NodeInfo, NodeUsageSample, PodIdentity, PodSnapshot, PodStatus};
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryClusterState {
    nodes: RwLock<Vec<NodeInfo>>,
    pods: RwLock<Vec<PodSnapshot>>,
    usage: RwLock<HashMap<String, NodeUsageSample>>,
    fail_listing: AtomicBool,
    fail_usage: AtomicBool,
}

impl InMemoryClusterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A small fixed cluster for running without an API server
    pub fn with_sample_cluster() -> Self {
        let now = Utc::now();
        let mut nodes = Vec::new();
        let mut pods = Vec::new();
        let mut usage = HashMap::new();
        for (i, name) in ["worker-1", "worker-2", "worker-3"].iter().enumerate() {
            nodes.push(NodeInfo {
                name: name.to_string(),
                cpu_capacity_cores: Some(4.0),
                memory_capacity_gb: Some(16.0),
                ready: true,
                taints: Vec::new(),
            });
            usage.insert(
                name.to_string(),
                NodeUsageSample {
                    node_name: name.to_string(),
                    cpu_cores: 0.5 + i as f64,
                    memory_gb: 2.0 + 3.0 * i as f64,
                    pod_count: 1,
                    observed_at: now,
                },
            );
            pods.push(PodSnapshot {
                pod_name: format!("sample-app-{i}"),
                namespace: "default".to_string(),
                node_name: Some(name.to_string()),
                status: PodStatus::Running,
                restart_count: i as u32,
                created_at: now - Duration::hours(2),
            });
        }

        Self {
            nodes: RwLock::new(nodes),
            pods: RwLock::new(pods),
            usage: RwLock::new(usage),
            ..Self::default()
        }
    }

    pub async fn upsert_node(&self, node: NodeInfo) {
        let mut nodes = self.nodes.write().await;
        match nodes.iter_mut().find(|n| n.name == node.name) {
            Some(existing) => *existing = node,
            None => nodes.push(node),
        }
    }

    pub async fn upsert_pod(&self, pod: PodSnapshot) {
        let mut pods = self.pods.write().await;
        match pods
            .iter_mut()
            .find(|p| p.namespace == pod.namespace && p.pod_name == pod.pod_name)
        {
            Some(existing) => *existing = pod,
            None => pods.push(pod),
        }
    }

    pub async fn set_usage(&self, sample: NodeUsageSample) {
        self.usage
            .write()
            .await
            .insert(sample.node_name.clone(), sample);
    }

    /// Make node and pod listing fail until reset
    pub fn set_listing_failure(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    /// Make usage lookups fail until reset
    pub fn set_usage_failure(&self, fail: bool) {
        self.fail_usage.store(fail, Ordering::SeqCst);
    }

    fn check_listing(&self) -> Result<()> {
        if self.fail_listing.load(Ordering::SeqCst) {
            bail!("cluster listing unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterState for InMemoryClusterState {
    async fn list_nodes(&self) -> Result<Vec<NodeInfo>> {
        self.check_listing()?;
        Ok(self.nodes.read().await.clone())
    }

    async fn list_pods(&self) -> Result<Vec<PodSnapshot>> {
        self.check_listing()?;
        Ok(self.pods.read().await.clone())
    }

    async fn get_pod(&self, pod: &PodIdentity) -> Result<Option<PodSnapshot>> {
        self.check_listing()?;
        Ok(self
            .pods
            .read()
            .await
            .iter()
            .find(|p| p.namespace == pod.namespace && p.pod_name == pod.name)
            .cloned())
    }

    async fn node_usage(&self, node_name: &str) -> Result<Option<NodeUsageSample>> {
        if self.fail_usage.load(Ordering::SeqCst) {
            bail!("metrics source unavailable for {node_name}");
        }
        Ok(self.usage.read().await.get(node_name).cloned())
    }
}
