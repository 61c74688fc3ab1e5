//! Cluster-state providers
//!
//! The engine only sees the `ClusterState` trait. `KubeClusterState` talks to
//! a real API server, `InMemoryClusterState` backs tests and mock mode.

mod kubernetes;
mod memory;
pub mod quantity;

pub use kubernetes::{KubeClusterState, NodeMetrics, NodeMetricsUsage};
pub use memory::InMemoryClusterState;

use crate::models::{NodeInfo, NodeUsageSample, PodIdentity, PodSnapshot};
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ClusterState: Send + Sync {
    /// All nodes, in the provider's listing order
    async fn list_nodes(&self) -> Result<Vec<NodeInfo>>;

    /// All pods across namespaces
    async fn list_pods(&self) -> Result<Vec<PodSnapshot>>;

    /// A single pod, `None` when it does not exist
    async fn get_pod(&self, pod: &PodIdentity) -> Result<Option<PodSnapshot>>;

    /// Live usage of a node, `None` when no usage source reports it
    async fn node_usage(&self, node_name: &str) -> Result<Option<NodeUsageSample>>;
}
