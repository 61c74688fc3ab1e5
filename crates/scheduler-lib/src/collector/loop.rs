//! Cluster collection loop
//!
//! On every tick lists pods and nodes from the cluster-state provider,
//! records pod events into the history cache and pushes pod events and
//! node usage samples onto the fan-out queue.

use super::fanout::{FanoutSender, SendOutcome};
use crate::cluster::ClusterState;
use crate::health::{components, HealthRegistry};
use crate::history::HistoryCache;
use crate::models::{MetricsEvent, NodeUsageSample};
use crate::observability::SchedulerMetrics;
use anyhow::Result;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Configuration for the collection loop
#[derive(Debug, Clone)]
pub struct CollectionConfig {
    /// Tick interval (default: 30 seconds)
    pub interval: Duration,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
        }
    }
}

pub struct CollectionLoop {
    cluster: Arc<dyn ClusterState>,
    cache: Arc<HistoryCache>,
    fanout: FanoutSender,
    config: CollectionConfig,
    health: Option<HealthRegistry>,
    metrics: SchedulerMetrics,
}

/// Results from one collection cycle
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectionResults {
    pub pods_recorded: usize,
    pub nodes_sampled: usize,
    pub dropped: usize,
    pub errors: usize,
}

impl CollectionLoop {
    pub fn new(
        cluster: Arc<dyn ClusterState>,
        cache: Arc<HistoryCache>,
        fanout: FanoutSender,
        config: CollectionConfig,
    ) -> Self {
        Self {
            cluster,
            cache,
            fanout,
            config,
            health: None,
            metrics: SchedulerMetrics::new(),
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            "Starting cluster collection loop"
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles = 0u64;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let start = Instant::now();
                    let results = self.collect_once().await;
                    let elapsed = start.elapsed();
                    cycles += 1;

                    self.metrics.observe_collection_latency(elapsed.as_secs_f64());
                    debug!(
                        cycle = cycles,
                        pods = results.pods_recorded,
                        nodes = results.nodes_sampled,
                        dropped = results.dropped,
                        errors = results.errors,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Collection cycle complete"
                    );
                }
                _ = shutdown.recv() => {
                    info!(cycles, "Shutting down cluster collection loop");
                    break;
                }
            }
        }
    }

    /// Run a single collection cycle
    pub async fn collect_once(&self) -> CollectionResults {
        let mut results = CollectionResults::default();
        let now = Utc::now();
        let mut pods_per_node: HashMap<String, u32> = HashMap::new();

        match self.cluster.list_pods().await {
            Ok(pods) => {
                for event in pods.into_iter().filter_map(|p| p.into_event(now)) {
                    *pods_per_node.entry(event.node_name.clone()).or_default() += 1;
                    self.cache.record_at(event.clone(), now);
                    results.pods_recorded += 1;
                    self.push(MetricsEvent::Pod(event), &mut results).await;
                }
            }
            Err(e) => {
                results.errors += 1;
                self.metrics.inc_collection_errors();
                warn!(error = %e, "Failed to list pods");
            }
        }

        match self.cluster.list_nodes().await {
            Ok(nodes) => {
                for node in nodes {
                    let sample = self.sample_node(&node.name, &pods_per_node).await;
                    results.nodes_sampled += 1;
                    self.push(MetricsEvent::Node(sample), &mut results).await;
                }
            }
            Err(e) => {
                results.errors += 1;
                self.metrics.inc_collection_errors();
                warn!(error = %e, "Failed to list nodes");
            }
        }

        let stats = self.cache.stats();
        self.metrics
            .set_cache_size(stats.tracked_nodes, stats.cached_events);
        self.report_health(&results).await;

        results
    }

    async fn sample_node(&self, node_name: &str, pods_per_node: &HashMap<String, u32>) -> NodeUsageSample {
        let pod_count = pods_per_node.get(node_name).copied().unwrap_or(0);
        let usage = match self.cluster.node_usage(node_name).await {
            Ok(usage) => usage,
            Err(e) => {
                debug!(node = %node_name, error = %e, "Node usage unavailable");
                None
            }
        };

        match usage {
            Some(mut sample) => {
                sample.pod_count = pod_count;
                sample
            }
            None => NodeUsageSample {
                node_name: node_name.to_string(),
                cpu_cores: 0.0,
                memory_gb: 0.0,
                pod_count,
                observed_at: Utc::now(),
            },
        }
    }

    async fn push(&self, event: MetricsEvent, results: &mut CollectionResults) {
        if self.fanout.send(event).await == SendOutcome::Dropped {
            results.dropped += 1;
        }
    }

    async fn report_health(&self, results: &CollectionResults) {
        let Some(health) = &self.health else { return };
        if results.errors == 0 {
            health.set_healthy(components::CLUSTER_STATE).await;
            health.set_healthy(components::COLLECTOR).await;
        } else {
            health
                .set_degraded(components::CLUSTER_STATE, "Cluster listing failed")
                .await;
            health
                .set_degraded(
                    components::COLLECTOR,
                    format!("{} errors in last cycle", results.errors),
                )
                .await;
        }
    }
}

/// Builder for the collection loop
pub struct CollectionLoopBuilder {
    cluster: Option<Arc<dyn ClusterState>>,
    cache: Option<Arc<HistoryCache>>,
    fanout: Option<FanoutSender>,
    health: Option<HealthRegistry>,
    config: CollectionConfig,
}

impl CollectionLoopBuilder {
    pub fn new() -> Self {
        Self {
            cluster: None,
            cache: None,
            fanout: None,
            health: None,
            config: CollectionConfig::default(),
        }
    }

    pub fn cluster(mut self, cluster: Arc<dyn ClusterState>) -> Self {
        self.cluster = Some(cluster);
        self
    }

    pub fn cache(mut self, cache: Arc<HistoryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn fanout(mut self, fanout: FanoutSender) -> Self {
        self.fanout = Some(fanout);
        self
    }

    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    pub fn build(self) -> Result<CollectionLoop> {
        let cluster = self
            .cluster
            .ok_or_else(|| anyhow::anyhow!("Cluster state is required"))?;
        let cache = self
            .cache
            .ok_or_else(|| anyhow::anyhow!("History cache is required"))?;
        let fanout = self
            .fanout
            .ok_or_else(|| anyhow::anyhow!("Fan-out sender is required"))?;
        if self.config.interval.is_zero() {
            anyhow::bail!("Collection interval must be positive");
        }

        let mut collection_loop = CollectionLoop::new(cluster, cache, fanout, self.config);
        collection_loop.health = self.health;
        Ok(collection_loop)
    }
}

impl Default for CollectionLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}
