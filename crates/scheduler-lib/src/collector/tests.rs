//! Collection cycle tests against an in-memory cluster

#[cfg(test)]
mod collection_tests {
    use crate::cluster::{ClusterState, InMemoryClusterState};
    use crate::collector::{
        fanout_queue, CollectionLoop, CollectionLoopBuilder, CollectionConfig, FanoutConfig,
    };
    use crate::health::{components, ComponentStatus, HealthRegistry};
    use crate::history::HistoryCache;
    use crate::models::{MetricsEvent, NodeUsageSample, PodSnapshot, PodStatus};
    use chrono::{Duration as ChronoDuration, Utc};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::broadcast;

    fn pod(name: &str, node: Option<&str>, status: PodStatus, restarts: u32) -> PodSnapshot {
        PodSnapshot {
            pod_name: name.to_string(),
            namespace: "default".to_string(),
            node_name: node.map(str::to_string),
            status,
            restart_count: restarts,
            created_at: Utc::now() - ChronoDuration::hours(3),
        }
    }

    async fn cluster_with_pods() -> Arc<InMemoryClusterState> {
        let cluster = Arc::new(InMemoryClusterState::with_sample_cluster());
        cluster
            .upsert_pod(pod("api-0", Some("worker-1"), PodStatus::Running, 1))
            .await;
        cluster
            .upsert_pod(pod("api-1", Some("worker-1"), PodStatus::Failed, 4))
            .await;
        cluster
            .upsert_pod(pod("queued", None, PodStatus::Pending, 0))
            .await;
        cluster
    }

    #[tokio::test]
    async fn test_collect_once_records_scheduled_pods() {
        let cluster = cluster_with_pods().await;
        let cache = Arc::new(HistoryCache::default());
        let (tx, mut rx) = fanout_queue(&FanoutConfig::default());

        let collection_loop =
            CollectionLoop::new(cluster, cache.clone(), tx, CollectionConfig::default());
        let results = collection_loop.collect_once().await;

        // three sample pods plus api-0 and api-1; the pending pod has no node
        assert_eq!(results.pods_recorded, 5);
        assert_eq!(results.nodes_sampled, 3);
        assert_eq!(results.errors, 0);

        let worker1 = cache.query("worker-1");
        assert_eq!(worker1.len(), 3);
        assert!((cache.failure_rate("worker-1") - 1.0 / 3.0).abs() < 1e-9);

        let mut pod_items = 0;
        let mut node_items = Vec::new();
        while let Ok(item) = rx.try_recv() {
            match item {
                MetricsEvent::Pod(_) => pod_items += 1,
                MetricsEvent::Node(sample) => node_items.push(sample),
            }
        }
        assert_eq!(pod_items, 5);
        assert_eq!(node_items.len(), 3);
        let worker1_sample = node_items.iter().find(|s| s.node_name == "worker-1").unwrap();
        assert_eq!(worker1_sample.pod_count, 3);
        assert_eq!(worker1_sample.cpu_cores, 0.5);
    }

    #[tokio::test]
    async fn test_usage_failure_yields_zero_sample() {
        let cluster = cluster_with_pods().await;
        cluster.set_usage_failure(true);
        let (tx, mut rx) = fanout_queue(&FanoutConfig::default());

        let collection_loop = CollectionLoop::new(
            cluster,
            Arc::new(HistoryCache::default()),
            tx,
            CollectionConfig::default(),
        );
        let results = collection_loop.collect_once().await;
        assert_eq!(results.errors, 0);

        let samples: Vec<NodeUsageSample> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter_map(|item| match item {
                MetricsEvent::Node(s) => Some(s),
                MetricsEvent::Pod(_) => None,
            })
            .collect();
        assert_eq!(samples.len(), 3);
        assert!(samples.iter().all(|s| s.cpu_cores == 0.0 && s.memory_gb == 0.0));
    }

    #[tokio::test]
    async fn test_listing_failure_degrades_health() {
        let cluster = cluster_with_pods().await;
        cluster.set_listing_failure(true);
        let health = HealthRegistry::new();
        let (tx, _rx) = fanout_queue(&FanoutConfig::default());

        let collection_loop = CollectionLoopBuilder::new()
            .cluster(cluster.clone())
            .cache(Arc::new(HistoryCache::default()))
            .fanout(tx)
            .health(health.clone())
            .build()
            .unwrap();

        let results = collection_loop.collect_once().await;
        assert_eq!(results.errors, 2);
        assert_eq!(
            health.status_of(components::CLUSTER_STATE).await,
            Some(ComponentStatus::Degraded)
        );

        cluster.set_listing_failure(false);
        collection_loop.collect_once().await;
        assert_eq!(
            health.status_of(components::CLUSTER_STATE).await,
            Some(ComponentStatus::Healthy)
        );
    }

    #[tokio::test]
    async fn test_full_queue_does_not_block_collection() {
        let cluster = cluster_with_pods().await;
        let cache = Arc::new(HistoryCache::default());
        let (tx, _rx) = fanout_queue(&FanoutConfig {
            capacity: 1,
            send_timeout: Duration::from_millis(1),
        });

        let collection_loop =
            CollectionLoop::new(cluster, cache.clone(), tx.clone(), CollectionConfig::default());
        let results = collection_loop.collect_once().await;

        assert_eq!(results.pods_recorded, 5);
        assert_eq!(results.dropped, 7);
        assert_eq!(tx.dropped(), 7);
        // the cache is written regardless of queue pressure
        assert_eq!(cache.stats().cached_events, 5);
    }

    #[tokio::test]
    async fn test_builder_requires_parts() {
        let (tx, _rx) = fanout_queue(&FanoutConfig::default());
        assert!(CollectionLoopBuilder::new().fanout(tx.clone()).build().is_err());

        let cluster: Arc<dyn ClusterState> = Arc::new(InMemoryClusterState::new());
        let zero_interval = CollectionLoopBuilder::new()
            .cluster(cluster)
            .cache(Arc::new(HistoryCache::default()))
            .fanout(tx)
            .interval(Duration::ZERO)
            .build();
        assert!(zero_interval.is_err());
    }

    #[tokio::test]
    async fn test_run_ticks_until_shutdown() {
        let cluster = cluster_with_pods().await;
        let cache = Arc::new(HistoryCache::default());
        let (tx, _rx) = fanout_queue(&FanoutConfig::default());
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let collection_loop = CollectionLoopBuilder::new()
            .cluster(cluster)
            .cache(cache.clone())
            .fanout(tx)
            .interval(Duration::from_millis(10))
            .build()
            .unwrap();

        let handle = tokio::spawn(collection_loop.run(shutdown_rx));
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();

        // the first tick fires immediately
        assert!(cache.stats().cached_events >= 5);
    }
}
