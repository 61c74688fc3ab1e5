//! Drains the fan-out queue into the prediction service

use super::fanout::FanoutReceiver;
use crate::health::{components, HealthRegistry};
use crate::prediction::PredictionService;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

pub struct MetricsForwarder {
    service: Arc<dyn PredictionService>,
    rx: FanoutReceiver,
    health: Option<HealthRegistry>,
}

impl MetricsForwarder {
    pub fn new(service: Arc<dyn PredictionService>, rx: FanoutReceiver) -> Self {
        Self {
            service,
            rx,
            health: None,
        }
    }

    pub fn with_health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    /// Forward until shutdown or until every sender is gone
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        info!("Starting metrics forwarder");
        let mut forwarded = 0u64;
        let mut failed = 0u64;

        loop {
            tokio::select! {
                item = self.rx.recv() => {
                    let Some(event) = item else {
                        debug!("Fan-out queue closed");
                        break;
                    };
                    match self.service.push_metric(&event).await {
                        Ok(()) => {
                            forwarded += 1;
                            if failed > 0 {
                                failed = 0;
                                self.report(None).await;
                            }
                        }
                        Err(e) => {
                            failed += 1;
                            warn!(node = %event.node_name(), error = %e, "Failed to forward metrics");
                            if failed == 1 {
                                self.report(Some(e.to_string())).await;
                            }
                        }
                    }
                }
                _ = shutdown.recv() => {
                    info!(forwarded, "Shutting down metrics forwarder");
                    break;
                }
            }
        }
    }

    async fn report(&self, error: Option<String>) {
        let Some(health) = &self.health else { return };
        match error {
            Some(message) => {
                health
                    .set_degraded(components::PREDICTION_SERVICE, message)
                    .await
            }
            None => health.set_healthy(components::PREDICTION_SERVICE).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::fanout::{fanout_queue, FanoutConfig};
    use crate::error::PredictionError;
    use crate::health::ComponentStatus;
    use crate::models::{MetricsEvent, NodeUsageSample};
    use crate::prediction::{PredictionRequest, PredictionResponse};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingService {
        pushed: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl PredictionService for CountingService {
        async fn analyze(&self, _: &PredictionRequest) -> Result<PredictionResponse, PredictionError> {
            Ok(PredictionResponse::default())
        }

        async fn push_metric(&self, _: &MetricsEvent) -> Result<(), PredictionError> {
            self.pushed.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(PredictionError::Transport("connection refused".into()))
            } else {
                Ok(())
            }
        }
    }

    fn sample() -> MetricsEvent {
        MetricsEvent::Node(NodeUsageSample {
            node_name: "node-a".to_string(),
            cpu_cores: 1.0,
            memory_gb: 1.0,
            pod_count: 1,
            observed_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn test_forwards_until_queue_closes() {
        let service = Arc::new(CountingService {
            pushed: AtomicUsize::new(0),
            fail: false,
        });
        let (tx, rx) = fanout_queue(&FanoutConfig::default());
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        for _ in 0..3 {
            tx.send(sample()).await;
        }
        drop(tx);

        MetricsForwarder::new(service.clone(), rx).run(shutdown_rx).await;
        assert_eq!(service.pushed.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failures_degrade_prediction_service() {
        let service = Arc::new(CountingService {
            pushed: AtomicUsize::new(0),
            fail: true,
        });
        let health = HealthRegistry::new();
        health.register(components::PREDICTION_SERVICE).await;
        let (tx, rx) = fanout_queue(&FanoutConfig::default());
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        tx.send(sample()).await;
        drop(tx);

        MetricsForwarder::new(service, rx)
            .with_health(health.clone())
            .run(shutdown_rx)
            .await;

        assert_eq!(
            health.status_of(components::PREDICTION_SERVICE).await,
            Some(ComponentStatus::Degraded)
        );
    }

    #[tokio::test]
    async fn test_stops_on_shutdown() {
        let service = Arc::new(CountingService {
            pushed: AtomicUsize::new(0),
            fail: false,
        });
        let (_tx, rx) = fanout_queue(&FanoutConfig::default());
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let handle = tokio::spawn(MetricsForwarder::new(service, rx).run(shutdown_rx));
        shutdown_tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("forwarder should stop")
            .unwrap();
    }
}
