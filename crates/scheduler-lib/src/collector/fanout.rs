//! Bounded fan-out queue between the collector and the metrics forwarder
//!
//! Senders wait at most `send_timeout` for room; past that the item is
//! dropped and counted so the collector never stalls on a slow consumer.

use crate::models::MetricsEvent;
use crate::observability::{SchedulerMetrics, StructuredLogger};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::SendTimeoutError};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FanoutConfig {
    pub capacity: usize,
    pub send_timeout: Duration,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            send_timeout: Duration::from_millis(50),
        }
    }
}

/// Outcome of a single send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Queued,
    Dropped,
    Closed,
}

#[derive(Clone)]
pub struct FanoutSender {
    tx: mpsc::Sender<MetricsEvent>,
    send_timeout: Duration,
    dropped: Arc<AtomicU64>,
    metrics: SchedulerMetrics,
    logger: StructuredLogger,
}

pub type FanoutReceiver = mpsc::Receiver<MetricsEvent>;

/// Create a bounded queue
pub fn fanout_queue(config: &FanoutConfig) -> (FanoutSender, FanoutReceiver) {
    let (tx, rx) = mpsc::channel(config.capacity.max(1));
    let sender = FanoutSender {
        tx,
        send_timeout: config.send_timeout,
        dropped: Arc::new(AtomicU64::new(0)),
        metrics: SchedulerMetrics::new(),
        logger: StructuredLogger::new("collector"),
    };
    (sender, rx)
}

impl FanoutSender {
    pub async fn send(&self, event: MetricsEvent) -> SendOutcome {
        match self.tx.send_timeout(event, self.send_timeout).await {
            Ok(()) => SendOutcome::Queued,
            Err(SendTimeoutError::Timeout(event)) => {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                self.metrics.inc_fanout_dropped();
                self.logger.log_fanout_overflow(event.node_name(), total);
                SendOutcome::Dropped
            }
            Err(SendTimeoutError::Closed(_)) => {
                debug!("Fan-out receiver closed, discarding metrics item");
                SendOutcome::Closed
            }
        }
    }

    /// Items dropped since creation
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
