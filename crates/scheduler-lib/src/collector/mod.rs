//! Periodic cluster collection and metrics fan-out
//!
//! The collection loop is the single producer for the history cache. Items
//! it collects are also pushed onto a bounded queue drained by the metrics
//! forwarder.

mod fanout;
mod forwarder;
mod r#loop;

#[cfg(test)]
mod tests;

pub use fanout::{fanout_queue, FanoutConfig, FanoutReceiver, FanoutSender, SendOutcome};
pub use forwarder::MetricsForwarder;
pub use r#loop::{CollectionConfig, CollectionLoop, CollectionLoopBuilder, CollectionResults};
