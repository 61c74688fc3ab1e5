//! Scheduler library for history-aware node placement
//!
//! This crate provides the core functionality for:
//! - Per-node pod history with retention and windowed stability analysis
//! - Deterministic local node scoring
//! - Blending with an optional remote prediction service
//! - Periodic cluster collection and metrics fan-out
//! - Health checks and observability

pub mod cluster;
pub mod collector;
pub mod engine;
pub mod error;
pub mod health;
pub mod history;
pub mod models;
pub mod observability;
pub mod prediction;
pub mod scoring;

pub use engine::{select_best, EngineConfig, SchedulerEngine};
pub use error::{PredictionError, Result, SchedulerError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use history::{parse_window, CacheStats, HistoryCache, NodeAnalyzer};
pub use models::*;
pub use observability::{SchedulerMetrics, StructuredLogger};
