//! Scheduler configuration
//!
//! Loaded from an optional file (`config/scheduler.{toml,yaml,json}` or the
//! path in `AI_SCHEDULER_CONFIG`) overlaid with `AI_SCHEDULER__*`-style
//! environment variables, e.g. `AI_SCHEDULER_SERVER__PORT=9090`.

use anyhow::{Context, Result};
use chrono::Duration as ChronoDuration;
use scheduler_lib::collector::FanoutConfig;
use scheduler_lib::prediction::ClientConfig;
use scheduler_lib::scoring::{BlendConfig, ScoringWeights};
use scheduler_lib::EngineConfig;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config/scheduler";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub server: ServerConfig,
    pub metrics: MetricsConfig,
    pub history: HistoryConfig,
    pub scoring: ScoringWeights,
    pub blend: BlendConfig,
    pub prediction: PredictionConfig,
    pub placement: PlacementConfig,
    pub kubernetes: KubernetesConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub collection_interval_secs: u64,
    pub fanout_buffer: usize,
    pub fanout_send_timeout_ms: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            collection_interval_secs: 30,
            fanout_buffer: 1000,
            fanout_send_timeout_ms: 50,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub retention_hours: u64,
    pub analysis_window_hours: u64,
    pub trend_window_hours: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            retention_hours: 168,
            analysis_window_hours: 24,
            trend_window_hours: 168,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    /// Base URL of the prediction service; unset runs local-only
    pub ai_api_url: Option<String>,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    /// Forward collected metrics to `{ai_api_url}/metrics`
    pub forward_metrics: bool,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            ai_api_url: None,
            timeout_ms: 2000,
            max_retries: 2,
            initial_backoff_ms: 100,
            forward_metrics: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    pub deadline_ms: u64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self { deadline_ms: 10_000 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KubernetesConfig {
    /// `false` runs against a built-in in-memory cluster
    pub enabled: bool,
}

impl Default for KubernetesConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

impl SchedulerConfig {
    /// Load configuration from the config file and environment
    pub fn load() -> Result<Self> {
        let path = std::env::var("AI_SCHEDULER_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    pub fn load_from(path: &str) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("AI_SCHEDULER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?;

        let parsed: Self = config
            .try_deserialize()
            .context("Invalid configuration")?;
        parsed.validate()?;
        Ok(parsed)
    }

    fn validate(&self) -> Result<()> {
        if self.metrics.collection_interval_secs == 0 {
            anyhow::bail!("metrics.collection_interval_secs must be positive");
        }
        if self.history.retention_hours == 0 || self.history.analysis_window_hours == 0 {
            anyhow::bail!("history windows must be positive");
        }
        if self.placement.deadline_ms == 0 {
            anyhow::bail!("placement.deadline_ms must be positive");
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn collection_interval(&self) -> Duration {
        Duration::from_secs(self.metrics.collection_interval_secs)
    }

    pub fn retention(&self) -> ChronoDuration {
        ChronoDuration::hours(self.history.retention_hours as i64)
    }

    pub fn fanout(&self) -> FanoutConfig {
        FanoutConfig {
            capacity: self.metrics.fanout_buffer,
            send_timeout: Duration::from_millis(self.metrics.fanout_send_timeout_ms),
        }
    }

    pub fn engine(&self) -> EngineConfig {
        let per_call = self.prediction.timeout_ms * (self.prediction.max_retries as u64 + 1)
            + self.prediction.initial_backoff_ms * (1u64 << self.prediction.max_retries.min(16));
        EngineConfig {
            analysis_window: ChronoDuration::hours(self.history.analysis_window_hours as i64),
            trend_window: ChronoDuration::hours(self.history.trend_window_hours as i64),
            placement_deadline: Duration::from_millis(self.placement.deadline_ms),
            prediction_timeout: Duration::from_millis(per_call),
        }
    }

    /// Client settings, `None` when no prediction service is configured
    pub fn prediction_client(&self) -> Option<ClientConfig> {
        let endpoint = self
            .prediction
            .ai_api_url
            .as_ref()
            .filter(|url| !url.trim().is_empty())?;
        Some(ClientConfig {
            endpoint: endpoint.clone(),
            request_timeout: Duration::from_millis(self.prediction.timeout_ms),
            max_retries: self.prediction.max_retries,
            initial_backoff: Duration::from_millis(self.prediction.initial_backoff_ms),
            ..ClientConfig::default()
        })
    }
}
