//! Pod history storage and node stability analysis

mod analyzer;
mod cache;

pub use analyzer::{
    NodeAnalyzer, HIGH_FAILURE_RATE, HIGH_RESTART_COUNT, LOW_STABILITY, RECOMMEND_HIGH_FAILURE,
    RECOMMEND_HIGH_RESTARTS, RECOMMEND_LOW_STABILITY,
};
pub use cache::{CacheStats, HistoryCache, DEFAULT_RETENTION_HOURS};

use crate::error::{Result, SchedulerError};
use chrono::Duration;

/// Parse a human-readable window such as `24h` or `7d`
pub fn parse_window(raw: &str) -> Result<Duration> {
    let std = humantime::parse_duration(raw.trim())
        .map_err(|e| SchedulerError::InvalidWindow(format!("{raw}: {e}")))?;
    let window = Duration::from_std(std)
        .map_err(|_| SchedulerError::InvalidWindow(format!("{raw}: out of range")))?;
    validate_window(window)
}

/// Reject zero and negative windows
pub fn validate_window(window: Duration) -> Result<Duration> {
    if window <= Duration::zero() {
        return Err(SchedulerError::InvalidWindow(format!(
            "{}s is not positive",
            window.num_seconds()
        )));
    }
    Ok(window)
}
