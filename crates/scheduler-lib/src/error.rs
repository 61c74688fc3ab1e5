//! Error types for the scheduler engine

use thiserror::Error;

/// Errors surfaced to callers of the engine API
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A pod or node the request depends on does not exist
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    /// The cluster-state provider failed to answer
    #[error("cluster state unavailable: {0}")]
    ClusterState(String),

    /// The placement request ran past its deadline
    #[error("placement deadline exceeded")]
    DeadlineExceeded,

    /// An analysis window that is zero, negative or unparsable
    #[error("invalid analysis window: {0}")]
    InvalidWindow(String),
}

impl SchedulerError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        SchedulerError::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SchedulerError::NotFound { .. })
    }
}

impl From<anyhow::Error> for SchedulerError {
    fn from(err: anyhow::Error) -> Self {
        SchedulerError::ClusterState(format!("{:#}", err))
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Errors from the remote prediction service
///
/// None of these are fatal to a placement: the blender falls back to the
/// local score.
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("prediction service unreachable: {0}")]
    Transport(String),

    #[error("prediction service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("prediction request timed out")]
    Timeout,

    #[error("invalid prediction response: {0}")]
    Decode(String),
}

impl PredictionError {
    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            PredictionError::Transport(_) | PredictionError::Timeout => true,
            PredictionError::Status { status, .. } => *status >= 500 || *status == 429,
            PredictionError::Decode(_) => false,
        }
    }
}

impl From<reqwest::Error> for PredictionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PredictionError::Timeout
        } else if err.is_decode() {
            PredictionError::Decode(err.to_string())
        } else {
            PredictionError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = SchedulerError::not_found("pod", "default/web-0");
        assert_eq!(err.to_string(), "pod not found: default/web-0");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(PredictionError::Timeout.is_retryable());
        assert!(PredictionError::Transport("refused".into()).is_retryable());
        assert!(PredictionError::Status {
            status: 503,
            body: String::new()
        }
        .is_retryable());
        assert!(!PredictionError::Status {
            status: 400,
            body: String::new()
        }
        .is_retryable());
        assert!(!PredictionError::Decode("bad json".into()).is_retryable());
    }
}
