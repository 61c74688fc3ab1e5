//! Confidence-weighted blending of remote and local scores

use crate::prediction::PredictionResponse;
use serde::{Deserialize, Serialize};

/// Reason reported when no usable remote prediction exists
pub const LOCAL_ONLY: &str = "local-only";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendConfig {
    pub remote_weight: f64,
    pub local_weight: f64,
    /// Confidence assumed when the remote result omits one
    pub default_confidence: f64,
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            remote_weight: 0.7,
            local_weight: 0.3,
            default_confidence: 0.5,
        }
    }
}

/// Where the final score came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    LocalOnly,
    Blended,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlendedDecision {
    pub score: f64,
    pub reason: String,
    pub source: DecisionSource,
}

#[derive(Debug, Clone, Default)]
pub struct DecisionBlender {
    config: BlendConfig,
}

impl DecisionBlender {
    pub fn new(config: BlendConfig) -> Self {
        Self { config }
    }

    /// Combine a local score with an optional remote prediction.
    ///
    /// A missing remote result, or one without a finite numeric score, keeps
    /// the local score unchanged.
    pub fn finalize(&self, local: f64, remote: Option<&PredictionResponse>) -> BlendedDecision {
        let Some(remote_score) = remote.and_then(|r| r.score).filter(|s| s.is_finite()) else {
            return BlendedDecision {
                score: local,
                reason: LOCAL_ONLY.to_string(),
                source: DecisionSource::LocalOnly,
            };
        };

        let confidence = remote
            .and_then(|r| r.confidence)
            .filter(|c| c.is_finite())
            .unwrap_or(self.config.default_confidence);

        let score = remote_score * confidence * self.config.remote_weight
            + local * self.config.local_weight;

        BlendedDecision {
            score,
            reason: format!(
                "final score: {:.2} (remote: {:.2}, local: {:.2}, confidence: {:.2})",
                score, remote_score, local, confidence
            ),
            source: DecisionSource::Blended,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(score: Option<f64>, confidence: Option<f64>) -> PredictionResponse {
        PredictionResponse { score, confidence }
    }

    #[test]
    fn test_no_remote_is_local_only() {
        let blender = DecisionBlender::default();
        let decision = blender.finalize(72.5, None);
        assert_eq!(decision.score, 72.5);
        assert_eq!(decision.reason, LOCAL_ONLY);
        assert_eq!(decision.source, DecisionSource::LocalOnly);
    }

    #[test]
    fn test_remote_without_score_is_local_only() {
        let blender = DecisionBlender::default();
        let decision = blender.finalize(40.0, Some(&remote(None, Some(0.9))));
        assert_eq!(decision.score, 40.0);
        assert_eq!(decision.reason, LOCAL_ONLY);

        let nan = blender.finalize(40.0, Some(&remote(Some(f64::NAN), None)));
        assert_eq!(nan.source, DecisionSource::LocalOnly);
    }

    #[test]
    fn test_full_confidence_blend() {
        let blender = DecisionBlender::default();
        let decision = blender.finalize(50.0, Some(&remote(Some(100.0), Some(1.0))));
        assert!((decision.score - (100.0 * 0.7 + 50.0 * 0.3)).abs() < 1e-9);
        assert_eq!(decision.source, DecisionSource::Blended);
        assert_eq!(
            decision.reason,
            "final score: 85.00 (remote: 100.00, local: 50.00, confidence: 1.00)"
        );
    }

    #[test]
    fn test_missing_confidence_uses_default() {
        let blender = DecisionBlender::default();
        let decision = blender.finalize(10.0, Some(&remote(Some(80.0), None)));
        // 80 * 0.5 * 0.7 + 10 * 0.3
        assert!((decision.score - 31.0).abs() < 1e-9);
        assert!(decision.reason.ends_with("confidence: 0.50)"));
    }

    #[test]
    fn test_custom_ratio() {
        let blender = DecisionBlender::new(BlendConfig {
            remote_weight: 0.5,
            local_weight: 0.5,
            default_confidence: 1.0,
        });
        let decision = blender.finalize(20.0, Some(&remote(Some(60.0), None)));
        assert!((decision.score - 40.0).abs() < 1e-9);
    }
}
