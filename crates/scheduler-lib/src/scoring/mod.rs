//! Local node scoring and remote/local decision blending

mod blend;
mod engine;

pub use blend::{BlendConfig, BlendedDecision, DecisionBlender, DecisionSource, LOCAL_ONLY};
pub use engine::{ScoreBreakdown, ScoringEngine, ScoringWeights, LIFETIME_BONUS};
