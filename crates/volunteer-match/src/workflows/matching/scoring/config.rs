use serde::{Deserialize, Serialize};

/// Weights for the composite match score. Every included job earns `base_score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub base_score: f64,
    /// Awarded in full at zero distance, falling linearly to nothing at the radius edge.
    pub proximity_weight: f64,
    /// Per skill tag shared between volunteer and job.
    pub skill_match_weight: f64,
    pub urgency_bonus: f64,
}

impl ScoringConfig {
    pub fn standard() -> Self {
        Self {
            base_score: 10.0,
            proximity_weight: 40.0,
            skill_match_weight: 15.0,
            urgency_bonus: 25.0,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self::standard()
    }
}
