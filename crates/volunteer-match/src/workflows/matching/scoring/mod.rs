mod config;
mod policy;
mod rules;

pub use config::ScoringConfig;
pub use policy::Exclusion;

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Job, VolunteerProfile};
use policy::exclusion_for;

/// Stateless scorer; every candidate is scored independently of the others.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score one job for one volunteer. Distance is `None` unless both sides have coordinates.
    pub fn score(
        &self,
        profile: &VolunteerProfile,
        job: &Job,
        radius_miles: f64,
        now: DateTime<Utc>,
    ) -> MatchScore {
        let signals = rules::collect_signals(profile, job, now);

        if let Some(exclusion) = exclusion_for(&signals, radius_miles) {
            return MatchScore {
                score: 0.0,
                distance_miles: signals.distance_miles,
                components: Vec::new(),
                exclusion: Some(exclusion),
            };
        }

        let (components, score) = rules::score_signals(&signals, radius_miles, &self.config);
        MatchScore {
            score: score.max(0.0),
            distance_miles: signals.distance_miles,
            components,
            exclusion: None,
        }
    }

    /// Score, drop zero scores, sort, and only then truncate to `limit`.
    pub fn rank(
        &self,
        profile: &VolunteerProfile,
        candidates: Vec<Job>,
        radius_miles: f64,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Vec<RankedJob> {
        let mut ranked: Vec<RankedJob> = candidates
            .into_iter()
            .filter_map(|job| {
                let outcome = self.score(profile, &job, radius_miles, now);
                if outcome.score > 0.0 {
                    Some(RankedJob {
                        is_urgent: job.is_urgent(now),
                        urgency_hours: job.urgency_hours(now),
                        score: outcome.score,
                        distance_miles: outcome.distance_miles,
                        job,
                    })
                } else {
                    None
                }
            })
            .collect();

        ranked.sort_by(compare_ranked);
        ranked.truncate(limit);
        ranked
    }
}

/// Score descending, then urgent first, then earlier shift start.
fn compare_ranked(a: &RankedJob, b: &RankedJob) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.is_urgent.cmp(&a.is_urgent))
        .then_with(|| a.job.shift_start.cmp(&b.job.shift_start))
        .then_with(|| a.job.id.cmp(&b.job.id))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreFactor {
    Base,
    Proximity,
    SkillOverlap,
    Urgency,
}

/// Discrete contribution to a match score, kept for transparency in the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub factor: ScoreFactor,
    pub points: f64,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchScore {
    pub score: f64,
    pub distance_miles: Option<f64>,
    pub components: Vec<ScoreComponent>,
    pub exclusion: Option<Exclusion>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedJob {
    pub job: Job,
    pub score: f64,
    pub distance_miles: Option<f64>,
    pub is_urgent: bool,
    pub urgency_hours: f64,
}
