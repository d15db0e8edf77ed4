use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use super::super::domain::{AccessibilityRequirement, Job, VolunteerProfile};
use super::super::geo::distance_miles;
use super::config::ScoringConfig;
use super::{ScoreComponent, ScoreFactor};

pub(crate) struct ScoreSignals {
    pub distance_miles: Option<f64>,
    pub shared_skills: Vec<String>,
    pub is_urgent: bool,
    pub conflicts: BTreeSet<AccessibilityRequirement>,
}

pub(crate) fn collect_signals(
    profile: &VolunteerProfile,
    job: &Job,
    now: DateTime<Utc>,
) -> ScoreSignals {
    let distance_miles = match (profile.location, job.location) {
        (Some(volunteer), Some(site)) => Some(distance_miles(volunteer, site)),
        _ => None,
    };

    let job_tags: BTreeSet<String> = job
        .skill_tags
        .iter()
        .map(|tag| tag.to_lowercase())
        .collect();
    let mut counted = BTreeSet::new();
    let shared_skills = profile
        .skill_tags
        .iter()
        .filter(|tag| {
            let folded = tag.to_lowercase();
            job_tags.contains(&folded) && counted.insert(folded)
        })
        .cloned()
        .collect();

    let conflicts = job
        .accessibility
        .intersection(&profile.limitations)
        .copied()
        .collect();

    ScoreSignals {
        distance_miles,
        shared_skills,
        is_urgent: job.is_urgent(now),
        conflicts,
    }
}

pub(crate) fn score_signals(
    signals: &ScoreSignals,
    radius_miles: f64,
    config: &ScoringConfig,
) -> (Vec<ScoreComponent>, f64) {
    let mut components = vec![ScoreComponent {
        factor: ScoreFactor::Base,
        points: config.base_score,
        notes: "eligible open job".to_string(),
    }];

    if let Some(distance) = signals.distance_miles {
        let closeness = (1.0 - distance / radius_miles).clamp(0.0, 1.0);
        components.push(ScoreComponent {
            factor: ScoreFactor::Proximity,
            points: config.proximity_weight * closeness,
            notes: format!("{distance:.1} of {radius_miles:.0} miles"),
        });
    }

    if !signals.shared_skills.is_empty() {
        components.push(ScoreComponent {
            factor: ScoreFactor::SkillOverlap,
            points: config.skill_match_weight * signals.shared_skills.len() as f64,
            notes: format!("shared skills: {}", signals.shared_skills.join(", ")),
        });
    }

    if signals.is_urgent {
        components.push(ScoreComponent {
            factor: ScoreFactor::Urgency,
            points: config.urgency_bonus,
            notes: "shift starts within 24 hours".to_string(),
        });
    }

    let total = components.iter().map(|component| component.points).sum();
    (components, total)
}
