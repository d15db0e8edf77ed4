use serde::{Deserialize, Serialize};

use super::super::domain::AccessibilityRequirement;
use super::rules::ScoreSignals;

/// Hard filters. An excluded job scores zero and never reaches the ranked feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Exclusion {
    AccessibilityConflict {
        requirements: Vec<AccessibilityRequirement>,
    },
    OutsideRadius {
        distance_miles: f64,
        radius_miles: f64,
    },
}

impl Exclusion {
    pub fn summary(&self) -> String {
        match self {
            Exclusion::AccessibilityConflict { requirements } => {
                let labels: Vec<&str> = requirements.iter().map(|r| r.label()).collect();
                format!("requires {} (volunteer limitation)", labels.join(", "))
            }
            Exclusion::OutsideRadius {
                distance_miles,
                radius_miles,
            } => format!(
                "{:.1} miles away, beyond the {:.0} mile radius",
                distance_miles, radius_miles
            ),
        }
    }
}

pub(crate) fn exclusion_for(signals: &ScoreSignals, radius_miles: f64) -> Option<Exclusion> {
    if !signals.conflicts.is_empty() {
        return Some(Exclusion::AccessibilityConflict {
            requirements: signals.conflicts.iter().copied().collect(),
        });
    }

    match signals.distance_miles {
        Some(distance) if distance > radius_miles => Some(Exclusion::OutsideRadius {
            distance_miles: distance,
            radius_miles,
        }),
        _ => None,
    }
}
