use serde::{Deserialize, Serialize};

use super::{BadgeLevel, BadgeTrack};

/// Bronze, silver, and gold thresholds for one track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRule {
    pub thresholds: [u32; 3],
    pub description: String,
    /// Title carried alongside gold, if the track grants one.
    pub gold_title: Option<String>,
}

impl TrackRule {
    fn new(thresholds: [u32; 3], description: &str) -> Self {
        Self {
            thresholds,
            description: description.to_string(),
            gold_title: None,
        }
    }

    /// Highest level whose threshold is met; thresholds are checked in order.
    pub fn level_for(&self, progress: f64) -> BadgeLevel {
        let mut level = BadgeLevel::None;
        for (index, threshold) in self.thresholds.iter().enumerate() {
            if progress >= f64::from(*threshold) {
                level = BadgeLevel::from_rank(index as u8 + 1);
            } else {
                break;
            }
        }
        level
    }

    pub fn next_threshold(&self, level: BadgeLevel) -> Option<u32> {
        self.thresholds.get(level.rank() as usize).copied()
    }

    pub fn title_for(&self, level: BadgeLevel) -> String {
        match (&self.gold_title, level) {
            (Some(title), BadgeLevel::Gold) => title.clone(),
            _ => String::new(),
        }
    }
}

/// Immutable per-deployment configuration for all four tracks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeTrackTable {
    pub specialist: TrackRule,
    pub firefighter: TrackRule,
    /// Thresholds are months since the account was created.
    pub anchor: TrackRule,
    pub inclusionist: TrackRule,
}

impl BadgeTrackTable {
    pub fn standard() -> Self {
        let mut inclusionist = TrackRule::new(
            [1, 5, 5],
            "Complete jobs with accessibility requirements",
        );
        inclusionist.gold_title = Some("Accessibility Champion".to_string());

        Self {
            specialist: TrackRule::new([1, 5, 15], "Complete skill-tagged jobs"),
            firefighter: TrackRule::new([1, 5, 10], "Fill urgent jobs (under 24h)"),
            anchor: TrackRule::new([1, 3, 6], "Months of active participation"),
            inclusionist,
        }
    }

    pub fn rule(&self, track: BadgeTrack) -> &TrackRule {
        match track {
            BadgeTrack::Specialist => &self.specialist,
            BadgeTrack::Firefighter => &self.firefighter,
            BadgeTrack::Anchor => &self.anchor,
            BadgeTrack::Inclusionist => &self.inclusionist,
        }
    }
}

impl Default for BadgeTrackTable {
    fn default() -> Self {
        Self::standard()
    }
}
