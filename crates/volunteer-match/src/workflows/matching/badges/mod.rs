//! Reliability badges derived from the completion ledger.
//!
//! Computation is a pure function of the user's `JobCompletion` snapshots and account
//! age, so it may be repeated on every read without drifting.

mod config;

pub use config::{BadgeTrackTable, TrackRule};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{JobCompletion, UserAccount, UserId};

const DAYS_PER_MONTH: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeTrack {
    Specialist,
    Firefighter,
    Anchor,
    Inclusionist,
}

impl BadgeTrack {
    pub const ALL: [BadgeTrack; 4] = [
        BadgeTrack::Specialist,
        BadgeTrack::Firefighter,
        BadgeTrack::Anchor,
        BadgeTrack::Inclusionist,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            BadgeTrack::Specialist => "specialist",
            BadgeTrack::Firefighter => "firefighter",
            BadgeTrack::Anchor => "anchor",
            BadgeTrack::Inclusionist => "inclusionist",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeLevel {
    None,
    Bronze,
    Silver,
    Gold,
}

impl BadgeLevel {
    pub const fn rank(self) -> u8 {
        match self {
            BadgeLevel::None => 0,
            BadgeLevel::Bronze => 1,
            BadgeLevel::Silver => 2,
            BadgeLevel::Gold => 3,
        }
    }

    /// Ranks above 3 saturate at gold.
    pub const fn from_rank(rank: u8) -> Self {
        match rank {
            0 => BadgeLevel::None,
            1 => BadgeLevel::Bronze,
            2 => BadgeLevel::Silver,
            _ => BadgeLevel::Gold,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            BadgeLevel::None => "None",
            BadgeLevel::Bronze => "Bronze",
            BadgeLevel::Silver => "Silver",
            BadgeLevel::Gold => "Gold",
        }
    }
}

/// Stored badge row, one per (user, track), overwritten on every recomputation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeRecord {
    pub user: UserId,
    pub track: BadgeTrack,
    pub level: BadgeLevel,
    pub progress: u32,
    pub title: String,
}

/// Caller-facing badge summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeView {
    pub track: BadgeTrack,
    pub level: u8,
    pub level_name: String,
    pub progress: u32,
    pub next_threshold: Option<u32>,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BadgeComputation {
    pub records: Vec<BadgeRecord>,
    pub views: Vec<BadgeView>,
    pub jobs_completed: u32,
    pub jobs_dropped: u32,
}

#[derive(Debug, Clone)]
pub struct BadgeEngine {
    tracks: BadgeTrackTable,
}

impl BadgeEngine {
    pub fn new(tracks: BadgeTrackTable) -> Self {
        Self { tracks }
    }

    pub fn compute(
        &self,
        account: &UserAccount,
        completions: &[JobCompletion],
        now: DateTime<Utc>,
    ) -> BadgeComputation {
        let own = completions
            .iter()
            .filter(|completion| completion.key.volunteer == account.id);

        let mut tally = Tally::default();
        for completion in own {
            if !completion.completed {
                tally.dropped += 1;
                continue;
            }
            tally.completed += 1;
            if !completion.skill_tags_snapshot.is_empty() {
                tally.specialist += 1;
            }
            if completion.was_urgent {
                tally.firefighter += 1;
            }
            if completion.had_accessibility {
                tally.inclusionist += 1;
            }
        }

        let months = months_active(account.joined_at, now);
        let mut records = Vec::with_capacity(BadgeTrack::ALL.len());
        let mut views = Vec::with_capacity(BadgeTrack::ALL.len());

        for track in BadgeTrack::ALL {
            let rule = self.tracks.rule(track);
            let progress = match track {
                BadgeTrack::Specialist => f64::from(tally.specialist),
                BadgeTrack::Firefighter => f64::from(tally.firefighter),
                BadgeTrack::Anchor => months,
                BadgeTrack::Inclusionist => f64::from(tally.inclusionist),
            };
            let level = rule.level_for(progress);
            let title = rule.title_for(level);
            let whole_progress = progress.trunc() as u32;

            views.push(BadgeView {
                track,
                level: level.rank(),
                level_name: level.name().to_string(),
                progress: whole_progress,
                next_threshold: rule.next_threshold(level),
                title: title.clone(),
                description: rule.description.clone(),
            });
            records.push(BadgeRecord {
                user: account.id,
                track,
                level,
                progress: whole_progress,
                title,
            });
        }

        BadgeComputation {
            records,
            views,
            jobs_completed: tally.completed,
            jobs_dropped: tally.dropped,
        }
    }
}

#[derive(Default)]
struct Tally {
    completed: u32,
    dropped: u32,
    specialist: u32,
    firefighter: u32,
    inclusionist: u32,
}

/// Whole days since joining divided by 30, kept fractional for threshold checks.
pub fn months_active(joined_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let days = (now - joined_at).num_days().max(0);
    days as f64 / DAYS_PER_MONTH
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::matching::domain::{JobId, PairingKey};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).single().expect("valid")
    }

    fn account(days_ago: i64) -> UserAccount {
        UserAccount {
            id: UserId(7),
            username: "rivera".to_string(),
            joined_at: now() - Duration::days(days_ago),
        }
    }

    fn completion(index: usize, urgent: bool, tags: &[&str], accessible: bool) -> JobCompletion {
        JobCompletion {
            key: PairingKey::new(UserId(7), JobId(format!("job-{index}"))),
            completed: true,
            was_urgent: urgent,
            had_accessibility: accessible,
            skill_tags_snapshot: tags.iter().map(|tag| tag.to_string()).collect(),
            recorded_at: now(),
        }
    }

    fn view(computation: &BadgeComputation, track: BadgeTrack) -> &BadgeView {
        computation
            .views
            .iter()
            .find(|view| view.track == track)
            .expect("track present")
    }

    fn engine() -> BadgeEngine {
        BadgeEngine::new(BadgeTrackTable::standard())
    }

    #[test]
    fn five_urgent_untagged_completions_reach_silver_firefighter() {
        let completions: Vec<_> = (0..5).map(|i| completion(i, true, &[], false)).collect();
        let result = engine().compute(&account(0), &completions, now());

        let firefighter = view(&result, BadgeTrack::Firefighter);
        assert_eq!(firefighter.level, 2);
        assert_eq!(firefighter.level_name, "Silver");
        assert_eq!(firefighter.next_threshold, Some(10));
        assert_eq!(view(&result, BadgeTrack::Specialist).level, 0);
        assert_eq!(result.jobs_completed, 5);
    }

    #[test]
    fn specialist_counts_only_tagged_snapshots() {
        let completions = vec![
            completion(0, false, &["Cooking"], false),
            completion(1, true, &[], false),
        ];
        let result = engine().compute(&account(0), &completions, now());
        let specialist = view(&result, BadgeTrack::Specialist);
        assert_eq!(specialist.level, 1);
        assert_eq!(specialist.progress, 1);
        assert_eq!(specialist.next_threshold, Some(5));
    }

    #[test]
    fn inclusionist_gold_carries_title() {
        let completions: Vec<_> = (0..5)
            .map(|i| completion(i, false, &[], true))
            .collect();
        let result = engine().compute(&account(0), &completions, now());
        let inclusionist = view(&result, BadgeTrack::Inclusionist);
        assert_eq!(inclusionist.level, 3);
        assert_eq!(inclusionist.title, "Accessibility Champion");
        assert_eq!(inclusionist.next_threshold, None);

        for track in [BadgeTrack::Specialist, BadgeTrack::Firefighter, BadgeTrack::Anchor] {
            assert!(view(&result, track).title.is_empty());
        }
    }

    #[test]
    fn anchor_compares_fractional_months() {
        // 89 days is 2.97 months: bronze, not yet silver.
        let result = engine().compute(&account(89), &[], now());
        let anchor = view(&result, BadgeTrack::Anchor);
        assert_eq!(anchor.level, 1);
        assert_eq!(anchor.progress, 2);
        assert_eq!(anchor.next_threshold, Some(3));

        let result = engine().compute(&account(90), &[], now());
        assert_eq!(view(&result, BadgeTrack::Anchor).level, 2);
    }

    #[test]
    fn drops_count_toward_reliability_not_tracks() {
        let mut dropped = completion(0, true, &["Driving"], true);
        dropped.completed = false;
        let result = engine().compute(&account(0), &[dropped], now());
        assert_eq!(result.jobs_dropped, 1);
        assert_eq!(result.jobs_completed, 0);
        for track in [
            BadgeTrack::Specialist,
            BadgeTrack::Firefighter,
            BadgeTrack::Inclusionist,
        ] {
            assert_eq!(view(&result, track).level, 0);
        }
    }

    #[test]
    fn recomputation_is_idempotent() {
        let completions: Vec<_> = (0..3)
            .map(|i| completion(i, i % 2 == 0, &["Sorting"], i == 1))
            .collect();
        let first = engine().compute(&account(40), &completions, now());
        let second = engine().compute(&account(40), &completions, now());
        assert_eq!(first, second);
    }

    #[test]
    fn adding_completions_never_lowers_a_level() {
        let mut completions = Vec::new();
        let mut previous: Vec<u8> = vec![0; 4];
        for i in 0..20 {
            completions.push(completion(i, i % 3 == 0, &["Cooking"], i % 2 == 0));
            let result = engine().compute(&account(10), &completions, now());
            let levels: Vec<u8> = result.views.iter().map(|view| view.level).collect();
            for (before, after) in previous.iter().zip(&levels) {
                assert!(after >= before);
            }
            previous = levels;
        }
    }

    #[test]
    fn always_reports_four_tracks_in_order() {
        let result = engine().compute(&account(0), &[], now());
        let tracks: Vec<_> = result.views.iter().map(|view| view.track).collect();
        assert_eq!(tracks, BadgeTrack::ALL.to_vec());
        assert_eq!(result.records.len(), 4);
        assert!(result.records.iter().all(|record| record.user == UserId(7)));
    }

    #[test]
    fn ignores_other_users_completions() {
        let mut foreign = completion(0, true, &["Cooking"], true);
        foreign.key.volunteer = UserId(99);
        let result = engine().compute(&account(0), &[foreign], now());
        assert_eq!(result.jobs_completed, 0);
        assert!(result.views.iter().all(|view| view.track == BadgeTrack::Anchor || view.level == 0));
    }

    #[test]
    fn custom_table_changes_thresholds() {
        let mut table = BadgeTrackTable::standard();
        table.firefighter.thresholds = [2, 3, 4];
        let engine = BadgeEngine::new(table);
        let completions = vec![completion(0, true, &[], false)];
        let result = engine.compute(&account(0), &completions, now());
        assert_eq!(view(&result, BadgeTrack::Firefighter).level, 0);
    }
}
