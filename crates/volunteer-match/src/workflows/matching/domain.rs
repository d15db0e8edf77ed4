use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Jobs starting within this many hours are surfaced as urgent.
pub const URGENT_WINDOW_HOURS: f64 = 24.0;

pub const DEFAULT_MAX_DISTANCE_MILES: u16 = 25;
pub const MIN_TRAVEL_DISTANCE_MILES: u16 = 1;
pub const MAX_TRAVEL_DISTANCE_MILES: u16 = 100;

/// Identity issued by the authentication collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier wrapper for posted jobs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A resolved point on the map. Never exposed to parties other than its owner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Account facts owned by the authentication collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub username: String,
    pub joined_at: DateTime<Utc>,
}

/// How the volunteer supplied their location.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    Gps,
    #[default]
    Manual,
}

impl LocationSource {
    pub const fn label(self) -> &'static str {
        match self {
            LocationSource::Gps => "gps",
            LocationSource::Manual => "manual",
        }
    }
}

/// Closed set of physical demands a job may carry and a volunteer may decline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessibilityRequirement {
    HeavyLifting,
    StandingLong,
    DrivingRequired,
    OutdoorWork,
}

impl AccessibilityRequirement {
    pub const ALL: [AccessibilityRequirement; 4] = [
        AccessibilityRequirement::HeavyLifting,
        AccessibilityRequirement::StandingLong,
        AccessibilityRequirement::DrivingRequired,
        AccessibilityRequirement::OutdoorWork,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            AccessibilityRequirement::HeavyLifting => "heavy_lifting",
            AccessibilityRequirement::StandingLong => "standing_long",
            AccessibilityRequirement::DrivingRequired => "driving_required",
            AccessibilityRequirement::OutdoorWork => "outdoor_work",
        }
    }
}

/// Checkbox map submitted by posters; only the `true` flags survive as requirements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessibilityFlags {
    pub heavy_lifting: bool,
    pub standing_long: bool,
    pub driving_required: bool,
    pub outdoor_work: bool,
}

impl AccessibilityFlags {
    pub fn is_set(&self, requirement: AccessibilityRequirement) -> bool {
        match requirement {
            AccessibilityRequirement::HeavyLifting => self.heavy_lifting,
            AccessibilityRequirement::StandingLong => self.standing_long,
            AccessibilityRequirement::DrivingRequired => self.driving_required,
            AccessibilityRequirement::OutdoorWork => self.outdoor_work,
        }
    }

    pub fn requirements(&self) -> BTreeSet<AccessibilityRequirement> {
        AccessibilityRequirement::ALL
            .into_iter()
            .filter(|requirement| self.is_set(*requirement))
            .collect()
    }
}

/// One profile per identity, created lazily on first access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolunteerProfile {
    pub user: UserId,
    pub location: Option<Coordinates>,
    pub location_source: LocationSource,
    pub location_label: String,
    pub location_updated_at: Option<DateTime<Utc>>,
    pub max_distance_miles: u16,
    pub skill_tags: BTreeSet<String>,
    pub limitations: BTreeSet<AccessibilityRequirement>,
    pub jobs_completed: u32,
    pub jobs_dropped: u32,
}

impl VolunteerProfile {
    pub fn new(user: UserId) -> Self {
        Self {
            user,
            location: None,
            location_source: LocationSource::default(),
            location_label: String::new(),
            location_updated_at: None,
            max_distance_miles: DEFAULT_MAX_DISTANCE_MILES,
            skill_tags: BTreeSet::new(),
            limitations: BTreeSet::new(),
            jobs_completed: 0,
            jobs_dropped: 0,
        }
    }

    /// Privacy-safe string shown in place of raw coordinates.
    pub fn display_location(&self) -> String {
        if !self.location_label.is_empty() {
            self.location_label.clone()
        } else if self.location.is_some() {
            "Location shared".to_string()
        } else {
            "Location not set".to_string()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Open,
    Filled,
    Completed,
    Cancelled,
}

impl JobStatus {
    pub const fn label(self) -> &'static str {
        match self {
            JobStatus::Open => "open",
            JobStatus::Filled => "filled",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub title: String,
    pub description: String,
    pub short_description: String,
    pub poster: UserId,
    pub location: Option<Coordinates>,
    pub location_label: String,
    pub shift_start: DateTime<Utc>,
    pub shift_end: DateTime<Utc>,
    pub skill_tags: BTreeSet<String>,
    pub accessibility: BTreeSet<AccessibilityRequirement>,
    pub status: JobStatus,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Hours until the shift starts, floored at zero once it has begun.
    pub fn urgency_hours(&self, now: DateTime<Utc>) -> f64 {
        let seconds = (self.shift_start - now).num_seconds() as f64;
        (seconds / 3600.0).max(0.0)
    }

    pub fn is_urgent(&self, now: DateTime<Utc>) -> bool {
        self.urgency_hours(now) <= URGENT_WINDOW_HOURS
    }

    pub fn has_accessibility_requirements(&self) -> bool {
        !self.accessibility.is_empty()
    }

    pub fn accepts_interest(&self) -> bool {
        self.is_active && self.status == JobStatus::Open
    }
}

/// Unique (volunteer, job) key shared by interests, acceptances, and completions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairingKey {
    pub volunteer: UserId,
    pub job: JobId,
}

impl PairingKey {
    pub fn new(volunteer: UserId, job: JobId) -> Self {
        Self { volunteer, job }
    }
}

/// Last swipe recorded for a pairing; later swipes overwrite it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingInterest {
    pub key: PairingKey,
    pub interested: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptanceStatus {
    Pending,
    /// Legacy spelling of `Pending` still present in older records.
    Accepted,
    Confirmed,
    InProgress,
    Completed,
    Dropped,
}

impl AcceptanceStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AcceptanceStatus::Pending => "pending",
            AcceptanceStatus::Accepted => "accepted",
            AcceptanceStatus::Confirmed => "confirmed",
            AcceptanceStatus::InProgress => "in_progress",
            AcceptanceStatus::Completed => "completed",
            AcceptanceStatus::Dropped => "dropped",
        }
    }
}

impl fmt::Display for AcceptanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobAcceptance {
    pub key: PairingKey,
    pub status: AcceptanceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Assigned by the repository on every write; never reused for the same pair.
    #[serde(default)]
    pub revision: u64,
}

impl JobAcceptance {
    pub fn pending(key: PairingKey, now: DateTime<Utc>) -> Self {
        Self {
            key,
            status: AcceptanceStatus::Pending,
            created_at: now,
            updated_at: now,
            revision: 0,
        }
    }
}

/// Immutable copy of the job attributes that badge tracks count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCompletion {
    pub key: PairingKey,
    /// `false` records a drop.
    pub completed: bool,
    pub was_urgent: bool,
    pub had_accessibility: bool,
    pub skill_tags_snapshot: BTreeSet<String>,
    pub recorded_at: DateTime<Utc>,
}

impl JobCompletion {
    pub fn snapshot(job: &Job, volunteer: UserId, completed: bool, now: DateTime<Utc>) -> Self {
        Self {
            key: PairingKey::new(volunteer, job.id.clone()),
            completed,
            was_urgent: job.is_urgent(now),
            had_accessibility: job.has_accessibility_requirements(),
            skill_tags_snapshot: job.skill_tags.clone(),
            recorded_at: now,
        }
    }
}

/// Poster-supplied payload for a new job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDraft {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub location_label: Option<String>,
    pub shift_start: DateTime<Utc>,
    pub shift_end: DateTime<Utc>,
    #[serde(default)]
    pub skill_tags: Vec<String>,
    #[serde(default)]
    pub accessibility_flags: AccessibilityFlags,
}

/// Partial edit of a posted job; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub location_label: Option<String>,
    pub shift_start: Option<DateTime<Utc>>,
    pub shift_end: Option<DateTime<Utc>>,
    pub skill_tags: Option<Vec<String>>,
    pub accessibility_flags: Option<AccessibilityFlags>,
    pub status: Option<JobStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileUpdate {
    pub skill_tags: Option<Vec<String>>,
    pub limitations: Option<Vec<AccessibilityRequirement>>,
    pub max_distance_miles: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationUpdate {
    pub location_source: LocationSource,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub manual_location: Option<String>,
    #[serde(default)]
    pub max_distance_miles: Option<u16>,
}
