//! Serialized shapes handed to callers. Coordinates only appear in views of the caller's own
//! profile or postings.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::badges::BadgeView;
use super::domain::{
    AccessibilityRequirement, Job, JobAcceptance, JobId, UserAccount, UserId, VolunteerProfile,
};
use super::scoring::RankedJob;

#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    pub id: JobId,
    pub title: String,
    pub description: String,
    pub short_description: String,
    pub poster: UserId,
    pub location_label: String,
    pub shift_start: DateTime<Utc>,
    pub shift_end: DateTime<Utc>,
    pub skill_tags: Vec<String>,
    pub accessibility_requirements: Vec<AccessibilityRequirement>,
    pub status: &'static str,
    pub is_urgent: bool,
    pub urgency_hours: f64,
}

impl JobView {
    pub fn new(job: &Job, now: DateTime<Utc>) -> Self {
        Self {
            id: job.id.clone(),
            title: job.title.clone(),
            description: job.description.clone(),
            short_description: job.short_description.clone(),
            poster: job.poster,
            location_label: job.location_label.clone(),
            shift_start: job.shift_start,
            shift_end: job.shift_end,
            skill_tags: job.skill_tags.iter().cloned().collect(),
            accessibility_requirements: job.accessibility.iter().copied().collect(),
            status: job.status.label(),
            is_urgent: job.is_urgent(now),
            urgency_hours: job.urgency_hours(now),
        }
    }
}

/// Feed entry; distance is the only geographic signal disclosed.
#[derive(Debug, Clone, Serialize)]
pub struct RankedJobView {
    #[serde(flatten)]
    pub job: JobView,
    pub score: f64,
    pub distance_miles: Option<f64>,
}

impl RankedJobView {
    pub fn new(ranked: &RankedJob, now: DateTime<Utc>) -> Self {
        Self {
            job: JobView::new(&ranked.job, now),
            score: ranked.score,
            distance_miles: ranked.distance_miles,
        }
    }
}

/// A poster's view of a job they own.
#[derive(Debug, Clone, Serialize)]
pub struct PostedJobView {
    #[serde(flatten)]
    pub job: JobView,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl PostedJobView {
    pub fn new(job: &Job, now: DateTime<Utc>) -> Self {
        Self {
            job: JobView::new(job, now),
            latitude: job.location.map(|point| point.latitude),
            longitude: job.location.map(|point| point.longitude),
            is_active: job.is_active,
            created_at: job.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AcceptanceView {
    pub job: JobView,
    pub volunteer: UserId,
    pub status: &'static str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AcceptanceView {
    pub fn new(acceptance: &JobAcceptance, job: &Job, now: DateTime<Utc>) -> Self {
        Self {
            job: JobView::new(job, now),
            volunteer: acceptance.key.volunteer,
            status: acceptance.status.label(),
            created_at: acceptance.created_at,
            updated_at: acceptance.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InterestedVolunteerView {
    pub user_id: UserId,
    pub username: String,
    pub interested_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acceptance_status: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub user_id: UserId,
    pub username: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub location_source: &'static str,
    pub location_label: String,
    pub display_location: String,
    pub location_updated_at: Option<DateTime<Utc>>,
    pub max_distance_miles: u16,
    pub skill_tags: Vec<String>,
    pub limitations: Vec<AccessibilityRequirement>,
    pub jobs_completed: u32,
    pub jobs_dropped: u32,
    pub badges: Vec<BadgeView>,
}

impl ProfileView {
    pub fn new(account: &UserAccount, profile: &VolunteerProfile, badges: Vec<BadgeView>) -> Self {
        Self {
            user_id: account.id,
            username: account.username.clone(),
            latitude: profile.location.map(|point| point.latitude),
            longitude: profile.location.map(|point| point.longitude),
            location_source: profile.location_source.label(),
            location_label: profile.location_label.clone(),
            display_location: profile.display_location(),
            location_updated_at: profile.location_updated_at,
            max_distance_miles: profile.max_distance_miles,
            skill_tags: profile.skill_tags.iter().cloned().collect(),
            limitations: profile.limitations.iter().copied().collect(),
            jobs_completed: profile.jobs_completed,
            jobs_dropped: profile.jobs_dropped,
            badges,
        }
    }
}

/// Badge listing for any user; carries no location data.
#[derive(Debug, Clone, Serialize)]
pub struct UserBadgesView {
    pub user_id: UserId,
    pub username: String,
    pub badges: Vec<BadgeView>,
}
