use serde::{Deserialize, Serialize};

use super::badges::BadgeRecord;
use super::domain::{
    AcceptanceStatus, Coordinates, Job, JobAcceptance, JobCompletion, JobId, MatchingInterest,
    PairingKey, UserAccount, UserId, VolunteerProfile,
};
use super::geo::BoundingBox;

/// Storage abstraction for the matching entities.
///
/// Implementations enforce uniqueness on (volunteer, job) for interests, acceptances, and
/// completions, and apply acceptance mutations as compare-and-swap on the stored status and revision.
pub trait MatchingRepository: Send + Sync {
    fn fetch_user(&self, id: UserId) -> Result<Option<UserAccount>, RepositoryError>;

    fn fetch_profile(&self, user: UserId) -> Result<Option<VolunteerProfile>, RepositoryError>;
    /// Insert `profile` unless the user already has one; returns the stored row either way.
    fn ensure_profile(&self, profile: VolunteerProfile)
        -> Result<VolunteerProfile, RepositoryError>;
    /// Write the user-editable fields. Completion counters on an existing row are kept.
    fn save_profile(&self, profile: VolunteerProfile) -> Result<(), RepositoryError>;
    /// Overwrite only the completion counters, leaving location and preferences untouched.
    fn update_profile_counters(
        &self,
        user: UserId,
        jobs_completed: u32,
        jobs_dropped: u32,
    ) -> Result<VolunteerProfile, RepositoryError>;

    fn insert_job(&self, job: Job) -> Result<Job, RepositoryError>;
    fn update_job(&self, job: Job) -> Result<(), RepositoryError>;
    fn fetch_job(&self, id: &JobId) -> Result<Option<Job>, RepositoryError>;
    /// Open, active jobs. With a box, only located jobs inside it are returned.
    fn open_jobs(&self, within: Option<BoundingBox>) -> Result<Vec<Job>, RepositoryError>;
    fn jobs_posted_by(&self, poster: UserId) -> Result<Vec<Job>, RepositoryError>;

    /// Last write wins; returns `true` when no row existed for the pair.
    fn upsert_interest(&self, interest: MatchingInterest) -> Result<bool, RepositoryError>;
    fn fetch_interest(&self, key: &PairingKey) -> Result<Option<MatchingInterest>, RepositoryError>;
    fn interests_for_job(&self, job: &JobId) -> Result<Vec<MatchingInterest>, RepositoryError>;
    fn interests_for_user(&self, user: UserId) -> Result<Vec<MatchingInterest>, RepositoryError>;

    /// Fails with [`RepositoryError::Conflict`] when the pair already has a record.
    /// The stored record is stamped with a fresh revision.
    fn insert_acceptance(&self, acceptance: JobAcceptance)
        -> Result<JobAcceptance, RepositoryError>;
    fn fetch_acceptance(&self, key: &PairingKey)
        -> Result<Option<JobAcceptance>, RepositoryError>;
    /// Replace the record only if the stored row still has the `observed` status and
    /// revision. Returns the record as stored, with a fresh revision.
    fn compare_and_set_acceptance(
        &self,
        observed: &JobAcceptance,
        record: JobAcceptance,
    ) -> Result<JobAcceptance, RepositoryError>;
    /// Delete the record only if the stored row still has the `observed` status and revision.
    fn remove_acceptance(&self, observed: &JobAcceptance) -> Result<(), RepositoryError>;
    fn acceptances_for_user(&self, user: UserId) -> Result<Vec<JobAcceptance>, RepositoryError>;

    /// One snapshot per pair; a later completion or drop overwrites the earlier one.
    fn upsert_completion(&self, completion: JobCompletion) -> Result<(), RepositoryError>;
    fn fetch_completion(&self, key: &PairingKey)
        -> Result<Option<JobCompletion>, RepositoryError>;
    fn completions_for_user(&self, user: UserId) -> Result<Vec<JobCompletion>, RepositoryError>;

    /// Overwrite every badge row of the user.
    fn save_badges(&self, user: UserId, badges: Vec<BadgeRecord>) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("acceptance is no longer {expected}; reload and retry")]
    StaleState {
        expected: AcceptanceStatus,
        found: Option<AcceptanceStatus>,
    },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Best-effort address lookups. `Ok(None)` means the lookup ran and found nothing.
pub trait Geocoder: Send + Sync {
    fn reverse(&self, point: Coordinates) -> Result<Option<String>, GeocodeError>;
    fn forward(&self, query: &str) -> Result<Option<ResolvedPlace>, GeocodeError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPlace {
    pub point: Coordinates,
    pub label: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("geocoder unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook asking the messaging adapter to open a poster/volunteer channel.
pub trait ChatChannelPublisher: Send + Sync {
    fn open_channel(&self, request: ChatChannelRequest) -> Result<(), ChatError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatChannelRequest {
    pub job: JobId,
    pub volunteer: UserId,
    pub poster: UserId,
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("chat transport unavailable: {0}")]
    Transport(String),
}
