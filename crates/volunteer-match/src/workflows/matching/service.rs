use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::acceptance::{AcceptanceAction, Transition, TransitionError};
use super::badges::{BadgeComputation, BadgeEngine, BadgeTrackTable};
use super::domain::{
    AcceptanceStatus, Coordinates, Job, JobAcceptance, JobCompletion, JobDraft, JobId, JobPatch,
    JobStatus, LocationSource, LocationUpdate, MatchingInterest, PairingKey, ProfileUpdate,
    UserAccount, UserId, VolunteerProfile,
};
use super::geo::BoundingBox;
use super::repository::{
    ChatChannelPublisher, ChatChannelRequest, Geocoder, MatchingRepository, RepositoryError,
};
use super::scoring::{RankedJob, ScoringConfig, ScoringEngine};
use super::validation::{self, ValidationError};
use super::views::{InterestedVolunteerView, ProfileView, UserBadgesView};
use crate::config::MatchingSettings;

/// Immutable tuning handed to the service at construction.
#[derive(Debug, Clone)]
pub struct MatchingConfig {
    pub scoring: ScoringConfig,
    pub tracks: BadgeTrackTable,
    pub default_limit: usize,
    pub max_limit: usize,
}

impl MatchingConfig {
    pub fn standard() -> Self {
        Self::from_settings(&MatchingSettings::default())
    }

    pub fn from_settings(settings: &MatchingSettings) -> Self {
        Self {
            scoring: ScoringConfig::standard(),
            tracks: BadgeTrackTable::standard(),
            default_limit: settings.default_limit,
            max_limit: settings.max_limit,
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// Outcome of a swipe.
#[derive(Debug, Clone, PartialEq)]
pub struct InterestRecorded {
    pub job: Job,
    pub interested: bool,
    /// `true` when this swipe opened a new pending pairing.
    pub acceptance_created: bool,
}

/// Result of a completion or drop, carrying the volunteer's refreshed badges.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRecorded {
    pub job: Job,
    pub acceptance: JobAcceptance,
    pub badges: BadgeComputation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedJob {
    pub acceptance: JobAcceptance,
    pub job: Job,
}

/// Service composing the repository, scoring and badge engines, and outbound collaborators.
pub struct MatchingService<R, G, C> {
    repository: Arc<R>,
    geocoder: Arc<G>,
    chat: Arc<C>,
    scoring: Arc<ScoringEngine>,
    badges: Arc<BadgeEngine>,
    default_limit: usize,
    max_limit: usize,
}

static JOB_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_job_id() -> JobId {
    let id = JOB_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    JobId(format!("job-{id:06}"))
}

impl<R, G, C> MatchingService<R, G, C>
where
    R: MatchingRepository + 'static,
    G: Geocoder + 'static,
    C: ChatChannelPublisher + 'static,
{
    pub fn new(repository: Arc<R>, geocoder: Arc<G>, chat: Arc<C>, config: MatchingConfig) -> Self {
        Self {
            repository,
            geocoder,
            chat,
            scoring: Arc::new(ScoringEngine::new(config.scoring)),
            badges: Arc::new(BadgeEngine::new(config.tracks)),
            default_limit: config.default_limit,
            max_limit: config.max_limit,
        }
    }

    pub fn scoring(&self) -> &ScoringEngine {
        &self.scoring
    }

    /// Rank open jobs for a volunteer. Radius falls back to the profile's travel distance.
    pub fn rank_jobs(
        &self,
        user: UserId,
        radius_miles: Option<f64>,
        limit: Option<usize>,
        now: DateTime<Utc>,
    ) -> Result<Vec<RankedJob>, MatchingServiceError> {
        let profile = self.load_profile(user)?;
        let radius = validation::validate_radius(
            radius_miles.unwrap_or_else(|| f64::from(profile.max_distance_miles)),
        )?;
        let limit = limit.unwrap_or(self.default_limit).min(self.max_limit);

        let within = profile
            .location
            .map(|center| BoundingBox::around(center, radius));
        let already_interested: BTreeSet<JobId> = self
            .repository
            .interests_for_user(user)?
            .into_iter()
            .filter(|interest| interest.interested)
            .map(|interest| interest.key.job)
            .collect();

        let candidates: Vec<Job> = self
            .repository
            .open_jobs(within)?
            .into_iter()
            .filter(|job| job.poster != user && !already_interested.contains(&job.id))
            .collect();
        let pool = candidates.len();

        let ranked = self.scoring.rank(&profile, candidates, radius, limit, now);
        debug!(%user, radius, pool, returned = ranked.len(), "ranked job feed");
        Ok(ranked)
    }

    /// Record a swipe; an interested swipe opens a pending pairing if none exists yet.
    pub fn record_interest(
        &self,
        user: UserId,
        job_id: &JobId,
        interested: bool,
        now: DateTime<Utc>,
    ) -> Result<InterestRecorded, MatchingServiceError> {
        self.account(user)?;
        let job = self
            .job(job_id)?
            .filter(Job::accepts_interest)
            .ok_or_else(|| not_found("job", job_id))?;
        if job.poster == user {
            return Err(MatchingServiceError::Forbidden(
                "posters cannot volunteer for their own job".to_string(),
            ));
        }

        let key = PairingKey::new(user, job.id.clone());
        self.repository.upsert_interest(MatchingInterest {
            key: key.clone(),
            interested,
            updated_at: now,
        })?;

        let acceptance_created = if interested {
            match self
                .repository
                .insert_acceptance(JobAcceptance::pending(key, now))
            {
                Ok(_) => true,
                Err(RepositoryError::Conflict) => false,
                Err(other) => return Err(other.into()),
            }
        } else {
            false
        };

        info!(%user, job = %job.id, interested, acceptance_created, "recorded interest");
        Ok(InterestRecorded {
            job,
            interested,
            acceptance_created,
        })
    }

    /// Poster confirms a volunteer who already expressed interest.
    pub fn confirm(
        &self,
        poster: UserId,
        job_id: &JobId,
        volunteer: UserId,
        now: DateTime<Utc>,
    ) -> Result<AcceptedJob, MatchingServiceError> {
        let job = self.owned_job(poster, job_id)?;
        let key = PairingKey::new(volunteer, job.id.clone());
        let acceptance = self.advance(key, AcceptanceAction::Confirm, now)?;
        info!(job = %job.id, %volunteer, %poster, "volunteer confirmed");

        let request = ChatChannelRequest {
            job: job.id.clone(),
            volunteer,
            poster: job.poster,
        };
        if let Err(error) = self.chat.open_channel(request) {
            warn!(job = %job.id, %volunteer, %error, "chat channel not opened");
        }

        Ok(AcceptedJob { acceptance, job })
    }

    /// Move a confirmed pairing to in progress.
    pub fn start(
        &self,
        actor: UserId,
        job_id: &JobId,
        volunteer: UserId,
        now: DateTime<Utc>,
    ) -> Result<AcceptedJob, MatchingServiceError> {
        let job = self.participant_job(actor, job_id, volunteer)?;
        let acceptance = self.advance(
            PairingKey::new(volunteer, job.id.clone()),
            AcceptanceAction::Start,
            now,
        )?;
        info!(job = %job.id, %volunteer, %actor, "shift started");
        Ok(AcceptedJob { acceptance, job })
    }

    /// Complete or drop a pairing, snapshot the job, and return the volunteer's refreshed badges.
    pub fn record_completion(
        &self,
        actor: UserId,
        job_id: &JobId,
        volunteer: UserId,
        completed: bool,
        now: DateTime<Utc>,
    ) -> Result<CompletionRecorded, MatchingServiceError> {
        let mut job = self.participant_job(actor, job_id, volunteer)?;
        let account = self.account(volunteer)?;
        let action = if completed {
            AcceptanceAction::Complete
        } else {
            AcceptanceAction::Drop
        };
        let closes_job = completed && actor == job.poster;
        let key = PairingKey::new(volunteer, job.id.clone());

        let target = if completed {
            AcceptanceStatus::Completed
        } else {
            AcceptanceStatus::Dropped
        };

        // A finished pairing is revisited when the poster closes the job after the volunteer
        // already completed it, or when an earlier call failed before its snapshot was written.
        let acceptance = match self.repository.fetch_acceptance(&key)? {
            Some(existing) if existing.status.is_terminal() => {
                let snapshot_missing = self.repository.fetch_completion(&key)?.is_none();
                let revisitable = snapshot_missing || closes_job;
                if existing.status != target || !revisitable {
                    return Err(TransitionError {
                        from: existing.status,
                        action,
                    }
                    .into());
                }
                if snapshot_missing {
                    warn!(job = %job.id, %volunteer, "writing missing completion snapshot");
                    self.repository.upsert_completion(JobCompletion::snapshot(
                        &job,
                        volunteer,
                        completed,
                        existing.updated_at,
                    ))?;
                }
                existing
            }
            _ => {
                let acceptance = self.advance(key, action, now)?;
                self.repository
                    .upsert_completion(JobCompletion::snapshot(&job, volunteer, completed, now))?;
                acceptance
            }
        };

        if closes_job && job.status != JobStatus::Completed {
            job.status = JobStatus::Completed;
            self.repository.update_job(job.clone())?;
        }

        let (_, computation) = self.recompute_badges(&account, now)?;
        info!(
            job = %job.id,
            %volunteer,
            %actor,
            outcome = action.label(),
            jobs_completed = computation.jobs_completed,
            "pairing finished"
        );
        Ok(CompletionRecorded {
            job,
            acceptance,
            badges: computation,
        })
    }

    /// Volunteer withdraws before the shift starts. The pairing is deleted and the swipe reset.
    pub fn retract(
        &self,
        volunteer: UserId,
        job_id: &JobId,
        now: DateTime<Utc>,
    ) -> Result<(), MatchingServiceError> {
        let job = self.job(job_id)?.ok_or_else(|| not_found("job", job_id))?;
        let key = PairingKey::new(volunteer, job.id.clone());
        self.advance(key.clone(), AcceptanceAction::Retract, now)?;
        self.repository.upsert_interest(MatchingInterest {
            key,
            interested: false,
            updated_at: now,
        })?;
        info!(job = %job.id, %volunteer, "pairing retracted");
        Ok(())
    }

    pub fn badges_for(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<UserBadgesView, MatchingServiceError> {
        let account = self.account(user)?;
        let (_, computation) = self.recompute_badges(&account, now)?;
        Ok(UserBadgesView {
            user_id: account.id,
            username: account.username,
            badges: computation.views,
        })
    }

    pub fn profile(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<ProfileView, MatchingServiceError> {
        let account = self.account(user)?;
        self.profile_view(&account, now)
    }

    pub fn update_profile(
        &self,
        user: UserId,
        update: ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<ProfileView, MatchingServiceError> {
        let account = self.account(user)?;
        let mut profile = self.load_profile(user)?;

        if let Some(miles) = update.max_distance_miles {
            profile.max_distance_miles = validation::validate_travel_distance(miles)?;
        }
        if let Some(tags) = update.skill_tags {
            profile.skill_tags = validation::normalize_tags(tags);
        }
        if let Some(limitations) = update.limitations {
            profile.limitations = limitations.into_iter().collect();
        }

        self.repository.save_profile(profile)?;
        self.profile_view(&account, now)
    }

    /// Resolve and store the volunteer's location. A failed manual lookup changes nothing.
    pub fn update_location(
        &self,
        user: UserId,
        update: LocationUpdate,
        now: DateTime<Utc>,
    ) -> Result<ProfileView, MatchingServiceError> {
        let account = self.account(user)?;
        let mut profile = self.load_profile(user)?;
        let max_distance = update
            .max_distance_miles
            .map(validation::validate_travel_distance)
            .transpose()?;

        let (point, label) = match update.location_source {
            LocationSource::Gps => {
                let point = validation::coordinates_from(update.latitude, update.longitude)?
                    .ok_or(ValidationError::MissingCoordinates)?;
                (point, self.reverse_label(point))
            }
            LocationSource::Manual => {
                let query = update
                    .manual_location
                    .as_deref()
                    .map(str::trim)
                    .filter(|query| !query.is_empty())
                    .ok_or(ValidationError::MissingManualLocation)?;
                match self.geocoder.forward(query) {
                    Ok(Some(place)) => (place.point, place.label),
                    Ok(None) => {
                        return Err(ValidationError::LocationNotFound(query.to_string()).into())
                    }
                    Err(error) => {
                        warn!(%user, %error, "forward geocoding failed");
                        return Err(ValidationError::LocationNotFound(query.to_string()).into());
                    }
                }
            }
        };

        profile.location = Some(point);
        profile.location_source = update.location_source;
        profile.location_label = label;
        profile.location_updated_at = Some(now);
        if let Some(miles) = max_distance {
            profile.max_distance_miles = miles;
        }
        self.repository.save_profile(profile)?;
        info!(%user, source = update.location_source.label(), "location updated");
        self.profile_view(&account, now)
    }

    pub fn revoke_location(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<ProfileView, MatchingServiceError> {
        let account = self.account(user)?;
        let mut profile = self.load_profile(user)?;
        profile.location = None;
        profile.location_label.clear();
        profile.location_source = LocationSource::Manual;
        profile.location_updated_at = Some(now);
        self.repository.save_profile(profile)?;
        info!(%user, "location revoked");
        self.profile_view(&account, now)
    }

    pub fn create_job(
        &self,
        poster: UserId,
        draft: JobDraft,
        now: DateTime<Utc>,
    ) -> Result<Job, MatchingServiceError> {
        self.account(poster)?;
        let mut job = validation::job_from_draft(next_job_id(), poster, draft, now)?;
        if let (Some(point), true) = (job.location, job.location_label.is_empty()) {
            job.location_label = self.reverse_label(point);
        }

        let stored = self.repository.insert_job(job)?;
        info!(job = %stored.id, %poster, urgent = stored.is_urgent(now), "job posted");
        Ok(stored)
    }

    pub fn update_job(
        &self,
        poster: UserId,
        job_id: &JobId,
        patch: JobPatch,
    ) -> Result<Job, MatchingServiceError> {
        let job = self.owned_job(poster, job_id)?;
        let label_supplied = patch.location_label.is_some();
        let mut updated = validation::apply_patch(&job, patch)?;
        if let (Some(point), false) = (updated.location, label_supplied) {
            if updated.location != job.location {
                updated.location_label = self.reverse_label(point);
            }
        }

        self.repository.update_job(updated.clone())?;
        info!(job = %updated.id, %poster, status = updated.status.label(), "job updated");
        Ok(updated)
    }

    /// Soft delete; historical pairings and snapshots stay intact.
    pub fn delete_job(&self, poster: UserId, job_id: &JobId) -> Result<(), MatchingServiceError> {
        let mut job = self.owned_job(poster, job_id)?;
        job.is_active = false;
        self.repository.update_job(job)?;
        info!(job = %job_id, %poster, "job deleted");
        Ok(())
    }

    pub fn posted_jobs(&self, poster: UserId) -> Result<Vec<Job>, MatchingServiceError> {
        let mut jobs: Vec<Job> = self
            .repository
            .jobs_posted_by(poster)?
            .into_iter()
            .filter(|job| job.is_active)
            .collect();
        jobs.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(jobs)
    }

    pub fn accepted_jobs(&self, volunteer: UserId) -> Result<Vec<AcceptedJob>, MatchingServiceError> {
        let mut accepted = Vec::new();
        for acceptance in self.repository.acceptances_for_user(volunteer)? {
            if let Some(job) = self.job(&acceptance.key.job)? {
                accepted.push(AcceptedJob { acceptance, job });
            }
        }
        accepted.sort_by(|a, b| {
            b.acceptance
                .created_at
                .cmp(&a.acceptance.created_at)
                .then_with(|| a.job.id.cmp(&b.job.id))
        });
        Ok(accepted)
    }

    pub fn interested_jobs(&self, volunteer: UserId) -> Result<Vec<Job>, MatchingServiceError> {
        let mut interests: Vec<MatchingInterest> = self
            .repository
            .interests_for_user(volunteer)?
            .into_iter()
            .filter(|interest| interest.interested)
            .collect();
        interests.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        let mut jobs = Vec::with_capacity(interests.len());
        for interest in interests {
            if let Some(job) = self.job(&interest.key.job)?.filter(|job| job.is_active) {
                jobs.push(job);
            }
        }
        Ok(jobs)
    }

    /// Volunteers currently interested in a job, earliest swipe first.
    pub fn interested_volunteers(
        &self,
        poster: UserId,
        job_id: &JobId,
    ) -> Result<Vec<InterestedVolunteerView>, MatchingServiceError> {
        let job = self.owned_job(poster, job_id)?;
        let mut interests: Vec<MatchingInterest> = self
            .repository
            .interests_for_job(&job.id)?
            .into_iter()
            .filter(|interest| interest.interested)
            .collect();
        interests.sort_by(|a, b| a.updated_at.cmp(&b.updated_at));

        let mut volunteers = Vec::with_capacity(interests.len());
        for interest in interests {
            let Some(account) = self.repository.fetch_user(interest.key.volunteer)? else {
                continue;
            };
            let acceptance_status = self
                .repository
                .fetch_acceptance(&interest.key)?
                .map(|acceptance| acceptance.status.label());
            volunteers.push(InterestedVolunteerView {
                user_id: account.id,
                username: account.username,
                interested_at: interest.updated_at,
                acceptance_status,
            });
        }
        Ok(volunteers)
    }

    /// Apply one state-machine action with compare-and-swap on the observed record.
    fn advance(
        &self,
        key: PairingKey,
        action: AcceptanceAction,
        now: DateTime<Utc>,
    ) -> Result<JobAcceptance, MatchingServiceError> {
        let current = self
            .repository
            .fetch_acceptance(&key)?
            .ok_or_else(|| MatchingServiceError::NotFound {
                entity: "acceptance",
                id: format!("{} for volunteer {}", key.job, key.volunteer),
            })?;

        match current.status.apply(action)? {
            Transition::Moved(status) => {
                let updated = JobAcceptance {
                    status,
                    updated_at: now,
                    ..current.clone()
                };
                Ok(self
                    .repository
                    .compare_and_set_acceptance(&current, updated)?)
            }
            Transition::Removed => {
                self.repository.remove_acceptance(&current)?;
                Ok(current)
            }
        }
    }

    /// Recount the ledger, overwrite badge rows, and refresh the profile counters.
    fn recompute_badges(
        &self,
        account: &UserAccount,
        now: DateTime<Utc>,
    ) -> Result<(VolunteerProfile, BadgeComputation), MatchingServiceError> {
        let completions = self.repository.completions_for_user(account.id)?;
        let computation = self.badges.compute(account, &completions, now);
        self.repository
            .save_badges(account.id, computation.records.clone())?;

        let mut profile = self.load_profile(account.id)?;
        if profile.jobs_completed != computation.jobs_completed
            || profile.jobs_dropped != computation.jobs_dropped
        {
            profile = self.repository.update_profile_counters(
                account.id,
                computation.jobs_completed,
                computation.jobs_dropped,
            )?;
        }
        Ok((profile, computation))
    }

    fn profile_view(
        &self,
        account: &UserAccount,
        now: DateTime<Utc>,
    ) -> Result<ProfileView, MatchingServiceError> {
        let (profile, computation) = self.recompute_badges(account, now)?;
        Ok(ProfileView::new(account, &profile, computation.views))
    }

    fn account(&self, user: UserId) -> Result<UserAccount, MatchingServiceError> {
        self.repository
            .fetch_user(user)?
            .ok_or_else(|| not_found("user", user))
    }

    /// Profiles are created on first access.
    fn load_profile(&self, user: UserId) -> Result<VolunteerProfile, MatchingServiceError> {
        if let Some(profile) = self.repository.fetch_profile(user)? {
            return Ok(profile);
        }
        self.account(user)?;
        let profile = self.repository.ensure_profile(VolunteerProfile::new(user))?;
        debug!(%user, "created volunteer profile");
        Ok(profile)
    }

    fn job(&self, job_id: &JobId) -> Result<Option<Job>, MatchingServiceError> {
        Ok(self.repository.fetch_job(job_id)?)
    }

    /// Active job that `poster` owns.
    fn owned_job(&self, poster: UserId, job_id: &JobId) -> Result<Job, MatchingServiceError> {
        let job = self
            .job(job_id)?
            .filter(|job| job.is_active)
            .ok_or_else(|| not_found("job", job_id))?;
        if job.poster != poster {
            return Err(MatchingServiceError::Forbidden(
                "only the job's poster may do this".to_string(),
            ));
        }
        Ok(job)
    }

    /// Job where `actor` is either the poster or the volunteer of the pairing.
    fn participant_job(
        &self,
        actor: UserId,
        job_id: &JobId,
        volunteer: UserId,
    ) -> Result<Job, MatchingServiceError> {
        let job = self.job(job_id)?.ok_or_else(|| not_found("job", job_id))?;
        if actor != job.poster && actor != volunteer {
            return Err(MatchingServiceError::Forbidden(
                "only the poster or the assigned volunteer may update this pairing".to_string(),
            ));
        }
        Ok(job)
    }

    /// Empty label when the lookup fails or finds nothing.
    fn reverse_label(&self, point: Coordinates) -> String {
        match self.geocoder.reverse(point) {
            Ok(Some(label)) => label.trim().to_string(),
            Ok(None) => String::new(),
            Err(error) => {
                warn!(%error, "reverse geocoding failed; leaving label empty");
                String::new()
            }
        }
    }
}

fn not_found(entity: &'static str, id: impl std::fmt::Display) -> MatchingServiceError {
    MatchingServiceError::NotFound {
        entity,
        id: id.to_string(),
    }
}

/// Error raised by the matching service.
#[derive(Debug, thiserror::Error)]
pub enum MatchingServiceError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error(transparent)]
    InvalidState(#[from] TransitionError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
