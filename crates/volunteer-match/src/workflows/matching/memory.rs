use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::badges::{BadgeRecord, BadgeTrack};
use super::domain::{
    Job, JobAcceptance, JobCompletion, JobId, JobStatus, MatchingInterest, PairingKey,
    UserAccount, UserId, VolunteerProfile,
};
use super::geo::BoundingBox;
use super::repository::{MatchingRepository, RepositoryError};

/// Process-local store used by the demo service and tests.
///
/// A single lock covers every table, so each trait call (including the acceptance
/// compare-and-swap and the profile counter refresh) is atomic with respect to the others.
#[derive(Default)]
pub struct InMemoryMatchingStore {
    state: Mutex<StoreState>,
}

#[derive(Default)]
struct StoreState {
    users: BTreeMap<UserId, UserAccount>,
    profiles: BTreeMap<UserId, VolunteerProfile>,
    jobs: BTreeMap<JobId, Job>,
    interests: BTreeMap<PairingKey, MatchingInterest>,
    acceptances: BTreeMap<PairingKey, JobAcceptance>,
    completions: BTreeMap<PairingKey, JobCompletion>,
    badges: BTreeMap<(UserId, BadgeTrack), BadgeRecord>,
    last_revision: u64,
}

impl StoreState {
    fn next_revision(&mut self) -> u64 {
        self.last_revision += 1;
        self.last_revision
    }
}

impl InMemoryMatchingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stand-in for the authentication collaborator creating an account.
    pub fn register_user(&self, account: UserAccount) -> Result<(), RepositoryError> {
        self.lock()?.users.insert(account.id, account);
        Ok(())
    }

    pub fn badges_for(&self, user: UserId) -> Result<Vec<BadgeRecord>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .badges
            .range((user, BadgeTrack::Specialist)..=(user, BadgeTrack::Inclusionist))
            .map(|(_, record)| record.clone())
            .collect())
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store lock poisoned".to_string()))
    }
}

impl MatchingRepository for InMemoryMatchingStore {
    fn fetch_user(&self, id: UserId) -> Result<Option<UserAccount>, RepositoryError> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    fn fetch_profile(&self, user: UserId) -> Result<Option<VolunteerProfile>, RepositoryError> {
        Ok(self.lock()?.profiles.get(&user).cloned())
    }

    fn ensure_profile(
        &self,
        profile: VolunteerProfile,
    ) -> Result<VolunteerProfile, RepositoryError> {
        let mut state = self.lock()?;
        Ok(state.profiles.entry(profile.user).or_insert(profile).clone())
    }

    fn save_profile(&self, mut profile: VolunteerProfile) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        if let Some(stored) = state.profiles.get(&profile.user) {
            profile.jobs_completed = stored.jobs_completed;
            profile.jobs_dropped = stored.jobs_dropped;
        }
        state.profiles.insert(profile.user, profile);
        Ok(())
    }

    fn update_profile_counters(
        &self,
        user: UserId,
        jobs_completed: u32,
        jobs_dropped: u32,
    ) -> Result<VolunteerProfile, RepositoryError> {
        let mut state = self.lock()?;
        let stored = state
            .profiles
            .get_mut(&user)
            .ok_or(RepositoryError::NotFound)?;
        stored.jobs_completed = jobs_completed;
        stored.jobs_dropped = jobs_dropped;
        Ok(stored.clone())
    }

    fn insert_job(&self, job: Job) -> Result<Job, RepositoryError> {
        let mut state = self.lock()?;
        if state.jobs.contains_key(&job.id) {
            return Err(RepositoryError::Conflict);
        }
        state.jobs.insert(job.id.clone(), job.clone());
        Ok(job)
    }

    fn update_job(&self, job: Job) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        match state.jobs.get_mut(&job.id) {
            Some(stored) => {
                *stored = job;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch_job(&self, id: &JobId) -> Result<Option<Job>, RepositoryError> {
        Ok(self.lock()?.jobs.get(id).cloned())
    }

    fn open_jobs(&self, within: Option<BoundingBox>) -> Result<Vec<Job>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .jobs
            .values()
            .filter(|job| job.is_active && job.status == JobStatus::Open)
            .filter(|job| match within {
                Some(bbox) => job.location.is_some_and(|point| bbox.contains(point)),
                None => true,
            })
            .cloned()
            .collect())
    }

    fn jobs_posted_by(&self, poster: UserId) -> Result<Vec<Job>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .jobs
            .values()
            .filter(|job| job.poster == poster)
            .cloned()
            .collect())
    }

    fn upsert_interest(&self, interest: MatchingInterest) -> Result<bool, RepositoryError> {
        let previous = self
            .lock()?
            .interests
            .insert(interest.key.clone(), interest);
        Ok(previous.is_none())
    }

    fn fetch_interest(&self, key: &PairingKey) -> Result<Option<MatchingInterest>, RepositoryError> {
        Ok(self.lock()?.interests.get(key).cloned())
    }

    fn interests_for_job(&self, job: &JobId) -> Result<Vec<MatchingInterest>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .interests
            .values()
            .filter(|interest| &interest.key.job == job)
            .cloned()
            .collect())
    }

    fn interests_for_user(&self, user: UserId) -> Result<Vec<MatchingInterest>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .interests
            .values()
            .filter(|interest| interest.key.volunteer == user)
            .cloned()
            .collect())
    }

    fn insert_acceptance(
        &self,
        mut acceptance: JobAcceptance,
    ) -> Result<JobAcceptance, RepositoryError> {
        let mut state = self.lock()?;
        if state.acceptances.contains_key(&acceptance.key) {
            return Err(RepositoryError::Conflict);
        }
        acceptance.revision = state.next_revision();
        state
            .acceptances
            .insert(acceptance.key.clone(), acceptance.clone());
        Ok(acceptance)
    }

    fn fetch_acceptance(
        &self,
        key: &PairingKey,
    ) -> Result<Option<JobAcceptance>, RepositoryError> {
        Ok(self.lock()?.acceptances.get(key).cloned())
    }

    fn compare_and_set_acceptance(
        &self,
        observed: &JobAcceptance,
        mut record: JobAcceptance,
    ) -> Result<JobAcceptance, RepositoryError> {
        let mut state = self.lock()?;
        check_observed(state.acceptances.get(&observed.key), observed)?;
        record.revision = state.next_revision();
        state
            .acceptances
            .insert(observed.key.clone(), record.clone());
        Ok(record)
    }

    fn remove_acceptance(&self, observed: &JobAcceptance) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        check_observed(state.acceptances.get(&observed.key), observed)?;
        state.acceptances.remove(&observed.key);
        Ok(())
    }

    fn acceptances_for_user(&self, user: UserId) -> Result<Vec<JobAcceptance>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .acceptances
            .values()
            .filter(|acceptance| acceptance.key.volunteer == user)
            .cloned()
            .collect())
    }

    fn upsert_completion(&self, completion: JobCompletion) -> Result<(), RepositoryError> {
        self.lock()?
            .completions
            .insert(completion.key.clone(), completion);
        Ok(())
    }

    fn fetch_completion(
        &self,
        key: &PairingKey,
    ) -> Result<Option<JobCompletion>, RepositoryError> {
        Ok(self.lock()?.completions.get(key).cloned())
    }

    fn completions_for_user(&self, user: UserId) -> Result<Vec<JobCompletion>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .completions
            .values()
            .filter(|completion| completion.key.volunteer == user)
            .cloned()
            .collect())
    }

    fn save_badges(&self, user: UserId, badges: Vec<BadgeRecord>) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        state.badges.retain(|(owner, _), _| *owner != user);
        for record in badges {
            state.badges.insert((user, record.track), record);
        }
        Ok(())
    }
}

/// The stored row must still be the one the caller read: same status, same revision.
fn check_observed(
    stored: Option<&JobAcceptance>,
    observed: &JobAcceptance,
) -> Result<(), RepositoryError> {
    match stored {
        Some(stored)
            if stored.status == observed.status && stored.revision == observed.revision =>
        {
            Ok(())
        }
        other => Err(RepositoryError::StaleState {
            expected: observed.status,
            found: other.map(|stored| stored.status),
        }),
    }
}
