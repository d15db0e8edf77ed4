use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::matching::badges::BadgeRecord;
use crate::workflows::matching::domain::{
    AccessibilityFlags, AccessibilityRequirement, Coordinates, Job, JobAcceptance, JobCompletion,
    JobDraft, JobId, JobStatus, MatchingInterest, PairingKey, UserAccount, UserId,
    VolunteerProfile,
};
use crate::workflows::matching::geo::BoundingBox;
use crate::workflows::matching::repository::{
    ChatChannelPublisher, ChatChannelRequest, ChatError, GeocodeError, Geocoder,
    MatchingRepository, RepositoryError, ResolvedPlace,
};
use crate::workflows::matching::{
    matching_router, InMemoryMatchingStore, MatchingConfig, MatchingService,
};

pub(super) const POSTER: UserId = UserId(1);
pub(super) const VOLUNTEER: UserId = UserId(2);
pub(super) const BYSTANDER: UserId = UserId(3);

/// Rittenhouse Square, Philadelphia.
pub(super) const CENTER: Coordinates = Coordinates::new(39.9496, -75.1718);

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// Point roughly `miles` due north of [`CENTER`].
pub(super) fn north_of_center(miles: f64) -> Coordinates {
    Coordinates::new(CENTER.latitude + miles / 69.0, CENTER.longitude)
}

pub(super) fn account(id: UserId, username: &str, days_ago: i64) -> UserAccount {
    UserAccount {
        id,
        username: username.to_string(),
        joined_at: now() - Duration::days(days_ago),
    }
}

pub(super) fn tags(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|value| value.to_string()).collect()
}

pub(super) fn volunteer_profile(
    location: Option<Coordinates>,
    skills: &[&str],
    limitations: &[AccessibilityRequirement],
) -> VolunteerProfile {
    let mut profile = VolunteerProfile::new(VOLUNTEER);
    profile.location = location;
    profile.skill_tags = tags(skills);
    profile.limitations = limitations.iter().copied().collect();
    profile
}

/// Job built directly, bypassing the service, for scoring tests.
pub(super) fn job(id: &str, location: Option<Coordinates>, starts_in_hours: i64) -> Job {
    Job {
        id: JobId(id.to_string()),
        title: format!("Shift {id}"),
        description: "Help out at the community pantry".to_string(),
        short_description: "Pantry shift".to_string(),
        poster: POSTER,
        location,
        location_label: "Center City".to_string(),
        shift_start: now() + Duration::hours(starts_in_hours),
        shift_end: now() + Duration::hours(starts_in_hours + 3),
        skill_tags: BTreeSet::new(),
        accessibility: BTreeSet::new(),
        status: JobStatus::Open,
        is_active: true,
        created_at: now(),
    }
}

pub(super) fn draft_at(
    reference: DateTime<Utc>,
    location: Option<Coordinates>,
    starts_in_hours: i64,
) -> JobDraft {
    JobDraft {
        title: "Meal packing".to_string(),
        description: "Pack meals for delivery routes".to_string(),
        short_description: "Meal packing".to_string(),
        latitude: location.map(|point| point.latitude),
        longitude: location.map(|point| point.longitude),
        location_label: None,
        shift_start: reference + Duration::hours(starts_in_hours),
        shift_end: reference + Duration::hours(starts_in_hours + 2),
        skill_tags: Vec::new(),
        accessibility_flags: AccessibilityFlags::default(),
    }
}

pub(super) fn draft(starts_in_hours: i64) -> JobDraft {
    draft_at(now(), Some(north_of_center(2.0)), starts_in_hours)
}

pub(super) type TestService = MatchingService<InMemoryMatchingStore, StaticGeocoder, MemoryChat>;

pub(super) fn store_with_users() -> Arc<InMemoryMatchingStore> {
    let store = Arc::new(InMemoryMatchingStore::new());
    for (id, name, days) in [
        (POSTER, "pantry-lead", 400),
        (VOLUNTEER, "rivera", 10),
        (BYSTANDER, "okafor", 30),
    ] {
        store
            .register_user(account(id, name, days))
            .expect("register user");
    }
    store
}

pub(super) fn build_service() -> (TestService, Arc<InMemoryMatchingStore>, Arc<MemoryChat>) {
    build_service_with(MatchingConfig::standard())
}

pub(super) fn build_service_with(
    config: MatchingConfig,
) -> (TestService, Arc<InMemoryMatchingStore>, Arc<MemoryChat>) {
    let store = store_with_users();
    let chat = Arc::new(MemoryChat::default());
    let service = MatchingService::new(
        store.clone(),
        Arc::new(StaticGeocoder::philadelphia()),
        chat.clone(),
        config,
    );
    (service, store, chat)
}

pub(super) fn router_with_service(service: TestService) -> axum::Router {
    matching_router(Arc::new(service))
}

/// Geocoder answering from a fixed gazetteer; reverse lookups return one label.
#[derive(Default)]
pub(super) struct StaticGeocoder {
    reverse_label: Option<String>,
    places: BTreeMap<String, ResolvedPlace>,
}

impl StaticGeocoder {
    pub(super) fn philadelphia() -> Self {
        let mut places = BTreeMap::new();
        places.insert(
            "19103".to_string(),
            ResolvedPlace {
                point: CENTER,
                label: "Philadelphia, PA 19103".to_string(),
            },
        );
        Self {
            reverse_label: Some("Center City, Philadelphia".to_string()),
            places,
        }
    }
}

impl Geocoder for StaticGeocoder {
    fn reverse(&self, _point: Coordinates) -> Result<Option<String>, GeocodeError> {
        Ok(self.reverse_label.clone())
    }

    fn forward(&self, query: &str) -> Result<Option<ResolvedPlace>, GeocodeError> {
        Ok(self.places.get(query).cloned())
    }
}

pub(super) struct OfflineGeocoder;

impl Geocoder for OfflineGeocoder {
    fn reverse(&self, _point: Coordinates) -> Result<Option<String>, GeocodeError> {
        Err(GeocodeError::Unavailable("timeout".to_string()))
    }

    fn forward(&self, _query: &str) -> Result<Option<ResolvedPlace>, GeocodeError> {
        Err(GeocodeError::Unavailable("timeout".to_string()))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryChat {
    requests: Arc<Mutex<Vec<ChatChannelRequest>>>,
}

impl MemoryChat {
    pub(super) fn requests(&self) -> Vec<ChatChannelRequest> {
        self.requests.lock().expect("chat mutex poisoned").clone()
    }
}

impl ChatChannelPublisher for MemoryChat {
    fn open_channel(&self, request: ChatChannelRequest) -> Result<(), ChatError> {
        self.requests
            .lock()
            .expect("chat mutex poisoned")
            .push(request);
        Ok(())
    }
}

pub(super) struct BrokenChat;

impl ChatChannelPublisher for BrokenChat {
    fn open_channel(&self, _request: ChatChannelRequest) -> Result<(), ChatError> {
        Err(ChatError::Transport("connection refused".to_string()))
    }
}

/// Store wrapper that injects one failure or one interleaved write on demand.
pub(super) struct InterceptingStore {
    inner: Arc<InMemoryMatchingStore>,
    fail_next_completion: AtomicBool,
    write_after_profile_read: Mutex<Option<VolunteerProfile>>,
}

impl InterceptingStore {
    pub(super) fn new(inner: Arc<InMemoryMatchingStore>) -> Self {
        Self {
            inner,
            fail_next_completion: AtomicBool::new(false),
            write_after_profile_read: Mutex::new(None),
        }
    }

    pub(super) fn fail_next_completion(&self) {
        self.fail_next_completion.store(true, Ordering::SeqCst);
    }

    /// Save `profile` right after the next profile read, as a concurrent request would.
    pub(super) fn save_after_next_profile_read(&self, profile: VolunteerProfile) {
        *self
            .write_after_profile_read
            .lock()
            .expect("intercept mutex poisoned") = Some(profile);
    }
}

impl MatchingRepository for InterceptingStore {
    fn fetch_user(&self, id: UserId) -> Result<Option<UserAccount>, RepositoryError> {
        self.inner.fetch_user(id)
    }

    fn fetch_profile(&self, user: UserId) -> Result<Option<VolunteerProfile>, RepositoryError> {
        let read = self.inner.fetch_profile(user)?;
        let pending = self
            .write_after_profile_read
            .lock()
            .expect("intercept mutex poisoned")
            .take();
        if let Some(profile) = pending {
            self.inner.save_profile(profile)?;
        }
        Ok(read)
    }

    fn ensure_profile(
        &self,
        profile: VolunteerProfile,
    ) -> Result<VolunteerProfile, RepositoryError> {
        self.inner.ensure_profile(profile)
    }

    fn save_profile(&self, profile: VolunteerProfile) -> Result<(), RepositoryError> {
        self.inner.save_profile(profile)
    }

    fn update_profile_counters(
        &self,
        user: UserId,
        jobs_completed: u32,
        jobs_dropped: u32,
    ) -> Result<VolunteerProfile, RepositoryError> {
        self.inner
            .update_profile_counters(user, jobs_completed, jobs_dropped)
    }

    fn insert_job(&self, job: Job) -> Result<Job, RepositoryError> {
        self.inner.insert_job(job)
    }

    fn update_job(&self, job: Job) -> Result<(), RepositoryError> {
        self.inner.update_job(job)
    }

    fn fetch_job(&self, id: &JobId) -> Result<Option<Job>, RepositoryError> {
        self.inner.fetch_job(id)
    }

    fn open_jobs(&self, within: Option<BoundingBox>) -> Result<Vec<Job>, RepositoryError> {
        self.inner.open_jobs(within)
    }

    fn jobs_posted_by(&self, poster: UserId) -> Result<Vec<Job>, RepositoryError> {
        self.inner.jobs_posted_by(poster)
    }

    fn upsert_interest(&self, interest: MatchingInterest) -> Result<bool, RepositoryError> {
        self.inner.upsert_interest(interest)
    }

    fn fetch_interest(&self, key: &PairingKey) -> Result<Option<MatchingInterest>, RepositoryError> {
        self.inner.fetch_interest(key)
    }

    fn interests_for_job(&self, job: &JobId) -> Result<Vec<MatchingInterest>, RepositoryError> {
        self.inner.interests_for_job(job)
    }

    fn interests_for_user(&self, user: UserId) -> Result<Vec<MatchingInterest>, RepositoryError> {
        self.inner.interests_for_user(user)
    }

    fn insert_acceptance(
        &self,
        acceptance: JobAcceptance,
    ) -> Result<JobAcceptance, RepositoryError> {
        self.inner.insert_acceptance(acceptance)
    }

    fn fetch_acceptance(
        &self,
        key: &PairingKey,
    ) -> Result<Option<JobAcceptance>, RepositoryError> {
        self.inner.fetch_acceptance(key)
    }

    fn compare_and_set_acceptance(
        &self,
        observed: &JobAcceptance,
        record: JobAcceptance,
    ) -> Result<JobAcceptance, RepositoryError> {
        self.inner.compare_and_set_acceptance(observed, record)
    }

    fn remove_acceptance(&self, observed: &JobAcceptance) -> Result<(), RepositoryError> {
        self.inner.remove_acceptance(observed)
    }

    fn acceptances_for_user(&self, user: UserId) -> Result<Vec<JobAcceptance>, RepositoryError> {
        self.inner.acceptances_for_user(user)
    }

    fn upsert_completion(&self, completion: JobCompletion) -> Result<(), RepositoryError> {
        if self.fail_next_completion.swap(false, Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("connection reset".to_string()));
        }
        self.inner.upsert_completion(completion)
    }

    fn fetch_completion(
        &self,
        key: &PairingKey,
    ) -> Result<Option<JobCompletion>, RepositoryError> {
        self.inner.fetch_completion(key)
    }

    fn completions_for_user(&self, user: UserId) -> Result<Vec<JobCompletion>, RepositoryError> {
        self.inner.completions_for_user(user)
    }

    fn save_badges(&self, user: UserId, badges: Vec<BadgeRecord>) -> Result<(), RepositoryError> {
        self.inner.save_badges(user, badges)
    }
}

pub(super) type InterceptedService =
    MatchingService<InterceptingStore, StaticGeocoder, MemoryChat>;

pub(super) fn build_intercepted_service() -> (InterceptedService, Arc<InterceptingStore>) {
    let store = Arc::new(InterceptingStore::new(store_with_users()));
    let service = MatchingService::new(
        store.clone(),
        Arc::new(StaticGeocoder::philadelphia()),
        Arc::new(MemoryChat::default()),
        MatchingConfig::standard(),
    );
    (service, store)
}

/// Post a job as [`POSTER`] and register [`VOLUNTEER`]'s interest in it.
pub(super) fn posted_with_interest(service: &TestService, starts_in_hours: i64) -> Job {
    let job = service
        .create_job(POSTER, draft(starts_in_hours), now())
        .expect("job created");
    service
        .record_interest(VOLUNTEER, &job.id, true, now())
        .expect("interest recorded");
    job
}

/// Post, swipe, and confirm in one step.
pub(super) fn confirmed_job(service: &TestService, starts_in_hours: i64) -> Job {
    let job = posted_with_interest(service, starts_in_hours);
    service
        .confirm(POSTER, &job.id, VOLUNTEER, now())
        .expect("confirmation succeeds");
    job
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
