use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::domain::{JobDraft, JobId, JobPatch, LocationUpdate, ProfileUpdate, UserId};
use super::repository::{ChatChannelPublisher, Geocoder, MatchingRepository, RepositoryError};
use super::service::{MatchingService, MatchingServiceError};
use super::views::{AcceptanceView, JobView, PostedJobView, RankedJobView};

/// Header carrying the authenticated caller, set by the upstream auth layer.
pub const ACTING_USER_HEADER: &str = "x-user-id";

type SharedService<R, G, C> = Arc<MatchingService<R, G, C>>;

/// Router builder exposing the matching endpoints.
pub fn matching_router<R, G, C>(service: SharedService<R, G, C>) -> Router
where
    R: MatchingRepository + 'static,
    G: Geocoder + 'static,
    C: ChatChannelPublisher + 'static,
{
    Router::new()
        .route("/api/v1/matching/jobs", get(feed_handler::<R, G, C>))
        .route("/api/v1/matching/interest", post(interest_handler::<R, G, C>))
        .route("/api/v1/matching/complete", post(complete_handler::<R, G, C>))
        .route(
            "/api/v1/matching/users/:user_id/badges",
            get(badges_handler::<R, G, C>),
        )
        .route(
            "/api/v1/matching/jobs/create",
            post(create_job_handler::<R, G, C>),
        )
        .route(
            "/api/v1/matching/jobs/my-posted",
            get(posted_jobs_handler::<R, G, C>),
        )
        .route(
            "/api/v1/matching/jobs/accepted",
            get(accepted_jobs_handler::<R, G, C>),
        )
        .route(
            "/api/v1/matching/jobs/interested",
            get(interested_jobs_handler::<R, G, C>),
        )
        .route(
            "/api/v1/matching/jobs/:job_id/update",
            patch(update_job_handler::<R, G, C>),
        )
        .route(
            "/api/v1/matching/jobs/:job_id/delete",
            delete(delete_job_handler::<R, G, C>),
        )
        .route(
            "/api/v1/matching/jobs/:job_id/confirm",
            post(confirm_handler::<R, G, C>),
        )
        .route(
            "/api/v1/matching/jobs/:job_id/accept",
            post(confirm_handler::<R, G, C>),
        )
        .route(
            "/api/v1/matching/jobs/:job_id/start",
            post(start_handler::<R, G, C>),
        )
        .route(
            "/api/v1/matching/jobs/:job_id/retract",
            post(retract_handler::<R, G, C>),
        )
        .route(
            "/api/v1/matching/jobs/:job_id/interested",
            get(interested_volunteers_handler::<R, G, C>),
        )
        .route(
            "/api/v1/matching/profile",
            get(profile_handler::<R, G, C>).patch(update_profile_handler::<R, G, C>),
        )
        .route(
            "/api/v1/matching/location",
            put(update_location_handler::<R, G, C>),
        )
        .route(
            "/api/v1/matching/location/revoke",
            delete(revoke_location_handler::<R, G, C>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct FeedQuery {
    pub radius: Option<f64>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InterestRequest {
    pub job_id: JobId,
    pub interested: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletionRequest {
    pub job_id: JobId,
    #[serde(default = "default_completed")]
    pub completed: bool,
    /// Required when the poster closes the pairing; volunteers act on their own.
    #[serde(default)]
    pub volunteer_id: Option<UserId>,
}

fn default_completed() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConfirmRequest {
    pub volunteer_id: UserId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StartRequest {
    #[serde(default)]
    pub volunteer_id: Option<UserId>,
}

pub(crate) async fn feed_handler<R, G, C>(
    State(service): State<SharedService<R, G, C>>,
    headers: HeaderMap,
    Query(query): Query<FeedQuery>,
) -> Response
where
    R: MatchingRepository + 'static,
    G: Geocoder + 'static,
    C: ChatChannelPublisher + 'static,
{
    let user = match acting_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let now = Utc::now();
    match service.rank_jobs(user, query.radius, query.limit, now) {
        Ok(ranked) => {
            let views: Vec<RankedJobView> = ranked
                .iter()
                .map(|entry| RankedJobView::new(entry, now))
                .collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn interest_handler<R, G, C>(
    State(service): State<SharedService<R, G, C>>,
    headers: HeaderMap,
    Json(request): Json<InterestRequest>,
) -> Response
where
    R: MatchingRepository + 'static,
    G: Geocoder + 'static,
    C: ChatChannelPublisher + 'static,
{
    let user = match acting_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match service.record_interest(user, &request.job_id, request.interested, Utc::now()) {
        Ok(outcome) => {
            let verb = if outcome.interested {
                "are interested in"
            } else {
                "passed on"
            };
            let payload = json!({
                "status": format!("You {verb} \"{}\"", outcome.job.title),
                "created": outcome.acceptance_created,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn complete_handler<R, G, C>(
    State(service): State<SharedService<R, G, C>>,
    headers: HeaderMap,
    Json(request): Json<CompletionRequest>,
) -> Response
where
    R: MatchingRepository + 'static,
    G: Geocoder + 'static,
    C: ChatChannelPublisher + 'static,
{
    let actor = match acting_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let volunteer = request.volunteer_id.unwrap_or(actor);
    match service.record_completion(actor, &request.job_id, volunteer, request.completed, Utc::now())
    {
        Ok(outcome) => {
            let payload = json!({
                "status": outcome.acceptance.status.label(),
                "job": outcome.job.title,
                "badges": outcome.badges.views,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn badges_handler<R, G, C>(
    State(service): State<SharedService<R, G, C>>,
    Path(user_id): Path<u64>,
) -> Response
where
    R: MatchingRepository + 'static,
    G: Geocoder + 'static,
    C: ChatChannelPublisher + 'static,
{
    match service.badges_for(UserId(user_id), Utc::now()) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn create_job_handler<R, G, C>(
    State(service): State<SharedService<R, G, C>>,
    headers: HeaderMap,
    Json(draft): Json<JobDraft>,
) -> Response
where
    R: MatchingRepository + 'static,
    G: Geocoder + 'static,
    C: ChatChannelPublisher + 'static,
{
    let poster = match acting_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let now = Utc::now();
    match service.create_job(poster, draft, now) {
        Ok(job) => (StatusCode::CREATED, Json(PostedJobView::new(&job, now))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn posted_jobs_handler<R, G, C>(
    State(service): State<SharedService<R, G, C>>,
    headers: HeaderMap,
) -> Response
where
    R: MatchingRepository + 'static,
    G: Geocoder + 'static,
    C: ChatChannelPublisher + 'static,
{
    let poster = match acting_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let now = Utc::now();
    match service.posted_jobs(poster) {
        Ok(jobs) => {
            let views: Vec<PostedJobView> =
                jobs.iter().map(|job| PostedJobView::new(job, now)).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_job_handler<R, G, C>(
    State(service): State<SharedService<R, G, C>>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
    Json(changes): Json<JobPatch>,
) -> Response
where
    R: MatchingRepository + 'static,
    G: Geocoder + 'static,
    C: ChatChannelPublisher + 'static,
{
    let poster = match acting_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match service.update_job(poster, &JobId(job_id), changes) {
        Ok(job) => (StatusCode::OK, Json(PostedJobView::new(&job, Utc::now()))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_job_handler<R, G, C>(
    State(service): State<SharedService<R, G, C>>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
) -> Response
where
    R: MatchingRepository + 'static,
    G: Geocoder + 'static,
    C: ChatChannelPublisher + 'static,
{
    let poster = match acting_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match service.delete_job(poster, &JobId(job_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn accepted_jobs_handler<R, G, C>(
    State(service): State<SharedService<R, G, C>>,
    headers: HeaderMap,
) -> Response
where
    R: MatchingRepository + 'static,
    G: Geocoder + 'static,
    C: ChatChannelPublisher + 'static,
{
    let volunteer = match acting_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let now = Utc::now();
    match service.accepted_jobs(volunteer) {
        Ok(accepted) => {
            let views: Vec<AcceptanceView> = accepted
                .iter()
                .map(|entry| AcceptanceView::new(&entry.acceptance, &entry.job, now))
                .collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn interested_jobs_handler<R, G, C>(
    State(service): State<SharedService<R, G, C>>,
    headers: HeaderMap,
) -> Response
where
    R: MatchingRepository + 'static,
    G: Geocoder + 'static,
    C: ChatChannelPublisher + 'static,
{
    let volunteer = match acting_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let now = Utc::now();
    match service.interested_jobs(volunteer) {
        Ok(jobs) => {
            let views: Vec<JobView> = jobs.iter().map(|job| JobView::new(job, now)).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn confirm_handler<R, G, C>(
    State(service): State<SharedService<R, G, C>>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
    Json(request): Json<ConfirmRequest>,
) -> Response
where
    R: MatchingRepository + 'static,
    G: Geocoder + 'static,
    C: ChatChannelPublisher + 'static,
{
    let poster = match acting_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let now = Utc::now();
    match service.confirm(poster, &JobId(job_id), request.volunteer_id, now) {
        Ok(entry) => {
            let view = AcceptanceView::new(&entry.acceptance, &entry.job, now);
            (StatusCode::OK, Json(view)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn start_handler<R, G, C>(
    State(service): State<SharedService<R, G, C>>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
    body: Option<Json<StartRequest>>,
) -> Response
where
    R: MatchingRepository + 'static,
    G: Geocoder + 'static,
    C: ChatChannelPublisher + 'static,
{
    let actor = match acting_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let volunteer = body
        .and_then(|Json(request)| request.volunteer_id)
        .unwrap_or(actor);
    let now = Utc::now();
    match service.start(actor, &JobId(job_id), volunteer, now) {
        Ok(entry) => {
            let view = AcceptanceView::new(&entry.acceptance, &entry.job, now);
            (StatusCode::OK, Json(view)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn retract_handler<R, G, C>(
    State(service): State<SharedService<R, G, C>>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
) -> Response
where
    R: MatchingRepository + 'static,
    G: Geocoder + 'static,
    C: ChatChannelPublisher + 'static,
{
    let volunteer = match acting_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match service.retract(volunteer, &JobId(job_id), Utc::now()) {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "retracted" }))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn interested_volunteers_handler<R, G, C>(
    State(service): State<SharedService<R, G, C>>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
) -> Response
where
    R: MatchingRepository + 'static,
    G: Geocoder + 'static,
    C: ChatChannelPublisher + 'static,
{
    let poster = match acting_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match service.interested_volunteers(poster, &JobId(job_id)) {
        Ok(volunteers) => (StatusCode::OK, Json(volunteers)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn profile_handler<R, G, C>(
    State(service): State<SharedService<R, G, C>>,
    headers: HeaderMap,
) -> Response
where
    R: MatchingRepository + 'static,
    G: Geocoder + 'static,
    C: ChatChannelPublisher + 'static,
{
    let user = match acting_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match service.profile(user, Utc::now()) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_profile_handler<R, G, C>(
    State(service): State<SharedService<R, G, C>>,
    headers: HeaderMap,
    Json(update): Json<ProfileUpdate>,
) -> Response
where
    R: MatchingRepository + 'static,
    G: Geocoder + 'static,
    C: ChatChannelPublisher + 'static,
{
    let user = match acting_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match service.update_profile(user, update, Utc::now()) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_location_handler<R, G, C>(
    State(service): State<SharedService<R, G, C>>,
    headers: HeaderMap,
    Json(update): Json<LocationUpdate>,
) -> Response
where
    R: MatchingRepository + 'static,
    G: Geocoder + 'static,
    C: ChatChannelPublisher + 'static,
{
    let user = match acting_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match service.update_location(user, update, Utc::now()) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn revoke_location_handler<R, G, C>(
    State(service): State<SharedService<R, G, C>>,
    headers: HeaderMap,
) -> Response
where
    R: MatchingRepository + 'static,
    G: Geocoder + 'static,
    C: ChatChannelPublisher + 'static,
{
    let user = match acting_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match service.revoke_location(user, Utc::now()) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

/// Parse the acting user, answering 401 when the header is absent or malformed.
pub(crate) fn acting_user(headers: &HeaderMap) -> Result<UserId, Response> {
    let Some(raw) = headers.get(ACTING_USER_HEADER) else {
        return Err(unauthorized("missing x-user-id header"));
    };
    raw.to_str()
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(UserId)
        .ok_or_else(|| unauthorized("invalid x-user-id header"))
}

fn unauthorized(message: &str) -> Response {
    let payload = json!({ "error": message });
    (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
}

pub(crate) fn status_for(error: &MatchingServiceError) -> StatusCode {
    match error {
        MatchingServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
        MatchingServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
        MatchingServiceError::InvalidState(_) => StatusCode::CONFLICT,
        MatchingServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        MatchingServiceError::Repository(
            RepositoryError::StaleState { .. } | RepositoryError::Conflict,
        ) => StatusCode::CONFLICT,
        MatchingServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        MatchingServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(error: MatchingServiceError) -> Response {
    let payload = json!({
        "error": error.to_string(),
    });
    (status_for(&error), Json(payload)).into_response()
}
