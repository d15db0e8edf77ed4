//! Volunteer job matching: geo filtering, scoring, reliability badges, and the acceptance
//! lifecycle, behind a repository-backed service and an axum router.

pub mod acceptance;
pub mod badges;
pub mod domain;
pub mod geo;
pub mod memory;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub(crate) mod validation;
pub mod views;

#[cfg(test)]
mod tests;

pub use acceptance::{AcceptanceAction, Transition, TransitionError};
pub use badges::{
    BadgeComputation, BadgeEngine, BadgeLevel, BadgeRecord, BadgeTrack, BadgeTrackTable,
    BadgeView,
};
pub use domain::{
    AcceptanceStatus, AccessibilityFlags, AccessibilityRequirement, Coordinates, Job,
    JobAcceptance, JobCompletion, JobDraft, JobId, JobPatch, JobStatus, LocationSource,
    LocationUpdate, MatchingInterest, PairingKey, ProfileUpdate, UserAccount, UserId,
    VolunteerProfile,
};
pub use geo::{distance_miles, BoundingBox};
pub use memory::InMemoryMatchingStore;
pub use repository::{
    ChatChannelPublisher, ChatChannelRequest, ChatError, GeocodeError, Geocoder,
    MatchingRepository, RepositoryError, ResolvedPlace,
};
pub use router::{matching_router, ACTING_USER_HEADER};
pub use scoring::{Exclusion, MatchScore, RankedJob, ScoringConfig, ScoringEngine};
pub use service::{
    AcceptedJob, CompletionRecorded, InterestRecorded, MatchingConfig, MatchingService,
    MatchingServiceError,
};
pub use validation::ValidationError;
