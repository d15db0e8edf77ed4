use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use super::domain::{
    Coordinates, Job, JobDraft, JobId, JobPatch, JobStatus, UserId, MAX_TRAVEL_DISTANCE_MILES,
    MIN_TRAVEL_DISTANCE_MILES,
};

/// Malformed input rejected before any state is touched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("job title must not be empty")]
    EmptyTitle,
    #[error("shift end {end} must be after shift start {start}")]
    ShiftWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("max travel distance must be between 1 and 100 miles (found {found})")]
    TravelDistanceOutOfRange { found: u16 },
    #[error("search radius must be a positive number of miles (found {found})")]
    InvalidRadius { found: f64 },
    #[error("latitude and longitude must be provided together")]
    PartialCoordinates,
    #[error("coordinates out of range (latitude {latitude}, longitude {longitude})")]
    CoordinatesOutOfRange { latitude: f64, longitude: f64 },
    #[error("gps location requires latitude and longitude")]
    MissingCoordinates,
    #[error("manual location requires a location description")]
    MissingManualLocation,
    #[error("location '{0}' could not be found")]
    LocationNotFound(String),
    #[error("job status cannot be set to {0:?} directly")]
    StatusNotEditable(JobStatus),
}

/// Trim tags and drop blanks; duplicates collapse in the set.
pub fn normalize_tags<I>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = String>,
{
    tags.into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}

pub fn validate_travel_distance(miles: u16) -> Result<u16, ValidationError> {
    if (MIN_TRAVEL_DISTANCE_MILES..=MAX_TRAVEL_DISTANCE_MILES).contains(&miles) {
        Ok(miles)
    } else {
        Err(ValidationError::TravelDistanceOutOfRange { found: miles })
    }
}

pub fn validate_radius(radius: f64) -> Result<f64, ValidationError> {
    if radius.is_finite() && radius > 0.0 {
        Ok(radius)
    } else {
        Err(ValidationError::InvalidRadius { found: radius })
    }
}

pub fn validate_shift_window(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<(), ValidationError> {
    if end > start {
        Ok(())
    } else {
        Err(ValidationError::ShiftWindow { start, end })
    }
}

/// Both-or-neither coordinate pair, range checked.
pub fn coordinates_from(
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Result<Option<Coordinates>, ValidationError> {
    match (latitude, longitude) {
        (None, None) => Ok(None),
        (Some(latitude), Some(longitude)) => {
            let point = Coordinates::new(latitude, longitude);
            if point.is_valid() {
                Ok(Some(point))
            } else {
                Err(ValidationError::CoordinatesOutOfRange {
                    latitude,
                    longitude,
                })
            }
        }
        _ => Err(ValidationError::PartialCoordinates),
    }
}

fn validate_title(title: &str) -> Result<String, ValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        Err(ValidationError::EmptyTitle)
    } else {
        Ok(trimmed.to_string())
    }
}

pub(crate) fn job_from_draft(
    id: JobId,
    poster: UserId,
    draft: JobDraft,
    now: DateTime<Utc>,
) -> Result<Job, ValidationError> {
    let title = validate_title(&draft.title)?;
    validate_shift_window(draft.shift_start, draft.shift_end)?;
    let location = coordinates_from(draft.latitude, draft.longitude)?;

    Ok(Job {
        id,
        title,
        description: draft.description,
        short_description: draft.short_description,
        poster,
        location,
        location_label: draft.location_label.unwrap_or_default().trim().to_string(),
        shift_start: draft.shift_start,
        shift_end: draft.shift_end,
        skill_tags: normalize_tags(draft.skill_tags),
        accessibility: draft.accessibility_flags.requirements(),
        status: JobStatus::Open,
        is_active: true,
        created_at: now,
    })
}

/// Apply a patch on a copy, validating the merged result as a whole.
pub(crate) fn apply_patch(job: &Job, patch: JobPatch) -> Result<Job, ValidationError> {
    let mut updated = job.clone();

    if let Some(title) = patch.title {
        updated.title = validate_title(&title)?;
    }
    if let Some(description) = patch.description {
        updated.description = description;
    }
    if let Some(short_description) = patch.short_description {
        updated.short_description = short_description;
    }
    if patch.latitude.is_some() || patch.longitude.is_some() {
        updated.location = coordinates_from(patch.latitude, patch.longitude)?;
    }
    if let Some(label) = patch.location_label {
        updated.location_label = label.trim().to_string();
    }
    if let Some(start) = patch.shift_start {
        updated.shift_start = start;
    }
    if let Some(end) = patch.shift_end {
        updated.shift_end = end;
    }
    validate_shift_window(updated.shift_start, updated.shift_end)?;
    if let Some(tags) = patch.skill_tags {
        updated.skill_tags = normalize_tags(tags);
    }
    if let Some(flags) = patch.accessibility_flags {
        updated.accessibility = flags.requirements();
    }
    if let Some(status) = patch.status {
        if status == JobStatus::Completed {
            return Err(ValidationError::StatusNotEditable(status));
        }
        updated.status = status;
    }

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::matching::domain::{AccessibilityFlags, AccessibilityRequirement};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).single().expect("valid")
    }

    fn draft() -> JobDraft {
        JobDraft {
            title: "  Food bank sorting ".to_string(),
            description: "Sort donated cans".to_string(),
            short_description: "Sorting".to_string(),
            latitude: Some(40.0),
            longitude: Some(-75.0),
            location_label: None,
            shift_start: now() + Duration::hours(3),
            shift_end: now() + Duration::hours(6),
            skill_tags: vec![" Sorting".to_string(), String::new(), "Sorting".to_string()],
            accessibility_flags: AccessibilityFlags {
                heavy_lifting: true,
                outdoor_work: false,
                ..AccessibilityFlags::default()
            },
        }
    }

    #[test]
    fn draft_keeps_only_true_accessibility_flags() {
        let job = job_from_draft(JobId("job-1".to_string()), UserId(1), draft(), now())
            .expect("valid draft");
        assert_eq!(job.title, "Food bank sorting");
        assert_eq!(
            job.accessibility.into_iter().collect::<Vec<_>>(),
            vec![AccessibilityRequirement::HeavyLifting]
        );
        assert_eq!(job.skill_tags.len(), 1);
        assert_eq!(job.status, JobStatus::Open);
    }

    #[test]
    fn shift_end_must_follow_start() {
        let mut draft = draft();
        draft.shift_end = draft.shift_start;
        let err = job_from_draft(JobId("job-1".to_string()), UserId(1), draft, now())
            .expect_err("zero-length shift rejected");
        assert!(matches!(err, ValidationError::ShiftWindow { .. }));
    }

    #[test]
    fn half_a_coordinate_pair_is_rejected() {
        assert_eq!(
            coordinates_from(Some(10.0), None),
            Err(ValidationError::PartialCoordinates)
        );
        assert!(matches!(
            coordinates_from(Some(91.0), Some(0.0)),
            Err(ValidationError::CoordinatesOutOfRange { .. })
        ));
        assert_eq!(coordinates_from(None, None), Ok(None));
    }

    #[test]
    fn travel_distance_bounds_are_inclusive() {
        assert_eq!(validate_travel_distance(1), Ok(1));
        assert_eq!(validate_travel_distance(100), Ok(100));
        assert_eq!(
            validate_travel_distance(0),
            Err(ValidationError::TravelDistanceOutOfRange { found: 0 })
        );
        assert!(validate_travel_distance(101).is_err());
    }

    #[test]
    fn patch_revalidates_merged_shift_window() {
        let job = job_from_draft(JobId("job-1".to_string()), UserId(1), draft(), now())
            .expect("valid draft");
        let patch = JobPatch {
            shift_end: Some(job.shift_start - Duration::minutes(5)),
            ..JobPatch::default()
        };
        assert!(matches!(
            apply_patch(&job, patch),
            Err(ValidationError::ShiftWindow { .. })
        ));

        let patch = JobPatch {
            status: Some(JobStatus::Completed),
            ..JobPatch::default()
        };
        assert_eq!(
            apply_patch(&job, patch),
            Err(ValidationError::StatusNotEditable(JobStatus::Completed))
        );
    }
}
