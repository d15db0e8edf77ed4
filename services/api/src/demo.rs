use crate::infra::{build_service, parse_limitation, seed_accounts, ApiService};
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use std::sync::Arc;
use volunteer_match::config::AppConfig;
use volunteer_match::error::AppError;
use volunteer_match::workflows::matching::{
    AccessibilityFlags, AccessibilityRequirement, Coordinates, InMemoryMatchingStore, Job,
    JobDraft, LocationSource, LocationUpdate, MatchingServiceError, ProfileUpdate, UserId,
    VolunteerProfile,
};

const POSTER: UserId = UserId(1);
const VOLUNTEER: UserId = UserId(2);

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Postal code or neighbourhood the demo volunteer searches from
    #[arg(long, default_value = "19103")]
    pub(crate) location: String,
    /// Report the shift as dropped instead of completed
    #[arg(long = "drop")]
    pub(crate) dropped: bool,
}

#[derive(Args, Debug)]
pub(crate) struct RankArgs {
    /// Volunteer latitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) lat: f64,
    /// Volunteer longitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) lon: f64,
    /// Search radius in miles (defaults to MATCH_DEFAULT_RADIUS_MILES)
    #[arg(long)]
    pub(crate) radius: Option<f64>,
    /// Comma-separated skill tags
    #[arg(long, value_delimiter = ',')]
    pub(crate) skills: Vec<String>,
    /// Comma-separated limitations (heavy_lifting, standing_long, driving_required, outdoor_work)
    #[arg(long, value_delimiter = ',', value_parser = parse_limitation)]
    pub(crate) limitations: Vec<AccessibilityRequirement>,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { location, dropped } = args;
    let config = AppConfig::load()?;
    let now = Utc::now();
    let service = demo_service(&config, now)?;

    println!("Volunteer matching demo");
    let jobs = seed_jobs(&service, now)?;
    println!("- {} shifts posted by pantry-lead", jobs.len());

    service.update_location(
        VOLUNTEER,
        LocationUpdate {
            location_source: LocationSource::Manual,
            latitude: None,
            longitude: None,
            manual_location: Some(location),
            max_distance_miles: Some(10),
        },
        now,
    )?;
    let profile = service.update_profile(
        VOLUNTEER,
        ProfileUpdate {
            skill_tags: Some(vec!["Cooking".to_string(), "Driving".to_string()]),
            limitations: Some(vec![AccessibilityRequirement::HeavyLifting]),
            max_distance_miles: None,
        },
        now,
    )?;
    println!(
        "- {} searches from {} within {} miles",
        profile.username, profile.display_location, profile.max_distance_miles
    );

    let feed = service.rank_jobs(VOLUNTEER, None, None, now)?;
    println!("\nRanked feed");
    for entry in &feed {
        let distance = entry
            .distance_miles
            .map(|miles| format!("{miles:.1} mi"))
            .unwrap_or_else(|| "distance unknown".to_string());
        let urgency = if entry.is_urgent { " [urgent]" } else { "" };
        println!(
            "- {:>5.1} {} ({}, starts in {:.0}h){}",
            entry.score, entry.job.title, distance, entry.urgency_hours, urgency
        );
    }

    let Some(top) = feed.first() else {
        println!("No shifts matched; nothing to swipe on.");
        return Ok(());
    };
    let job_id = top.job.id.clone();

    let swipe = service.record_interest(VOLUNTEER, &job_id, true, now)?;
    println!(
        "\nSwiped interested on \"{}\" (pending pairing created: {})",
        swipe.job.title, swipe.acceptance_created
    );

    let confirmed = service.confirm(POSTER, &job_id, VOLUNTEER, now)?;
    println!("- poster confirmed -> {}", confirmed.acceptance.status);
    let started = service.start(VOLUNTEER, &job_id, VOLUNTEER, now)?;
    println!("- shift started -> {}", started.acceptance.status);

    let outcome = service.record_completion(POSTER, &job_id, VOLUNTEER, !dropped, now)?;
    println!(
        "- poster reported {} -> job status {}",
        outcome.acceptance.status,
        outcome.job.status.label()
    );
    println!(
        "  Reliability: {} completed / {} dropped",
        outcome.badges.jobs_completed, outcome.badges.jobs_dropped
    );

    println!("\nBadges");
    for badge in &outcome.badges.views {
        let next = badge
            .next_threshold
            .map(|threshold| format!("next at {threshold}"))
            .unwrap_or_else(|| "top level".to_string());
        println!(
            "- {}: level {} ({}) progress {} | {}",
            badge.track.label(),
            badge.level,
            badge.level_name,
            badge.progress,
            next
        );
    }

    let badges = service.badges_for(VOLUNTEER, now)?;
    match serde_json::to_string_pretty(&badges) {
        Ok(json) => println!("\nPublic badge payload:\n{}", json),
        Err(err) => println!("\nPublic badge payload unavailable: {}", err),
    }

    Ok(())
}

pub(crate) fn run_rank(args: RankArgs) -> Result<(), AppError> {
    let RankArgs {
        lat,
        lon,
        radius,
        skills,
        limitations,
    } = args;
    let config = AppConfig::load()?;
    let now = Utc::now();
    let radius = radius.unwrap_or(config.matching.default_radius_miles);

    let service = demo_service(&config, now)?;
    let jobs = seed_jobs(&service, now)?;

    let mut profile = VolunteerProfile::new(UserId(0));
    profile.location = Some(Coordinates::new(lat, lon));
    profile.skill_tags = skills
        .into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect();
    profile.limitations = limitations.into_iter().collect();

    println!(
        "Scoring {} shifts from ({lat:.4}, {lon:.4}) within {radius:.0} miles",
        jobs.len()
    );
    for job in &jobs {
        let outcome = service.scoring().score(&profile, job, radius, now);
        match outcome.exclusion {
            Some(exclusion) => println!("- {}: excluded, {}", job.title, exclusion.summary()),
            None => {
                println!("- {}: {:.1}", job.title, outcome.score);
                for component in &outcome.components {
                    println!(
                        "    - {:?}: {:.1} ({})",
                        component.factor, component.points, component.notes
                    );
                }
            }
        }
    }

    let ranked = service
        .scoring()
        .rank(&profile, jobs, radius, config.matching.default_limit, now);
    println!("\nFeed order");
    for (position, entry) in ranked.iter().enumerate() {
        println!("{}. {} ({:.1})", position + 1, entry.job.title, entry.score);
    }

    Ok(())
}

fn demo_service(
    config: &AppConfig,
    now: DateTime<Utc>,
) -> Result<ApiService, AppError> {
    let store = Arc::new(InMemoryMatchingStore::new());
    seed_accounts(&store, now).map_err(MatchingServiceError::from)?;
    Ok(build_service(&config.matching, store))
}

fn seed_jobs(service: &ApiService, now: DateTime<Utc>) -> Result<Vec<Job>, AppError> {
    let drafts = [
        demo_draft(
            "Community kitchen prep",
            &["Cooking"],
            AccessibilityFlags {
                standing_long: true,
                ..AccessibilityFlags::default()
            },
            Coordinates::new(39.9526, -75.1652),
            now + Duration::hours(5),
        ),
        demo_draft(
            "Warehouse unloading",
            &["Sorting"],
            AccessibilityFlags {
                heavy_lifting: true,
                ..AccessibilityFlags::default()
            },
            Coordinates::new(39.9700, -75.1300),
            now + Duration::hours(30),
        ),
        demo_draft(
            "Grocery delivery route",
            &["Driving"],
            AccessibilityFlags {
                driving_required: true,
                ..AccessibilityFlags::default()
            },
            Coordinates::new(39.9367, -75.1527),
            now + Duration::hours(48),
        ),
        demo_draft(
            "Garden cleanup",
            &[],
            AccessibilityFlags {
                outdoor_work: true,
                ..AccessibilityFlags::default()
            },
            Coordinates::new(40.0540, -75.1950),
            now + Duration::hours(72),
        ),
    ];

    drafts
        .into_iter()
        .map(|draft| {
            service
                .create_job(POSTER, draft, now)
                .map_err(AppError::from)
        })
        .collect()
}

fn demo_draft(
    title: &str,
    skills: &[&str],
    accessibility_flags: AccessibilityFlags,
    point: Coordinates,
    shift_start: DateTime<Utc>,
) -> JobDraft {
    JobDraft {
        title: title.to_string(),
        description: format!("{title} for the neighbourhood food network"),
        short_description: title.to_string(),
        latitude: Some(point.latitude),
        longitude: Some(point.longitude),
        location_label: None,
        shift_start,
        shift_end: shift_start + Duration::hours(3),
        skill_tags: skills.iter().map(|skill| skill.to_string()).collect(),
        accessibility_flags,
    }
}
