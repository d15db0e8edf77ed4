use super::common::*;
use crate::workflows::matching::domain::AccessibilityRequirement;
use crate::workflows::matching::scoring::{Exclusion, ScoreFactor, ScoringConfig, ScoringEngine};

fn engine() -> ScoringEngine {
    ScoringEngine::new(ScoringConfig::standard())
}

#[test]
fn heavy_lifting_job_is_excluded_while_cooking_job_ranks_first() {
    let profile = volunteer_profile(
        Some(CENTER),
        &["Cooking"],
        &[AccessibilityRequirement::HeavyLifting],
    );
    let site = north_of_center(5.0);

    let mut lifting = job("lifting", Some(site), 72);
    lifting
        .accessibility
        .insert(AccessibilityRequirement::HeavyLifting);
    let mut cooking = job("cooking", Some(site), 72);
    cooking.skill_tags = tags(&["Cooking"]);
    let plain = job("plain", Some(site), 72);

    let excluded = engine().score(&profile, &lifting, 25.0, now());
    assert_eq!(excluded.score, 0.0);
    assert!(matches!(
        excluded.exclusion,
        Some(Exclusion::AccessibilityConflict { .. })
    ));

    let cooking_score = engine().score(&profile, &cooking, 25.0, now()).score;
    let plain_score = engine().score(&profile, &plain, 25.0, now()).score;
    assert!(cooking_score > plain_score);
    assert!(plain_score > 0.0);

    let ranked = engine().rank(&profile, vec![plain, lifting, cooking], 25.0, 10, now());
    let ids: Vec<_> = ranked.iter().map(|entry| entry.job.id.0.as_str()).collect();
    assert_eq!(ids, vec!["cooking", "plain"]);
}

#[test]
fn accessibility_conflict_beats_every_other_signal() {
    let profile = volunteer_profile(
        Some(CENTER),
        &["Driving"],
        &[AccessibilityRequirement::DrivingRequired],
    );
    let mut tempting = job("tempting", Some(CENTER), 1);
    tempting.skill_tags = tags(&["Driving"]);
    tempting
        .accessibility
        .insert(AccessibilityRequirement::DrivingRequired);
    tempting
        .accessibility
        .insert(AccessibilityRequirement::OutdoorWork);

    let outcome = engine().score(&profile, &tempting, 100.0, now());
    assert_eq!(outcome.score, 0.0);
    match outcome.exclusion {
        Some(Exclusion::AccessibilityConflict { requirements }) => {
            assert_eq!(requirements, vec![AccessibilityRequirement::DrivingRequired]);
        }
        other => panic!("expected accessibility exclusion, got {other:?}"),
    }
    assert!(engine()
        .rank(&profile, vec![tempting], 100.0, 10, now())
        .is_empty());
}

#[test]
fn jobs_beyond_radius_score_zero() {
    let profile = volunteer_profile(Some(CENTER), &[], &[]);
    let distant = job("distant", Some(north_of_center(30.0)), 2);

    let outcome = engine().score(&profile, &distant, 25.0, now());
    assert_eq!(outcome.score, 0.0);
    let distance = outcome.distance_miles.expect("both sides located");
    assert!(distance > 25.0);
    assert!(matches!(
        outcome.exclusion,
        Some(Exclusion::OutsideRadius { .. })
    ));
}

#[test]
fn volunteers_without_location_still_receive_scores() {
    let profile = volunteer_profile(None, &["Sorting"], &[]);
    let mut sorting = job("sorting", Some(north_of_center(500.0)), 72);
    sorting.skill_tags = tags(&["sorting"]);

    let outcome = engine().score(&profile, &sorting, 25.0, now());
    assert!(outcome.score > 0.0);
    assert_eq!(outcome.distance_miles, None);
    assert!(outcome
        .components
        .iter()
        .all(|component| component.factor != ScoreFactor::Proximity));
    assert!(outcome
        .components
        .iter()
        .any(|component| component.factor == ScoreFactor::SkillOverlap));
}

#[test]
fn closer_and_more_urgent_jobs_score_higher() {
    let profile = volunteer_profile(Some(CENTER), &[], &[]);
    let near = engine().score(&profile, &job("near", Some(north_of_center(2.0)), 72), 25.0, now());
    let far = engine().score(&profile, &job("far", Some(north_of_center(20.0)), 72), 25.0, now());
    assert!(near.score > far.score);

    let urgent = engine().score(&profile, &job("urgent", Some(north_of_center(2.0)), 3), 25.0, now());
    assert!(urgent.score > near.score);
    assert!(urgent
        .components
        .iter()
        .any(|component| component.factor == ScoreFactor::Urgency));
}

#[test]
fn more_shared_skills_score_higher() {
    let profile = volunteer_profile(Some(CENTER), &["Cooking", "Driving"], &[]);
    let mut one = job("one", Some(CENTER), 72);
    one.skill_tags = tags(&["Cooking"]);
    let mut two = job("two", Some(CENTER), 72);
    two.skill_tags = tags(&["Cooking", "Driving"]);

    let one = engine().score(&profile, &one, 25.0, now()).score;
    let two = engine().score(&profile, &two, 25.0, now()).score;
    assert!(two > one);
}

#[test]
fn equal_scores_fall_back_to_earlier_shift() {
    let profile = volunteer_profile(None, &[], &[]);
    let later = job("later", None, 96);
    let sooner = job("sooner", None, 48);

    let ranked = engine().rank(&profile, vec![later, sooner], 25.0, 10, now());
    assert_eq!(ranked[0].score, ranked[1].score);
    let ids: Vec<_> = ranked.iter().map(|entry| entry.job.id.0.as_str()).collect();
    assert_eq!(ids, vec!["sooner", "later"]);
}

#[test]
fn truncation_happens_after_sorting() {
    let profile = volunteer_profile(Some(CENTER), &[], &[]);
    let candidates = vec![
        job("edge", Some(north_of_center(24.0)), 72),
        job("middle", Some(north_of_center(12.0)), 72),
        job("doorstep", Some(north_of_center(0.5)), 72),
    ];

    let ranked = engine().rank(&profile, candidates, 25.0, 1, now());
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].job.id.0, "doorstep");
}

#[test]
fn ranked_entries_carry_urgency_relative_to_now() {
    let profile = volunteer_profile(None, &[], &[]);
    let ranked = engine().rank(&profile, vec![job("soon", None, 6)], 25.0, 10, now());
    assert!(ranked[0].is_urgent);
    assert!((ranked[0].urgency_hours - 6.0).abs() < 1e-9);

    let started = job("started", None, -2);
    assert_eq!(started.urgency_hours(now()), 0.0);
    assert!(started.is_urgent(now()));
}

#[test]
fn custom_weights_flow_through() {
    let config = ScoringConfig {
        urgency_bonus: 0.0,
        ..ScoringConfig::standard()
    };
    let engine = ScoringEngine::new(config);
    let profile = volunteer_profile(None, &[], &[]);
    let urgent = engine.score(&profile, &job("urgent", None, 2), 25.0, now());
    let relaxed = engine.score(&profile, &job("relaxed", None, 72), 25.0, now());
    assert_eq!(urgent.score, relaxed.score);
    assert_eq!(engine.config().urgency_bonus, 0.0);
}

#[test]
fn case_variants_of_one_skill_count_once() {
    let profile = volunteer_profile(Some(CENTER), &["Cooking", "cooking"], &[]);
    let mut kitchen = job("kitchen", Some(CENTER), 72);
    kitchen.skill_tags = tags(&["COOKING"]);

    let outcome = engine().score(&profile, &kitchen, 25.0, now());
    let overlap = outcome
        .components
        .iter()
        .find(|component| component.factor == ScoreFactor::SkillOverlap)
        .expect("skill overlap scored");
    assert_eq!(overlap.points, ScoringConfig::standard().skill_match_weight);
}
