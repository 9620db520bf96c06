#![allow(missing_docs)]

mod common;

use common::{Fixture, MICROTUBE, subject};
use crf_model::{ArtStatus, Gender, HivResult, Value, VisitCode};
use crf_reference::{DataAccess, EngineConfig, EntityRegistry, InMemoryReferences};
use crf_rules::{NamedPredicate, Predicates, RuleError};

fn check(fixture: &Fixture, predicate: NamedPredicate, visit: usize) -> bool {
    fixture
        .predicates()
        .evaluate(predicate, fixture.visit(visit))
        .unwrap()
}

#[test]
fn test_new_male_subject_baseline() {
    let fixture = Fixture::new();
    assert!(check(&fixture, NamedPredicate::RequiresCircumcision, 0));
    assert!(check(&fixture, NamedPredicate::RequiresMicrotube, 0));
    assert!(!check(&fixture, NamedPredicate::IsFemale, 0));
    assert!(!check(&fixture, NamedPredicate::KnownHivPos, 0));
    assert!(!check(&fixture, NamedPredicate::RequiresRbd, 0));
    assert!(!check(&fixture, NamedPredicate::RequiresVl, 0));
    assert!(!check(&fixture, NamedPredicate::RequiresPimaCd4, 0));
    for visit in 0..3 {
        assert!(check(&fixture, NamedPredicate::RequiresTodaysHivResult, visit));
    }
}

#[test]
fn test_circumcision_carries_forward() {
    let mut fixture = Fixture::new();
    fixture.record(0, "circumcision", "circumcised", Value::yes());
    for visit in 0..3 {
        assert!(check(&fixture, NamedPredicate::IsCircumcised, visit));
        assert!(!check(&fixture, NamedPredicate::RequiresCircumcision, visit));
    }
}

#[test]
fn test_circumcision_recorded_later() {
    let mut fixture = Fixture::new();
    fixture.record(0, "circumcision", "circumcised", Value::no());
    fixture.record(1, "circumcision", "circumcised", Value::yes());
    assert!(check(&fixture, NamedPredicate::RequiresCircumcision, 0));
    assert!(!check(&fixture, NamedPredicate::RequiresCircumcision, 1));
    assert!(!check(&fixture, NamedPredicate::RequiresCircumcision, 2));
}

#[test]
fn test_circumcision_gated_on_gender() {
    let mut fixture = Fixture::new();
    fixture.set_subject(Some(Gender::Female), false);
    fixture.record(0, "circumcision", "circumcised", Value::no());
    assert!(check(&fixture, NamedPredicate::IsFemale, 0));
    assert!(!check(&fixture, NamedPredicate::RequiresCircumcision, 0));

    // unknown gender is neither
    fixture.set_subject(None, false);
    assert!(!check(&fixture, NamedPredicate::IsFemale, 0));
    assert!(!check(&fixture, NamedPredicate::RequiresCircumcision, 0));
}

#[test]
fn test_unregistered_subject_reads_as_unknown() {
    let mut fixture = Fixture::new();
    fixture.store = InMemoryReferences::new();
    for visit in fixture.visits.clone() {
        fixture.store.add_visit(visit).unwrap();
    }
    assert!(!check(&fixture, NamedPredicate::RequiresCircumcision, 0));
    assert!(!check(&fixture, NamedPredicate::AnonymousMember, 0));
}

#[test]
fn test_positive_at_baseline_stays_positive() {
    let mut fixture = Fixture::new();
    fixture.hiv_result(0, HivResult::Pos);
    for visit in 0..3 {
        let status = fixture.predicates().status(fixture.visit(visit)).unwrap();
        assert_eq!(status.final_hiv_status, Some(HivResult::Pos));
        assert!(check(&fixture, NamedPredicate::HivPositive, visit));
        assert!(check(&fixture, NamedPredicate::RequiresRbd, visit));
        assert!(check(&fixture, NamedPredicate::RequiresVl, visit));
        assert!(!check(&fixture, NamedPredicate::RequiresMicrotube, visit));
        assert!(!check(&fixture, NamedPredicate::RequiresTodaysHivResult, visit));
        assert!(check(&fixture, NamedPredicate::KnownHivPos, visit));
    }
}

#[test]
fn test_negative_after_positive_is_ignored() {
    let mut fixture = Fixture::new();
    fixture.hiv_result(0, HivResult::Neg);
    fixture.hiv_result(1, HivResult::Pos);
    fixture.hiv_result(2, HivResult::Neg);
    assert!(!check(&fixture, NamedPredicate::HivPositive, 0));
    assert!(check(&fixture, NamedPredicate::HivPositive, 1));
    assert!(check(&fixture, NamedPredicate::HivPositive, 2));
    // diagnosed after baseline
    assert!(!check(&fixture, NamedPredicate::KnownHivPos, 1));
    assert!(!check(&fixture, NamedPredicate::KnownHivPos, 2));
}

#[test]
fn test_recorded_result_counts_when_no_test_today() {
    let mut fixture = Fixture::new();
    fixture.recorded_hiv_result(0, HivResult::Pos);
    let status = fixture.predicates().status(fixture.visit(0)).unwrap();
    assert_eq!(status.final_hiv_status, Some(HivResult::Pos));
    assert_eq!(status.current_hiv_result, None);
    assert!(check(&fixture, NamedPredicate::KnownHivPos, 1));
}

#[test]
fn test_todays_result_wins_over_recorded_result() {
    let mut fixture = Fixture::new();
    fixture.recorded_hiv_result(0, HivResult::Neg);
    fixture.hiv_result(0, HivResult::Pos);
    assert!(check(&fixture, NamedPredicate::HivPositive, 0));
}

#[test]
fn test_microtube_until_result_today() {
    let mut fixture = Fixture::new();
    fixture.hiv_result(0, HivResult::Neg);
    assert!(!check(&fixture, NamedPredicate::RequiresMicrotube, 0));
    // a new survey year needs a new test
    assert!(check(&fixture, NamedPredicate::RequiresMicrotube, 1));
    assert!(check(&fixture, NamedPredicate::RequiresTodaysHivResult, 1));
}

#[test]
fn test_unrecognised_result_today_still_counts_for_microtube() {
    let mut fixture = Fixture::new();
    fixture.record(0, "hivresult", "hiv_result", Value::text("Declined"));
    let status = fixture.predicates().status(fixture.visit(0)).unwrap();
    assert_eq!(status.current_hiv_result, None);
    assert_eq!(status.final_hiv_status, None);
    assert!(status.todays_result_recorded);
    assert!(!check(&fixture, NamedPredicate::RequiresMicrotube, 0));

    // a blank answer is not a result
    fixture.record(1, "hivresult", "hiv_result", Value::text(" "));
    assert!(!fixture.predicates().status(fixture.visit(1)).unwrap().todays_result_recorded);
    assert!(check(&fixture, NamedPredicate::RequiresMicrotube, 1));
}

#[test]
fn test_partner_forms() {
    let mut fixture = Fixture::new();
    fixture.record(0, "sexualbehaviour", "last_year_partners", 2_i64);
    assert!(check(&fixture, NamedPredicate::RequiresRecentPartner, 0));
    assert!(check(&fixture, NamedPredicate::RequiresSecondPartnerForms, 0));
    assert!(!check(&fixture, NamedPredicate::RequiresThirdPartnerForms, 0));

    // only the answer given at this visit counts
    assert!(!check(&fixture, NamedPredicate::RequiresRecentPartner, 1));

    fixture.record(1, "sexualbehaviour", "last_year_partners", 3_i64);
    assert!(check(&fixture, NamedPredicate::RequiresThirdPartnerForms, 1));
}

#[test]
fn test_no_partners() {
    let mut fixture = Fixture::new();
    fixture.record(0, "sexualbehaviour", "last_year_partners", 0_i64);
    assert!(!check(&fixture, NamedPredicate::RequiresRecentPartner, 0));
    assert!(!check(&fixture, NamedPredicate::RequiresSecondPartnerForms, 0));
}

#[test]
fn test_linkage_to_care_for_defaulter_at_baseline() {
    let mut fixture = Fixture::new();
    assert!(!check(&fixture, NamedPredicate::RequiresHivLinkageToCare, 0));
    fixture.hiv_result(0, HivResult::Pos);
    fixture.art(0, ArtStatus::Defaulter);
    for visit in 0..3 {
        assert!(check(&fixture, NamedPredicate::RequiresHivLinkageToCare, visit));
        assert!(check(&fixture, NamedPredicate::ArtDefaulter, visit));
    }
}

#[test]
fn test_linkage_to_care_for_naive_at_baseline() {
    let mut fixture = Fixture::new();
    fixture.hiv_result(0, HivResult::Pos);
    fixture.art(0, ArtStatus::Naive);
    fixture.art(1, ArtStatus::OnArt);
    for visit in 0..3 {
        assert!(check(&fixture, NamedPredicate::RequiresHivLinkageToCare, visit));
    }
    assert!(check(&fixture, NamedPredicate::ArtNaive, 0));
    assert!(check(&fixture, NamedPredicate::OnArt, 1));
    assert!(check(&fixture, NamedPredicate::OnArt, 2));
}

#[test]
fn test_linkage_to_care_ignores_later_defaulting() {
    let mut fixture = Fixture::new();
    fixture.art(0, ArtStatus::OnArt);
    fixture.art(1, ArtStatus::Defaulter);
    assert!(!check(&fixture, NamedPredicate::RequiresHivLinkageToCare, 1));
    assert!(check(&fixture, NamedPredicate::ArtDefaulter, 1));
    assert!(!check(&fixture, NamedPredicate::ArtDefaulter, 0));
}

#[test]
fn test_naive_does_not_replace_defaulter() {
    let mut fixture = Fixture::new();
    fixture.art(0, ArtStatus::Defaulter);
    fixture.art(1, ArtStatus::Naive);
    assert!(check(&fixture, NamedPredicate::ArtDefaulter, 1));
    assert!(!check(&fixture, NamedPredicate::ArtNaive, 1));
}

#[test]
fn test_naive_first_seen_after_baseline() {
    let mut fixture = Fixture::new();
    fixture.art(1, ArtStatus::Naive);
    assert!(!check(&fixture, NamedPredicate::ArtNaive, 0));
    assert!(check(&fixture, NamedPredicate::ArtNaive, 1));
    assert!(check(&fixture, NamedPredicate::ArtNaive, 2));
    assert!(!check(&fixture, NamedPredicate::RequiresHivLinkageToCare, 2));
}

#[test]
fn test_pima_cd4_for_naive_positive() {
    let mut fixture = Fixture::new();
    fixture.art(0, ArtStatus::Naive);
    assert!(!check(&fixture, NamedPredicate::RequiresPimaCd4, 0));
    fixture.hiv_result(0, HivResult::Pos);
    assert!(check(&fixture, NamedPredicate::RequiresPimaCd4, 0));
    // naive at baseline keeps the test after starting treatment
    fixture.art(1, ArtStatus::OnArt);
    assert!(check(&fixture, NamedPredicate::RequiresPimaCd4, 1));
}

#[test]
fn test_pima_cd4_not_for_positive_on_art() {
    let mut fixture = Fixture::new();
    fixture.hiv_result(0, HivResult::Pos);
    fixture.art(0, ArtStatus::OnArt);
    assert!(!check(&fixture, NamedPredicate::RequiresPimaCd4, 0));
}

#[test]
fn test_hic_enrollment_before_last_survey() {
    let mut fixture = Fixture::new();
    assert!(!check(&fixture, NamedPredicate::RequiresHicEnrollment, 0));
    fixture.hiv_result(0, HivResult::Neg);
    assert!(check(&fixture, NamedPredicate::RequiresHicEnrollment, 0));
    assert!(check(&fixture, NamedPredicate::RequiresHicEnrollment, 1));
    // bcpp-year-3 is the last survey
    assert!(!check(&fixture, NamedPredicate::RequiresHicEnrollment, 2));
}

#[test]
fn test_hic_enrollment_once_enrolled() {
    let mut fixture = Fixture::new();
    fixture.hiv_result(0, HivResult::Neg);
    fixture.record(1, "hicenrollment", "hic_permission", Value::yes());
    assert!(check(&fixture, NamedPredicate::RequiresHicEnrollment, 0));
    assert!(!check(&fixture, NamedPredicate::RequiresHicEnrollment, 1));
    assert!(check(&fixture, NamedPredicate::IsHicEnrolled, 1));
}

#[test]
fn test_hic_enrollment_last_survey_configurable() {
    let mut fixture = Fixture::new();
    fixture.config.last_survey = "bcpp-year-2".to_string();
    fixture.hiv_result(0, HivResult::Neg);
    assert!(!check(&fixture, NamedPredicate::RequiresHicEnrollment, 1));
    assert!(check(&fixture, NamedPredicate::RequiresHicEnrollment, 2));
}

#[test]
fn test_venous_after_failed_microtube() {
    let mut fixture = Fixture::new();
    assert!(!check(&fixture, NamedPredicate::RequiresVenous, 0));
    fixture.record_panel(0, MICROTUBE, "is_drawn", Value::no());
    assert!(!check(&fixture, NamedPredicate::RequiresVenous, 0));
    fixture.record_panel(0, MICROTUBE, "reason_not_drawn", "collection_failed");
    assert!(check(&fixture, NamedPredicate::RequiresVenous, 0));
    assert!(!check(&fixture, NamedPredicate::RequiresVenous, 1));
}

#[test]
fn test_venous_ignores_other_panels() {
    let mut fixture = Fixture::new();
    fixture.record_panel(0, "Research Blood Draw", "is_drawn", Value::no());
    fixture.record_panel(0, "Research Blood Draw", "reason_not_drawn", "collection_failed");
    assert!(!check(&fixture, NamedPredicate::RequiresVenous, 0));
}

#[test]
fn test_testing_history_forms() {
    let mut fixture = Fixture::new();
    assert!(!check(&fixture, NamedPredicate::RequiresHivUntested, 0));
    assert!(!check(&fixture, NamedPredicate::RequiresHivTestReview, 0));
    fixture.record(0, "hivtestinghistory", "has_tested", Value::no());
    fixture.record(1, "hivtestinghistory", "has_record", Value::yes());
    assert!(check(&fixture, NamedPredicate::RequiresHivUntested, 0));
    assert!(!check(&fixture, NamedPredicate::RequiresHivTestReview, 0));
    assert!(check(&fixture, NamedPredicate::RequiresHivTestReview, 1));
    assert!(check(&fixture, NamedPredicate::RequiresHivUntested, 2));
}

#[test]
fn test_anonymous_member() {
    let mut fixture = Fixture::new();
    assert!(!check(&fixture, NamedPredicate::AnonymousMember, 0));
    fixture.record(1, "householdmember", "anonymous", Value::yes());
    assert!(!check(&fixture, NamedPredicate::AnonymousMember, 0));
    assert!(check(&fixture, NamedPredicate::AnonymousMember, 1));

    fixture.set_subject(Some(Gender::Male), true);
    assert!(check(&fixture, NamedPredicate::AnonymousMember, 0));
}

#[test]
fn test_same_time_visits_fail_resolution() {
    let mut fixture = Fixture::new();
    let mut clash = fixture.visit(1).clone();
    clash.visit_code = VisitCode::new("T1A").unwrap();
    fixture.store.add_visit(clash).unwrap();
    fixture.hiv_result(1, HivResult::Neg);
    let code = VisitCode::new("T1A").unwrap();
    fixture
        .store
        .record(common::entity("hivresult"), &subject(), &code, "hiv_result", HivResult::Pos)
        .unwrap();

    let predicates = fixture.predicates();
    let error = predicates
        .evaluate(NamedPredicate::RequiresPimaCd4, fixture.visit(1))
        .unwrap_err();
    assert!(error.is_data_integrity());
    assert!(!error.is_configuration());
}

#[test]
fn test_missing_entity_is_configuration_error() {
    let store = InMemoryReferences::new();
    let config = EngineConfig::default();
    let mut registry = EntityRegistry::new();
    for (logical, storage) in config.entity_registry().unwrap().iter() {
        if logical != "householdmember" {
            registry.insert(logical, storage.clone());
        }
    }
    let access = DataAccess::new(&store, registry);
    let error = Predicates::new(access, &config).err().unwrap();
    assert!(matches!(error, RuleError::Reference(_)));
    assert!(error.is_configuration());
}
