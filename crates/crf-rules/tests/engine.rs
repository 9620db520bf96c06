#![allow(missing_docs)]

mod common;

use std::thread;

use common::{APP_LABEL, Fixture, subject, target};
use crf_model::{ArtStatus, EntityName, Gender, HivResult, RequiredState, Value, VisitCode};
use crf_rules::{
    Predicate, PredicateContext, PredicateRegistry, Rule, RuleEngine, RuleError, RuleGroup,
    RuleRegistry, Targets, bcpp_registry,
};

const REQUIRED: Option<RequiredState> = Some(RequiredState::Required);
const NOT_REQUIRED: Option<RequiredState> = Some(RequiredState::NotRequired);

fn always(_: &PredicateContext<'_>) -> Result<bool, RuleError> {
    Ok(true)
}

fn functions() -> PredicateRegistry {
    let mut functions = PredicateRegistry::builtin();
    functions.register("always", always).unwrap();
    functions
}

fn conflicting_group(name: &str, first: RequiredState) -> RuleGroup {
    let targets = || Targets::crfs(APP_LABEL, &["pimacd4"]).unwrap();
    let (rule_a, rule_b) = if first == RequiredState::Required {
        (
            Rule::required_when("a", Predicate::custom("always"), targets()),
            Rule::not_required_when("b", Predicate::custom("always"), targets()),
        )
    } else {
        (
            Rule::not_required_when("a", Predicate::custom("always"), targets()),
            Rule::required_when("b", Predicate::custom("always"), targets()),
        )
    };
    RuleGroup::crf(name, APP_LABEL)
        .source("hivresult")
        .rule(rule_a)
        .rule(rule_b)
        .build()
        .unwrap()
}

#[test]
fn test_last_rule_wins_within_group() {
    let fixture = Fixture::new();
    let mut registry = RuleRegistry::new();
    registry
        .register(conflicting_group("conflict", RequiredState::Required))
        .unwrap();
    let engine = RuleEngine::with_functions(registry, fixture.predicates(), functions()).unwrap();

    let outcome = engine.evaluate("conflict", fixture.visit(0)).unwrap();
    assert_eq!(outcome.get(&target("pimacd4")), NOT_REQUIRED);
    assert_eq!(outcome.fired.len(), 2);
    assert!(outcome.fired.iter().all(|fired| fired.result));
}

#[test]
fn test_later_group_wins_for_source() {
    let fixture = Fixture::new();
    let mut registry = RuleRegistry::new();
    registry
        .register(conflicting_group("first", RequiredState::Required))
        .unwrap();
    registry
        .register(conflicting_group("second", RequiredState::NotRequired))
        .unwrap();
    let engine = RuleEngine::with_functions(registry, fixture.predicates(), functions()).unwrap();

    let visit = fixture.visit(0);
    assert_eq!(
        engine.evaluate("first", visit).unwrap().get(&target("pimacd4")),
        NOT_REQUIRED
    );
    let merged = engine.evaluate_source("hivresult", visit).unwrap();
    assert_eq!(merged.get(&target("pimacd4")), REQUIRED);
    let groups: Vec<_> = merged.fired.iter().map(|f| f.group.as_str()).collect();
    assert_eq!(groups, ["first", "first", "second", "second"]);
}

#[test]
fn test_unknown_predicate_rejected_at_construction() {
    let fixture = Fixture::new();
    let mut registry = RuleRegistry::new();
    registry
        .register(conflicting_group("conflict", RequiredState::Required))
        .unwrap();
    let error = RuleEngine::new(registry, fixture.predicates()).err().unwrap();
    assert!(matches!(error, RuleError::UnknownPredicate { .. }));
    assert!(error.is_configuration());
}

#[test]
fn test_unknown_source_rejected_at_construction() {
    let fixture = Fixture::new();
    let mut registry = RuleRegistry::new();
    registry
        .register(
            RuleGroup::crf("pima", APP_LABEL)
                .source("pimacd4")
                .rule(Rule::required_when(
                    "female",
                    Predicate::custom("is_female"),
                    Targets::crfs(APP_LABEL, &["pregnancy"]).unwrap(),
                ))
                .build()
                .unwrap(),
        )
        .unwrap();
    let error = RuleEngine::new(registry, fixture.predicates()).err().unwrap();
    assert!(matches!(error, RuleError::Reference(_)));
    assert!(error.is_configuration());
}

#[test]
fn test_group_lookup_errors() {
    let fixture = Fixture::new();
    let engine = fixture.engine();
    let visit = fixture.visit(0);
    assert!(matches!(
        engine.evaluate("base_crf", visit),
        Err(RuleError::AbstractRuleGroup { .. })
    ));
    assert!(matches!(
        engine.evaluate("no_such_group", visit),
        Err(RuleError::UnknownRuleGroup { .. })
    ));

    let mut registry = bcpp_registry(APP_LABEL).unwrap();
    let duplicate = registry.get("circumcision").unwrap().clone();
    assert!(matches!(
        registry.register(duplicate),
        Err(RuleError::DuplicateRuleGroup { .. })
    ));
}

#[test]
fn test_subject_visit_for_new_male() {
    let fixture = Fixture::new();
    let engine = fixture.engine();
    let visit = fixture.visit(0);
    let outcome = engine.evaluate("subject_visit", visit).unwrap();

    for model in ["circumcision", "circumcised", "uncircumcised"] {
        assert_eq!(outcome.get(&target(model)), REQUIRED, "{model}");
    }
    for model in ["reproductivehealth", "pregnancy", "nonpregnancy"] {
        assert_eq!(outcome.get(&target(model)), NOT_REQUIRED, "{model}");
    }
    for model in ["hivtestreview", "hivtestinghistory", "hivresult", "hivuntested"] {
        assert_eq!(outcome.get(&target(model)), REQUIRED, "{model}");
    }
    assert_eq!(outcome.get(&target("pimacd4")), NOT_REQUIRED);
    assert_eq!(outcome.get(&target("immigrationstatus")), NOT_REQUIRED);
    assert_eq!(outcome.get(&target("hivlinkagetocare")), NOT_REQUIRED);

    let rules: Vec<_> = outcome.fired.iter().map(|f| f.rule.as_str()).collect();
    assert_eq!(
        rules,
        [
            "circumcision",
            "gender_menopause",
            "known_pos",
            "pima_cd4",
            "anonymous_forms",
            "require_hivlinkagetocare"
        ]
    );
    assert_eq!(outcome.fired[2].predicate, "known_hiv_pos");

    let entries = outcome.entries(visit);
    assert_eq!(entries.len(), 16);
    assert!(entries.iter().all(|entry| entry.visit_code == visit.visit_code));
}

#[test]
fn test_known_positive_skips_testing_forms() {
    let mut fixture = Fixture::new();
    fixture.hiv_result(0, HivResult::Pos);
    let engine = fixture.engine();
    let outcome = engine.evaluate("subject_visit", fixture.visit(1)).unwrap();
    for model in ["hivtestreview", "hivtested", "hivresult"] {
        assert_eq!(outcome.get(&target(model)), NOT_REQUIRED, "{model}");
    }
}

#[test]
fn test_visit_requisitions_merge_with_visit_forms() {
    let fixture = Fixture::new();
    let engine = fixture.engine();
    let outcome = engine.evaluate_source("subjectvisit", fixture.visit(0)).unwrap();
    assert_eq!(outcome.get("Microtube"), REQUIRED);
    assert_eq!(outcome.get("Viral Load"), NOT_REQUIRED);
    assert_eq!(outcome.get("Research Blood Draw"), NOT_REQUIRED);
    assert_eq!(outcome.get(&target("circumcision")), REQUIRED);
}

#[test]
fn test_indeterminate_result_needs_elisa() {
    let mut fixture = Fixture::new();
    fixture.hiv_result(0, HivResult::Ind);
    let engine = fixture.engine();
    let visit = fixture.visit(0);

    let crfs = engine.evaluate("hiv_result_crf", visit).unwrap();
    assert_eq!(crfs.get(&target("elisahivresult")), REQUIRED);
    assert_eq!(crfs.get(&target("pimacd4")), NOT_REQUIRED);
    assert_eq!(crfs.get(&target("hicenrollment")), NOT_REQUIRED);
    assert_eq!(crfs.get(&target("hivrelatedillness")), NOT_REQUIRED);

    let panels = engine.evaluate("hiv_result_requisition", visit).unwrap();
    assert_eq!(panels.get("ELISA"), REQUIRED);
    assert_eq!(panels.get("Microtube"), NOT_REQUIRED);
    assert_eq!(panels.get("Venous (HIV)"), NOT_REQUIRED);
}

#[test]
fn test_positive_result_requisitions() {
    let mut fixture = Fixture::new();
    fixture.hiv_result(0, HivResult::Pos);
    let engine = fixture.engine();
    let outcome = engine
        .evaluate_source("bcpp_subject.hivresult", fixture.visit(0))
        .unwrap();
    assert_eq!(outcome.get("Research Blood Draw"), REQUIRED);
    assert_eq!(outcome.get("Viral Load"), REQUIRED);
    assert_eq!(outcome.get("ELISA"), NOT_REQUIRED);
    assert_eq!(outcome.get(&target("hivrelatedillness")), REQUIRED);
}

#[test]
fn test_source_resolves_through_storage_overrides() {
    let mut fixture = Fixture::new();
    fixture
        .config
        .entities
        .insert("hivresult".to_string(), "legacy.hivresult_v2".to_string());
    let code = fixture.visit(0).visit_code.clone();
    fixture
        .store
        .record(
            EntityName::new("legacy.hivresult_v2").unwrap(),
            &subject(),
            &code,
            "hiv_result",
            HivResult::Pos,
        )
        .unwrap();
    let engine = fixture.engine();
    let visit = fixture.visit(0);

    let outcome = engine.evaluate_source("legacy.hivresult_v2", visit).unwrap();
    let groups: Vec<_> = outcome.fired.iter().map(|f| f.group.as_str()).collect();
    assert!(groups.contains(&"hiv_result_crf"));
    assert!(groups.contains(&"hiv_result_requisition"));
    assert_eq!(outcome.get("Research Blood Draw"), REQUIRED);
    assert_eq!(engine.evaluate_source("hivresult", visit).unwrap(), outcome);

    let error = engine
        .evaluate_source("bcpp_subject.hivresult", visit)
        .unwrap_err();
    assert!(matches!(error, RuleError::Reference(_)));
    assert!(error.is_configuration());
}

#[test]
fn test_field_predicates_read_source_form() {
    let mut fixture = Fixture::new();
    fixture.record(0, "resourceutilization", "out_patient", Value::yes());
    fixture.record(0, "resourceutilization", "hospitalized", 0_i64);
    let engine = fixture.engine();

    let outcome = engine.evaluate("resource_utilization", fixture.visit(0)).unwrap();
    assert_eq!(outcome.get(&target("outpatientcare")), REQUIRED);
    assert_eq!(outcome.get(&target("hospitaladmission")), NOT_REQUIRED);

    // nothing answered at this visit
    let outcome = engine.evaluate("resource_utilization", fixture.visit(1)).unwrap();
    assert_eq!(outcome.get(&target("outpatientcare")), NOT_REQUIRED);
    assert_eq!(outcome.get(&target("hospitaladmission")), REQUIRED);
}

#[test]
fn test_pair_predicate_falls_back_to_subject_gender() {
    let mut fixture = Fixture::new();
    fixture.record(0, "sexualbehaviour", "ever_sex", Value::yes());
    let outcome = fixture
        .engine()
        .evaluate("sexual_behaviour", fixture.visit(0))
        .unwrap();
    assert_eq!(outcome.get(&target("reproductivehealth")), NOT_REQUIRED);

    fixture.set_subject(Some(Gender::Female), false);
    let outcome = fixture
        .engine()
        .evaluate("sexual_behaviour", fixture.visit(0))
        .unwrap();
    assert_eq!(outcome.get(&target("reproductivehealth")), REQUIRED);
    assert_eq!(outcome.get(&target("pregnancy")), REQUIRED);
}

#[test]
fn test_pair_predicate_false_when_field_missing() {
    let mut fixture = Fixture::new();
    fixture.set_subject(Some(Gender::Female), false);
    let outcome = fixture
        .engine()
        .evaluate("sexual_behaviour", fixture.visit(0))
        .unwrap();
    assert_eq!(outcome.get(&target("reproductivehealth")), NOT_REQUIRED);
}

#[test]
fn test_reevaluation_is_idempotent() {
    let mut fixture = Fixture::new();
    fixture.hiv_result(0, HivResult::Neg);
    fixture.record(1, "hivtestinghistory", "has_tested", Value::yes());
    let engine = fixture.engine();
    for visit in &fixture.visits {
        for group in ["subject_visit", "hiv_testing_history", "hiv_result_crf"] {
            let first = engine.evaluate(group, visit).unwrap();
            let second = engine.evaluate(group, visit).unwrap();
            assert_eq!(first, second);
        }
    }
}

#[test]
fn test_concurrent_evaluation_matches_sequential() {
    let mut fixture = Fixture::new();
    fixture.hiv_result(0, HivResult::Pos);
    fixture.art(0, ArtStatus::Naive);
    let engine = fixture.engine();
    let sequential: Vec<_> = fixture
        .visits
        .iter()
        .map(|visit| engine.evaluate_source("subjectvisit", visit).unwrap())
        .collect();

    let concurrent: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = fixture
            .visits
            .iter()
            .map(|visit| {
                let engine = &engine;
                scope.spawn(move || engine.evaluate_source("subjectvisit", visit).unwrap())
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });
    assert_eq!(sequential, concurrent);
}

#[test]
fn test_data_integrity_error_propagates() {
    let mut fixture = Fixture::new();
    let mut clash = fixture.visit(0).clone();
    clash.visit_code = VisitCode::new("T0A").unwrap();
    fixture.store.add_visit(clash).unwrap();
    fixture.hiv_result(0, HivResult::Neg);
    fixture
        .store
        .record(
            common::entity("hivresult"),
            &common::subject(),
            &VisitCode::new("T0A").unwrap(),
            "hiv_result",
            HivResult::Pos,
        )
        .unwrap();

    let error = fixture
        .engine()
        .evaluate("subject_visit", fixture.visit(0))
        .unwrap_err();
    assert!(error.is_data_integrity());
}
