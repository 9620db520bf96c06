//! BCPP subject rule groups.
//!
//! Groups register in the order listed here, which is also the merge order
//! of [`RuleEngine::evaluate_source`](crate::RuleEngine::evaluate_source).
//! Two overlaps rely on it: `hiv_testing_history_crf` registers after
//! `hiv_testing_history` and decides `hivcareadherence` and
//! `hivmedicalcare` when both run for the same source.

use crf_model::{Gender, HivResult, Value, NO, NOT_SURE, YES};

use crate::error::RuleError;
use crate::named::NamedPredicate;
use crate::predicate::{Operator, Predicate};
use crate::registry::RuleRegistry;
use crate::rule::{Rule, RuleGroup, RuleGroupBuilder, Targets};

pub const MICROTUBE_PANEL: &str = "Microtube";
pub const RESEARCH_BLOOD_DRAW_PANEL: &str = "Research Blood Draw";
pub const VIRAL_LOAD_PANEL: &str = "Viral Load";
pub const ELISA_PANEL: &str = "ELISA";
pub const VENOUS_PANEL: &str = "Venous (HIV)";

/// Form that carries lab requisitions.
pub const REQUISITION_MODEL: &str = "subjectrequisition";

/// Sources sharing the pima CD4 / HIC enrollment rules and the HIV panel
/// requisitions, with the names of their two concrete groups.
const HIV_RESULT_FAMILY: &[(&str, &str, &str)] = &[
    ("hivtestinghistory", "hiv_testing_history_crf", "hiv_testing_history_requisition"),
    ("hivtestreview", "hiv_test_review_crf", "hiv_test_review_requisition"),
    (
        "hivresultdocumentation",
        "hiv_result_documentation_crf",
        "hiv_result_documentation_requisition",
    ),
    ("elisahivresult", "elisa_hiv_result_crf", "elisa_hiv_result_requisition"),
];

fn named(predicate: NamedPredicate) -> Predicate {
    Predicate::named(predicate)
}

fn eq(field: &str, value: impl Into<Value>) -> Predicate {
    Predicate::field(field, Operator::Eq, value)
}

/// Every BCPP group, abstract bases included, registered under `app_label`.
pub fn bcpp_registry(app_label: &str) -> Result<RuleRegistry, RuleError> {
    let mut registry = RuleRegistry::new();
    let base_crf = base_crf_group(app_label)?;
    let base_requisition = base_requisition_group(app_label)?;

    registry.register(subject_visit_group(app_label)?)?;
    registry.register(visit_requisition_group(app_label)?)?;
    registry.register(resource_utilization_group(app_label)?)?;
    registry.register(hiv_testing_history_group(app_label)?)?;
    registry.register(review_positive_group(app_label)?)?;
    registry.register(hiv_care_adherence_group(app_label)?)?;
    registry.register(sexual_behaviour_group(app_label)?)?;
    registry.register(circumcision_group(app_label)?)?;
    registry.register(reproductive_group(app_label)?)?;
    registry.register(medical_diagnoses_group(app_label)?)?;

    registry.register(
        RuleGroup::crf("hiv_result_crf", app_label)
            .source("hivresult")
            .include(&base_crf)
            .rule(Rule::required_when(
                "serve_sti_form",
                named(NamedPredicate::HivPositive),
                Targets::crfs(app_label, &["hivrelatedillness"])?,
            ))
            .rule(Rule::required_when(
                "elisa_result",
                eq("hiv_result", HivResult::Ind),
                Targets::crfs(app_label, &["elisahivresult"])?,
            ))
            .build()?,
    )?;
    registry.register(
        requisition(app_label, "hiv_result_requisition")
            .source("hivresult")
            .include(&base_requisition)
            .rule(Rule::required_when(
                "elisa_for_ind",
                eq("hiv_result", HivResult::Ind),
                Targets::panels(&[ELISA_PANEL])?,
            ))
            .build()?,
    )?;

    for (source, crf_group, requisition_group) in HIV_RESULT_FAMILY {
        let mut crfs = RuleGroup::crf(*crf_group, app_label)
            .source(*source)
            .include(&base_crf);
        if *source == "hivtestinghistory" {
            crfs = crfs.rule(Rule::required_when(
                "serve_hiv_care_adherence",
                eq("verbal_hiv_result", HivResult::Pos),
                Targets::crfs(app_label, &["hivcareadherence", "hivmedicalcare"])?,
            ));
        }
        registry.register(crfs.build()?)?;
        registry.register(
            requisition(app_label, requisition_group)
                .source(*source)
                .include(&base_requisition)
                .build()?,
        )?;
    }

    registry.register(
        RuleGroup::crf("subject_requisition_crf", app_label)
            .source(REQUISITION_MODEL)
            .include(&base_crf)
            .build()?,
    )?;

    registry.register(base_crf)?;
    registry.register(base_requisition)?;
    Ok(registry)
}

fn requisition(app_label: &str, name: &str) -> RuleGroupBuilder {
    RuleGroup::requisition(name, app_label, format!("{app_label}.{REQUISITION_MODEL}"))
}

/// Pima CD4 and HIC enrollment, shared by the HIV result family.
pub fn base_crf_group(app_label: &str) -> Result<RuleGroup, RuleError> {
    RuleGroup::crf("base_crf", app_label)
        .abstract_group()
        .rule(Rule::required_when(
            "pima_cd4",
            named(NamedPredicate::RequiresPimaCd4),
            Targets::crfs(app_label, &["pimacd4"])?,
        ))
        .rule(Rule::required_when(
            "hic_enrollment",
            named(NamedPredicate::RequiresHicEnrollment),
            Targets::crfs(app_label, &["hicenrollment"])?,
        ))
        .build()
}

/// Research blood draw and viral load for positives, microtube until a
/// result exists, venous draw after a failed microtube collection.
pub fn base_requisition_group(app_label: &str) -> Result<RuleGroup, RuleError> {
    requisition(app_label, "base_requisition")
        .abstract_group()
        .rule(Rule::required_when(
            "rbd",
            named(NamedPredicate::RequiresRbd),
            Targets::panels(&[RESEARCH_BLOOD_DRAW_PANEL])?,
        ))
        .rule(Rule::required_when(
            "vl_for_pos",
            named(NamedPredicate::RequiresVl),
            Targets::panels(&[VIRAL_LOAD_PANEL])?,
        ))
        .rule(Rule::required_when(
            "microtube",
            named(NamedPredicate::RequiresMicrotube),
            Targets::panels(&[MICROTUBE_PANEL])?,
        ))
        .rule(Rule::required_when(
            "venous",
            named(NamedPredicate::RequiresVenous),
            Targets::panels(&[VENOUS_PANEL])?,
        ))
        .build()
}

fn subject_visit_group(app_label: &str) -> Result<RuleGroup, RuleError> {
    RuleGroup::crf("subject_visit", app_label)
        .rule(Rule::required_when(
            "circumcision",
            named(NamedPredicate::RequiresCircumcision),
            Targets::crfs(app_label, &["circumcision", "circumcised", "uncircumcised"])?,
        ))
        .rule(Rule::required_when(
            "gender_menopause",
            named(NamedPredicate::IsFemale),
            Targets::crfs(app_label, &["reproductivehealth", "pregnancy", "nonpregnancy"])?,
        ))
        .rule(Rule::not_required_when(
            "known_pos",
            named(NamedPredicate::KnownHivPos),
            Targets::crfs(
                app_label,
                &[
                    "hivtestreview",
                    "hivtested",
                    "hivtestinghistory",
                    "hivresultdocumentation",
                    "hivresult",
                    "hivuntested",
                ],
            )?,
        ))
        .rule(Rule::required_when(
            "pima_cd4",
            named(NamedPredicate::RequiresPimaCd4),
            Targets::crfs(app_label, &["pimacd4"])?,
        ))
        .rule(Rule::required_when(
            "anonymous_forms",
            named(NamedPredicate::AnonymousMember),
            Targets::crfs(app_label, &["immigrationstatus", "accesstocare"])?,
        ))
        .rule(Rule::required_when(
            "require_hivlinkagetocare",
            named(NamedPredicate::RequiresHivLinkageToCare),
            Targets::crfs(app_label, &["hivlinkagetocare"])?,
        ))
        .build()
}

fn visit_requisition_group(app_label: &str) -> Result<RuleGroup, RuleError> {
    requisition(app_label, "visit_requisition")
        .rule(Rule::required_when(
            "require_microtube",
            named(NamedPredicate::RequiresMicrotube),
            Targets::panels(&[MICROTUBE_PANEL])?,
        ))
        .rule(Rule::required_when(
            "vl_for_pos",
            named(NamedPredicate::RequiresVl),
            Targets::panels(&[VIRAL_LOAD_PANEL])?,
        ))
        .rule(Rule::required_when(
            "rbd",
            named(NamedPredicate::RequiresRbd),
            Targets::panels(&[RESEARCH_BLOOD_DRAW_PANEL])?,
        ))
        .build()
}

fn resource_utilization_group(app_label: &str) -> Result<RuleGroup, RuleError> {
    RuleGroup::crf("resource_utilization", app_label)
        .source("resourceutilization")
        .rule(Rule::required_when(
            "out_patient",
            eq("out_patient", YES),
            Targets::crfs(app_label, &["outpatientcare"])?,
        ))
        .rule(Rule::not_required_when(
            "hospitalized",
            eq("hospitalized", 0_i64),
            Targets::crfs(app_label, &["hospitaladmission"])?,
        ))
        .build()
}

fn hiv_testing_history_group(app_label: &str) -> Result<RuleGroup, RuleError> {
    RuleGroup::crf("hiv_testing_history", app_label)
        .source("hivtestinghistory")
        .rule(Rule::required_when(
            "has_record",
            named(NamedPredicate::RequiresHivTestReview),
            Targets::crfs(app_label, &["hivtestreview"])?,
        ))
        .rule(Rule::required_when(
            "has_tested",
            eq("has_tested", YES),
            Targets::crfs(app_label, &["hivtested"])?,
        ))
        .rule(Rule::required_when(
            "hiv_untested",
            named(NamedPredicate::RequiresHivUntested),
            Targets::crfs(app_label, &["hivuntested"])?,
        ))
        .rule(Rule::required_when(
            "other_record",
            Predicate::pair("has_tested", "other_record", |tested, other| {
                tested.is_yes() && other.is_yes()
            }),
            Targets::crfs(app_label, &["hivresultdocumentation"])?,
        ))
        .rule(Rule::required_when(
            "require_todays_hiv_result",
            named(NamedPredicate::RequiresTodaysHivResult),
            Targets::crfs(app_label, &["hivresult"])?,
        ))
        .rule(Rule::required_when(
            "verbal_hiv_result_hiv_care_baseline",
            eq("verbal_hiv_result", HivResult::Pos),
            Targets::crfs(
                app_label,
                &[
                    "hivcareadherence",
                    "positiveparticipant",
                    "hivmedicalcare",
                    "hivhealthcarecosts",
                ],
            )?,
        ))
        .rule(Rule::required_when(
            "verbal_response",
            eq("verbal_hiv_result", HivResult::Neg),
            Targets::crfs(app_label, &["stigma", "stigmaopinion"])?,
        ))
        .build()
}

fn review_positive_group(app_label: &str) -> Result<RuleGroup, RuleError> {
    RuleGroup::crf("review_positive", app_label)
        .source("hivtestreview")
        .rule(Rule::not_required_when(
            "recorded_hiv_result",
            named(NamedPredicate::RequiresTodaysHivResult),
            Targets::crfs(
                app_label,
                &["hivcareadherence", "hivmedicalcare", "positiveparticipant"],
            )?,
        ))
        .rule(Rule::required_when(
            "recorded_hivresult",
            eq("recorded_hiv_result", HivResult::Neg),
            Targets::crfs(app_label, &["stigma", "stigmaopinion"])?,
        ))
        .rule(Rule::required_when(
            "require_todays_hiv_result",
            named(NamedPredicate::RequiresTodaysHivResult),
            Targets::crfs(app_label, &["hivresult"])?,
        ))
        .build()
}

fn hiv_care_adherence_group(app_label: &str) -> Result<RuleGroup, RuleError> {
    RuleGroup::crf("hiv_care_adherence", app_label)
        .source("hivcareadherence")
        .rule(Rule::required_when(
            "medical_care",
            eq("medical_care", YES),
            Targets::crfs(app_label, &["hivmedicalcare"])?,
        ))
        .rule(Rule::required_when(
            "pima_cd4",
            named(NamedPredicate::RequiresPimaCd4),
            Targets::crfs(app_label, &["pimacd4"])?,
        ))
        .rule(Rule::required_when(
            "require_todays_hiv_result",
            named(NamedPredicate::RequiresTodaysHivResult),
            Targets::crfs(app_label, &["hivresult"])?,
        ))
        .build()
}

fn sexual_behaviour_group(app_label: &str) -> Result<RuleGroup, RuleError> {
    RuleGroup::crf("sexual_behaviour", app_label)
        .source("sexualbehaviour")
        .rule(Rule::required_when(
            "partners",
            named(NamedPredicate::RequiresRecentPartner),
            Targets::crfs(app_label, &["recentpartner"])?,
        ))
        .rule(Rule::required_when(
            "last_year_partners",
            named(NamedPredicate::RequiresSecondPartnerForms),
            Targets::crfs(app_label, &["secondpartner"])?,
        ))
        .rule(Rule::required_when(
            "more_partners",
            named(NamedPredicate::RequiresThirdPartnerForms),
            Targets::crfs(app_label, &["thirdpartner"])?,
        ))
        .rule(Rule::required_when(
            "ever_sex",
            Predicate::pair("ever_sex", "gender", |ever_sex, gender| {
                ever_sex.is_yes() && gender.as_gender() == Some(Gender::Female)
            }),
            Targets::crfs(app_label, &["reproductivehealth", "pregnancy", "nonpregnancy"])?,
        ))
        .build()
}

fn circumcision_group(app_label: &str) -> Result<RuleGroup, RuleError> {
    RuleGroup::crf("circumcision", app_label)
        .source("circumcision")
        .rule(Rule::required_when(
            "circumcised",
            eq("circumcised", YES),
            Targets::crfs(app_label, &["circumcised"])?,
        ))
        .rule(Rule::required_when(
            "uncircumcised",
            eq("circumcised", NO),
            Targets::crfs(app_label, &["uncircumcised"])?,
        ))
        .build()
}

fn reproductive_group(app_label: &str) -> Result<RuleGroup, RuleError> {
    RuleGroup::crf("reproductive", app_label)
        .source("reproductivehealth")
        .rule(Rule::required_when(
            "currently_pregnant",
            Predicate::pair("currently_pregnant", "menopause", |pregnant, menopause| {
                pregnant.is_yes() || (pregnant.matches(&Value::text(NOT_SURE)) && menopause.is_no())
            }),
            Targets::crfs(app_label, &["pregnancy"])?,
        ))
        .rule(Rule::required_when(
            "non_pregnant",
            Predicate::pair("currently_pregnant", "menopause", |pregnant, menopause| {
                pregnant.is_no() && menopause.is_no()
            }),
            Targets::crfs(app_label, &["nonpregnancy"])?,
        ))
        .build()
}

/// Heart attack, cancer and TB forms follow their record flags.
fn medical_diagnoses_group(app_label: &str) -> Result<RuleGroup, RuleError> {
    RuleGroup::crf("medical_diagnoses", app_label)
        .source("medicaldiagnoses")
        .rule(Rule::required_when(
            "heart_attack_record",
            eq("heart_attack_record", YES),
            Targets::crfs(app_label, &["heartattack"])?,
        ))
        .rule(Rule::required_when(
            "cancer_record",
            eq("cancer_record", YES),
            Targets::crfs(app_label, &["cancer"])?,
        ))
        .rule(Rule::required_when(
            "tb_record_tuberculosis",
            eq("tb_record", YES),
            Targets::crfs(app_label, &["tuberculosis"])?,
        ))
        .build()
}
