//! Named domain predicates and the registry that resolves them by name.
//!
//! Each formula is part of the trial's data-completeness contract. Missing
//! data makes a predicate false; configuration and data integrity errors
//! propagate.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crf_model::{ArtStatus, Gender, HivResult, Value};

use crate::error::RuleError;
use crate::predicates::PredicateContext;

/// Signature every named predicate shares.
pub type PredicateFn = fn(&PredicateContext<'_>) -> Result<bool, RuleError>;

/// Reason recorded on a requisition whose sample could not be collected.
pub const COLLECTION_FAILED: &str = "collection_failed";

/// Built-in named predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NamedPredicate {
    IsFemale,
    IsCircumcised,
    IsHicEnrolled,
    RequiresCircumcision,
    RequiresRecentPartner,
    RequiresSecondPartnerForms,
    RequiresThirdPartnerForms,
    RequiresVenous,
    RequiresHivUntested,
    RequiresHivTestReview,
    AnonymousMember,
    RequiresHivLinkageToCare,
    ArtDefaulter,
    ArtNaive,
    OnArt,
    RequiresTodaysHivResult,
    RequiresPimaCd4,
    KnownHivPos,
    RequiresHicEnrollment,
    RequiresMicrotube,
    HivPositive,
    RequiresRbd,
    RequiresVl,
}

impl NamedPredicate {
    pub const ALL: [NamedPredicate; 23] = [
        NamedPredicate::IsFemale,
        NamedPredicate::IsCircumcised,
        NamedPredicate::IsHicEnrolled,
        NamedPredicate::RequiresCircumcision,
        NamedPredicate::RequiresRecentPartner,
        NamedPredicate::RequiresSecondPartnerForms,
        NamedPredicate::RequiresThirdPartnerForms,
        NamedPredicate::RequiresVenous,
        NamedPredicate::RequiresHivUntested,
        NamedPredicate::RequiresHivTestReview,
        NamedPredicate::AnonymousMember,
        NamedPredicate::RequiresHivLinkageToCare,
        NamedPredicate::ArtDefaulter,
        NamedPredicate::ArtNaive,
        NamedPredicate::OnArt,
        NamedPredicate::RequiresTodaysHivResult,
        NamedPredicate::RequiresPimaCd4,
        NamedPredicate::KnownHivPos,
        NamedPredicate::RequiresHicEnrollment,
        NamedPredicate::RequiresMicrotube,
        NamedPredicate::HivPositive,
        NamedPredicate::RequiresRbd,
        NamedPredicate::RequiresVl,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            NamedPredicate::IsFemale => "is_female",
            NamedPredicate::IsCircumcised => "is_circumcised",
            NamedPredicate::IsHicEnrolled => "is_hic_enrolled",
            NamedPredicate::RequiresCircumcision => "requires_circumcision",
            NamedPredicate::RequiresRecentPartner => "requires_recent_partner",
            NamedPredicate::RequiresSecondPartnerForms => "requires_second_partner_forms",
            NamedPredicate::RequiresThirdPartnerForms => "requires_third_partner_forms",
            NamedPredicate::RequiresVenous => "requires_venous",
            NamedPredicate::RequiresHivUntested => "requires_hivuntested",
            NamedPredicate::RequiresHivTestReview => "requires_hivtestreview",
            NamedPredicate::AnonymousMember => "anonymous_member",
            NamedPredicate::RequiresHivLinkageToCare => "requires_hivlinkagetocare",
            NamedPredicate::ArtDefaulter => "art_defaulter",
            NamedPredicate::ArtNaive => "art_naive",
            NamedPredicate::OnArt => "on_art",
            NamedPredicate::RequiresTodaysHivResult => "requires_todays_hiv_result",
            NamedPredicate::RequiresPimaCd4 => "requires_pima_cd4",
            NamedPredicate::KnownHivPos => "known_hiv_pos",
            NamedPredicate::RequiresHicEnrollment => "requires_hic_enrollment",
            NamedPredicate::RequiresMicrotube => "requires_microtube",
            NamedPredicate::HivPositive => "hiv_positive",
            NamedPredicate::RequiresRbd => "requires_rbd",
            NamedPredicate::RequiresVl => "requires_vl",
        }
    }

    pub fn function(&self) -> PredicateFn {
        match self {
            NamedPredicate::IsFemale => is_female,
            NamedPredicate::IsCircumcised => is_circumcised,
            NamedPredicate::IsHicEnrolled => is_hic_enrolled,
            NamedPredicate::RequiresCircumcision => requires_circumcision,
            NamedPredicate::RequiresRecentPartner => |ctx| has_last_year_partners(ctx, 1),
            NamedPredicate::RequiresSecondPartnerForms => |ctx| has_last_year_partners(ctx, 2),
            NamedPredicate::RequiresThirdPartnerForms => |ctx| has_last_year_partners(ctx, 3),
            NamedPredicate::RequiresVenous => requires_venous,
            NamedPredicate::RequiresHivUntested => requires_hivuntested,
            NamedPredicate::RequiresHivTestReview => requires_hivtestreview,
            NamedPredicate::AnonymousMember => anonymous_member,
            NamedPredicate::RequiresHivLinkageToCare => requires_hivlinkagetocare,
            NamedPredicate::ArtDefaulter => |ctx| arv_status_is(ctx, ArtStatus::Defaulter),
            NamedPredicate::ArtNaive => |ctx| arv_status_is(ctx, ArtStatus::Naive),
            NamedPredicate::OnArt => |ctx| arv_status_is(ctx, ArtStatus::OnArt),
            NamedPredicate::RequiresTodaysHivResult => requires_todays_hiv_result,
            NamedPredicate::RequiresPimaCd4 => requires_pima_cd4,
            NamedPredicate::KnownHivPos => known_hiv_pos,
            NamedPredicate::RequiresHicEnrollment => requires_hic_enrollment,
            NamedPredicate::RequiresMicrotube => requires_microtube,
            NamedPredicate::HivPositive | NamedPredicate::RequiresRbd | NamedPredicate::RequiresVl => {
                hiv_positive
            }
        }
    }

    pub fn evaluate(&self, context: &PredicateContext<'_>) -> Result<bool, RuleError> {
        (self.function())(context)
    }
}

impl fmt::Display for NamedPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NamedPredicate {
    type Err = String;

    /// Accepts `requires_pima_cd4` and `func_requires_pima_cd4`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        let name = name.strip_prefix("func_").unwrap_or(&name);
        NamedPredicate::ALL
            .into_iter()
            .find(|predicate| predicate.name() == name)
            .ok_or_else(|| format!("Unknown predicate: {s}"))
    }
}

/// Name to function table for predicates referenced by rules.
///
/// Built once; rule engines validate every referenced name against it
/// before any evaluation.
#[derive(Clone)]
pub struct PredicateRegistry {
    functions: BTreeMap<String, PredicateFn>,
}

impl Default for PredicateRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PredicateRegistry {
    pub fn empty() -> Self {
        Self {
            functions: BTreeMap::new(),
        }
    }

    /// Every [`NamedPredicate`].
    pub fn builtin() -> Self {
        let functions = NamedPredicate::ALL
            .into_iter()
            .map(|predicate| (predicate.name().to_string(), predicate.function()))
            .collect();
        Self { functions }
    }

    /// Add a predicate of the same shape as the built-ins.
    pub fn register(&mut self, name: &str, function: PredicateFn) -> Result<(), RuleError> {
        let key = normalize(name);
        if self.functions.contains_key(&key) {
            return Err(RuleError::DuplicatePredicate { name: key });
        }
        self.functions.insert(key, function);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<PredicateFn, RuleError> {
        self.functions
            .get(&normalize(name))
            .copied()
            .ok_or_else(|| RuleError::UnknownPredicate {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(&normalize(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

fn normalize(name: &str) -> String {
    let name = name.trim().to_ascii_lowercase();
    match name.strip_prefix("func_") {
        Some(stripped) => stripped.to_string(),
        None => name,
    }
}

fn gender(context: &PredicateContext<'_>) -> Option<Gender> {
    context.subject().and_then(|subject| subject.gender)
}

fn is_female(context: &PredicateContext<'_>) -> Result<bool, RuleError> {
    Ok(gender(context) == Some(Gender::Female))
}

fn is_circumcised(context: &PredicateContext<'_>) -> Result<bool, RuleError> {
    context.predicates().is_circumcised(context.visit())
}

fn is_hic_enrolled(context: &PredicateContext<'_>) -> Result<bool, RuleError> {
    context.predicates().is_hic_enrolled(context.visit())
}

fn requires_circumcision(context: &PredicateContext<'_>) -> Result<bool, RuleError> {
    if gender(context) != Some(Gender::Male) {
        return Ok(false);
    }
    Ok(!is_circumcised(context)?)
}

/// Partners in the last year, as reported at this visit; absent is zero.
fn has_last_year_partners(context: &PredicateContext<'_>, count: i64) -> Result<bool, RuleError> {
    let query = context
        .query("sexualbehaviour", "last_year_partners")
        .at(context.visit().report_datetime);
    let partners = context
        .access()
        .latest(&query)?
        .and_then(|value| value.as_integer())
        .unwrap_or(0);
    Ok(partners >= count)
}

fn requires_venous(context: &PredicateContext<'_>) -> Result<bool, RuleError> {
    let panel = context.predicates().microtube_panel().clone();
    let at = context.visit().report_datetime;
    let access = context.access();
    let not_drawn = access.exists(
        &context
            .query("subjectrequisition", "is_drawn")
            .at(at)
            .panel(panel.clone()),
        &Value::no(),
    )?;
    if !not_drawn {
        return Ok(false);
    }
    Ok(access.exists(
        &context
            .query("subjectrequisition", "reason_not_drawn")
            .at(at)
            .panel(panel),
        &Value::text(COLLECTION_FAILED),
    )?)
}

fn requires_hivuntested(context: &PredicateContext<'_>) -> Result<bool, RuleError> {
    let query = context
        .query("hivtestinghistory", "has_tested")
        .at_or_before(context.visit().report_datetime);
    Ok(context.access().exists(&query, &Value::no())?)
}

fn requires_hivtestreview(context: &PredicateContext<'_>) -> Result<bool, RuleError> {
    context
        .predicates()
        .recorded_yes("hivtestinghistory", "has_record", context.visit())
}

/// Anonymous consent on the subject record, or an anonymous household
/// membership recorded at or before the visit.
fn anonymous_member(context: &PredicateContext<'_>) -> Result<bool, RuleError> {
    if context.subject().is_some_and(|subject| subject.anonymous) {
        return Ok(true);
    }
    context
        .predicates()
        .recorded_yes("householdmember", "anonymous", context.visit())
}

fn requires_hivlinkagetocare(context: &PredicateContext<'_>) -> Result<bool, RuleError> {
    let status = context.status()?;
    Ok(status.defaulter_at_baseline || status.naive_at_baseline)
}

fn arv_status_is(context: &PredicateContext<'_>, art: ArtStatus) -> Result<bool, RuleError> {
    Ok(context.status()?.final_arv_status == Some(art))
}

fn requires_todays_hiv_result(context: &PredicateContext<'_>) -> Result<bool, RuleError> {
    Ok(!context.status()?.is_positive())
}

fn requires_pima_cd4(context: &PredicateContext<'_>) -> Result<bool, RuleError> {
    let status = context.status()?;
    Ok(status.is_positive()
        && (status.final_arv_status == Some(ArtStatus::Naive) || status.naive_at_baseline))
}

fn known_hiv_pos(context: &PredicateContext<'_>) -> Result<bool, RuleError> {
    Ok(context.status()?.known_positive)
}

/// Not offered in the last survey.
fn requires_hic_enrollment(context: &PredicateContext<'_>) -> Result<bool, RuleError> {
    if context.visit().survey_schedule == context.predicates().last_survey() {
        return Ok(false);
    }
    if context.status()?.final_hiv_status != Some(HivResult::Neg) {
        return Ok(false);
    }
    Ok(!is_hic_enrolled(context)?)
}

/// Any answer on today's test counts, recognised result or not.
fn requires_microtube(context: &PredicateContext<'_>) -> Result<bool, RuleError> {
    let status = context.status()?;
    Ok(!status.is_positive() && !status.todays_result_recorded)
}

fn hiv_positive(context: &PredicateContext<'_>) -> Result<bool, RuleError> {
    Ok(context.status()?.is_positive())
}
