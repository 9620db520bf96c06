//! The predicate library and its per-pass evaluation context.

use crf_model::{PanelName, Subject, Value, Visit};
use crf_reference::{DataAccess, EngineConfig, Query};

use crate::error::RuleError;
use crate::named::NamedPredicate;
use crate::status::{EvaluationScope, StatusResolver, StatusSnapshot};

/// Logical name of the visit form; source of visit-triggered rule groups.
pub const VISIT_MODEL: &str = "subjectvisit";

/// Entities the named predicates read, checked when the library is built.
pub const PREDICATE_ENTITIES: &[&str] = &[
    "circumcision",
    "hicenrollment",
    "hivtestinghistory",
    "hivtestreview",
    "hivresult",
    "hivcareadherence",
    "subjectrequisition",
    "sexualbehaviour",
    "householdmember",
    VISIT_MODEL,
];

/// Shared predicate library.
///
/// Built once from the data access facade and the engine configuration,
/// then handed to the rule engine. Holds no per-evaluation state.
pub struct Predicates<'a> {
    access: DataAccess<'a>,
    last_survey: String,
    microtube_panel: PanelName,
}

impl<'a> Predicates<'a> {
    /// Fails if the entity registry lacks any entity a named predicate
    /// reads.
    pub fn new(access: DataAccess<'a>, config: &EngineConfig) -> Result<Self, RuleError> {
        access
            .registry()
            .require_all(PREDICATE_ENTITIES.iter().copied())?;
        Ok(Self {
            access,
            last_survey: config.last_survey.clone(),
            microtube_panel: PanelName::new(config.microtube_panel.as_str())?,
        })
    }

    pub fn access(&self) -> &DataAccess<'a> {
        &self.access
    }

    pub fn resolver(&self) -> StatusResolver<'_> {
        StatusResolver::new(&self.access)
    }

    pub fn last_survey(&self) -> &str {
        &self.last_survey
    }

    pub fn microtube_panel(&self) -> &PanelName {
        &self.microtube_panel
    }

    /// Status as of `visit`, recomputed from the full history.
    pub fn status(&self, visit: &Visit) -> Result<StatusSnapshot, RuleError> {
        self.resolver().resolve(visit)
    }

    /// Evaluate one built-in predicate against a visit in a fresh pass.
    pub fn evaluate(&self, predicate: NamedPredicate, visit: &Visit) -> Result<bool, RuleError> {
        let scope = EvaluationScope::new(self.resolver(), visit);
        let context = PredicateContext::new(self, &scope, None);
        predicate.evaluate(&context)
    }

    /// Circumcision reported at or before the visit.
    pub fn is_circumcised(&self, visit: &Visit) -> Result<bool, RuleError> {
        self.recorded_yes("circumcision", "circumcised", visit)
    }

    /// HIC enrollment permission given at or before the visit.
    pub fn is_hic_enrolled(&self, visit: &Visit) -> Result<bool, RuleError> {
        self.recorded_yes("hicenrollment", "hic_permission", visit)
    }

    pub(crate) fn recorded_yes(
        &self,
        entity: &str,
        field: &str,
        visit: &Visit,
    ) -> Result<bool, RuleError> {
        let query =
            Query::new(entity, &visit.subject_identifier, field).at_or_before(visit.report_datetime);
        Ok(self.access.exists(&query, &Value::yes())?)
    }
}

/// What a predicate sees while a rule group is evaluated: the library,
/// the visit with its memoized status, and the triggering source form.
pub struct PredicateContext<'a> {
    predicates: &'a Predicates<'a>,
    scope: &'a EvaluationScope<'a>,
    source: Option<&'a str>,
}

impl<'a> PredicateContext<'a> {
    pub fn new(
        predicates: &'a Predicates<'a>,
        scope: &'a EvaluationScope<'a>,
        source: Option<&'a str>,
    ) -> Self {
        Self {
            predicates,
            scope,
            source,
        }
    }

    pub fn predicates(&self) -> &'a Predicates<'a> {
        self.predicates
    }

    pub fn access(&self) -> &'a DataAccess<'a> {
        &self.predicates.access
    }

    pub fn visit(&self) -> &'a Visit {
        self.scope.visit()
    }

    /// Logical name of the form whose fields plain predicates read.
    pub fn source_entity(&self) -> &str {
        self.source.unwrap_or(VISIT_MODEL)
    }

    pub fn status(&self) -> Result<StatusSnapshot, RuleError> {
        self.scope.status()
    }

    pub fn subject(&self) -> Option<Subject> {
        self.access().subject(&self.visit().subject_identifier)
    }

    /// Query on `entity.field` for this visit's subject, unscoped.
    pub fn query(&self, entity: &str, field: &str) -> Query {
        Query::new(entity, &self.visit().subject_identifier, field)
    }
}
