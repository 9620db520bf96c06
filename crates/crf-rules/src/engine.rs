//! Rule group evaluation.
//!
//! Rules run in declaration order and every target receives the state of
//! the last rule that names it. [`RuleEngine::evaluate_source`] merges
//! several groups the same way, in registration order.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info_span};

use crf_model::{MetadataEntry, RequiredState, Visit};

use crate::error::RuleError;
use crate::named::PredicateRegistry;
use crate::predicates::{PredicateContext, Predicates};
use crate::registry::RuleRegistry;
use crate::rule::RuleGroup;
use crate::status::EvaluationScope;

/// One rule evaluated during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FiredRule {
    pub group: String,
    pub rule: String,
    pub predicate: String,
    pub result: bool,
    pub state: RequiredState,
}

/// Required states computed for one visit.
///
/// Only targets named by an evaluated rule appear.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleGroupOutcome {
    pub states: BTreeMap<String, RequiredState>,
    pub fired: Vec<FiredRule>,
}

impl RuleGroupOutcome {
    pub fn get(&self, target: &str) -> Option<RequiredState> {
        self.states.get(target).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Metadata entries for the external metadata store.
    pub fn entries(&self, visit: &Visit) -> Vec<MetadataEntry> {
        self.states
            .iter()
            .map(|(target, state)| MetadataEntry {
                subject_identifier: visit.subject_identifier.clone(),
                visit_code: visit.visit_code.clone(),
                target: target.clone(),
                entry_status: *state,
            })
            .collect()
    }
}

/// Evaluates registered rule groups with an injected predicate library.
pub struct RuleEngine<'a> {
    registry: RuleRegistry,
    predicates: Predicates<'a>,
    functions: PredicateRegistry,
}

impl<'a> RuleEngine<'a> {
    /// Engine over the built-in named predicates.
    pub fn new(registry: RuleRegistry, predicates: Predicates<'a>) -> Result<Self, RuleError> {
        Self::with_functions(registry, predicates, PredicateRegistry::builtin())
    }

    /// Fails if a group's source form is not in the entity registry or a
    /// rule names an unregistered predicate.
    pub fn with_functions(
        registry: RuleRegistry,
        predicates: Predicates<'a>,
        functions: PredicateRegistry,
    ) -> Result<Self, RuleError> {
        let entities = predicates.access().registry();
        for group in registry.iter() {
            if let Some(source) = group.source_model() {
                entities.resolve(source)?;
            }
            for rule in group.rules() {
                if let Some(name) = rule.predicate.name() {
                    functions.get(name)?;
                }
            }
        }
        Ok(Self {
            registry,
            predicates,
            functions,
        })
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn predicates(&self) -> &Predicates<'a> {
        &self.predicates
    }

    pub fn functions(&self) -> &PredicateRegistry {
        &self.functions
    }

    /// Evaluate one concrete group against a visit.
    ///
    /// Re-evaluating with unchanged history yields the same outcome.
    pub fn evaluate(&self, name: &str, visit: &Visit) -> Result<RuleGroupOutcome, RuleError> {
        let group = self.registry.get(name)?;
        if group.is_abstract() {
            return Err(RuleError::AbstractRuleGroup {
                name: name.to_string(),
            });
        }
        let scope = EvaluationScope::new(self.predicates.resolver(), visit);
        let mut outcome = RuleGroupOutcome::default();
        self.apply(group, &scope, &mut outcome)?;
        Ok(outcome)
    }

    /// Evaluate every concrete group triggered by `source`.
    ///
    /// Groups run in registration order; a later group overrides the state
    /// an earlier group assigned to the same target. A source missing from
    /// the entity registry is a configuration error.
    pub fn evaluate_source(&self, source: &str, visit: &Visit) -> Result<RuleGroupOutcome, RuleError> {
        let entities = self.predicates.access().registry();
        entities.resolve(source)?;
        let scope = EvaluationScope::new(self.predicates.resolver(), visit);
        let mut outcome = RuleGroupOutcome::default();
        for group in self.registry.groups_for_source(source, entities) {
            self.apply(group, &scope, &mut outcome)?;
        }
        Ok(outcome)
    }

    fn apply(
        &self,
        group: &RuleGroup,
        scope: &EvaluationScope<'_>,
        outcome: &mut RuleGroupOutcome,
    ) -> Result<(), RuleError> {
        let visit = scope.visit();
        let span = info_span!(
            "evaluate_rule_group",
            group = %group.name(),
            visit_code = %visit.visit_code
        );
        let _enter = span.enter();

        let context = PredicateContext::new(&self.predicates, scope, group.source_model());
        for rule in group.rules() {
            let result = rule.predicate.evaluate(&context, &self.functions)?;
            let state = rule.state_for(result);
            for target in rule.targets.names() {
                outcome.states.insert(target.to_string(), state);
            }
            debug!(
                rule = %rule.name,
                predicate = %rule.predicate,
                result,
                state = %state,
                "rule applied"
            );
            outcome.fired.push(FiredRule {
                group: group.name().to_string(),
                rule: rule.name.clone(),
                predicate: rule.predicate.to_string(),
                result,
                state,
            });
        }
        Ok(())
    }
}
