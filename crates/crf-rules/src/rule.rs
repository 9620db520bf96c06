//! Rule and rule group definitions.
//!
//! Groups are composed, not inherited: an abstract group is a reusable rule
//! list that concrete groups copy in with [`RuleGroupBuilder::include`].

use std::collections::BTreeSet;
use std::fmt;

use crf_model::{EntityName, PanelName, RequiredState};
use crf_reference::EntityRegistry;

use crate::error::RuleError;
use crate::predicate::Predicate;
use crate::predicates::VISIT_MODEL;

/// Forms or panels a rule assigns a state to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Targets {
    /// Qualified form names (`bcpp_subject.pimacd4`).
    Crfs(Vec<EntityName>),
    Panels(Vec<PanelName>),
}

impl Targets {
    /// Forms qualified with an app label.
    pub fn crfs(app_label: &str, models: &[&str]) -> Result<Self, RuleError> {
        let names = models
            .iter()
            .map(|model| EntityName::qualified(app_label, model))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Targets::Crfs(names))
    }

    pub fn panels(panels: &[&str]) -> Result<Self, RuleError> {
        let names = panels
            .iter()
            .map(|panel| PanelName::new(*panel))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Targets::Panels(names))
    }

    /// Target names in declaration order.
    pub fn names(&self) -> Vec<&str> {
        match self {
            Targets::Crfs(names) => names.iter().map(EntityName::as_str).collect(),
            Targets::Panels(names) => names.iter().map(PanelName::as_str).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Targets::Crfs(names) => names.is_empty(),
            Targets::Panels(names) => names.is_empty(),
        }
    }
}

/// Predicate plus the states it assigns when true and when false.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub predicate: Predicate,
    pub consequence: RequiredState,
    pub alternative: RequiredState,
    pub targets: Targets,
}

impl Rule {
    pub fn new(
        name: impl Into<String>,
        predicate: Predicate,
        consequence: RequiredState,
        alternative: RequiredState,
        targets: Targets,
    ) -> Self {
        Self {
            name: name.into(),
            predicate,
            consequence,
            alternative,
            targets,
        }
    }

    /// `REQUIRED` when the predicate holds, else `NOT_REQUIRED`.
    pub fn required_when(name: impl Into<String>, predicate: Predicate, targets: Targets) -> Self {
        Self::new(
            name,
            predicate,
            RequiredState::Required,
            RequiredState::NotRequired,
            targets,
        )
    }

    /// `NOT_REQUIRED` when the predicate holds, else `REQUIRED`.
    pub fn not_required_when(
        name: impl Into<String>,
        predicate: Predicate,
        targets: Targets,
    ) -> Self {
        Self::new(
            name,
            predicate,
            RequiredState::NotRequired,
            RequiredState::Required,
            targets,
        )
    }

    pub fn state_for(&self, outcome: bool) -> RequiredState {
        if outcome {
            self.consequence
        } else {
            self.alternative
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleGroupKind {
    Crf,
    /// Panels of requisitions recorded on `model`.
    Requisition { model: String },
}

impl fmt::Display for RuleGroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleGroupKind::Crf => f.write_str("crf"),
            RuleGroupKind::Requisition { model } => write!(f, "requisition ({model})"),
        }
    }
}

/// Named, ordered rules sharing a triggering source form.
#[derive(Debug, Clone)]
pub struct RuleGroup {
    name: String,
    app_label: String,
    source_model: Option<String>,
    kind: RuleGroupKind,
    is_abstract: bool,
    rules: Vec<Rule>,
}

impl RuleGroup {
    pub fn crf(name: impl Into<String>, app_label: impl Into<String>) -> RuleGroupBuilder {
        RuleGroupBuilder::new(name.into(), app_label.into(), RuleGroupKind::Crf)
    }

    pub fn requisition(
        name: impl Into<String>,
        app_label: impl Into<String>,
        requisition_model: impl Into<String>,
    ) -> RuleGroupBuilder {
        RuleGroupBuilder::new(
            name.into(),
            app_label.into(),
            RuleGroupKind::Requisition {
                model: requisition_model.into(),
            },
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn app_label(&self) -> &str {
        &self.app_label
    }

    /// Logical name of the triggering form; `None` for visit-triggered
    /// groups.
    pub fn source_model(&self) -> Option<&str> {
        self.source_model.as_deref()
    }

    pub fn kind(&self) -> &RuleGroupKind {
        &self.kind
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Distinct targets across all rules, in first-declared order.
    pub fn targets(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.rules
            .iter()
            .flat_map(|rule| rule.targets.names())
            .filter(|name| seen.insert(*name))
            .collect()
    }

    /// Logical name of the triggering form; the visit form for
    /// visit-triggered groups.
    pub fn trigger_model(&self) -> &str {
        self.source_model.as_deref().unwrap_or(VISIT_MODEL)
    }

    /// True if saving `source` triggers this group. Both names resolve
    /// through `entities`, so a logical name (`hivresult`) and its storage
    /// name (`bcpp_subject.hivresult` or a configured override) match.
    pub fn is_triggered_by(&self, source: &str, entities: &EntityRegistry) -> bool {
        match (entities.resolve(source), entities.resolve(self.trigger_model())) {
            (Ok(source), Ok(model)) => source == model,
            _ => false,
        }
    }
}

/// Builds a [`RuleGroup`], validating it on [`build`](Self::build).
#[derive(Debug)]
pub struct RuleGroupBuilder {
    group: RuleGroup,
    included: Vec<(String, bool)>,
}

impl RuleGroupBuilder {
    fn new(name: String, app_label: String, kind: RuleGroupKind) -> Self {
        Self {
            group: RuleGroup {
                name,
                app_label,
                source_model: None,
                kind,
                is_abstract: false,
                rules: Vec::new(),
            },
            included: Vec::new(),
        }
    }

    /// Logical name of the triggering form.
    #[must_use]
    pub fn source(mut self, model: impl Into<String>) -> Self {
        self.group.source_model = Some(model.into().trim().to_ascii_lowercase());
        self
    }

    /// Mark as a reusable rule list that cannot be evaluated directly.
    #[must_use]
    pub fn abstract_group(mut self) -> Self {
        self.group.is_abstract = true;
        self
    }

    /// Copy the rules of an abstract group, as if declared here.
    #[must_use]
    pub fn include(mut self, base: &RuleGroup) -> Self {
        self.included
            .push((base.name.clone(), base.is_abstract));
        self.group.rules.extend(base.rules.iter().cloned());
        self
    }

    #[must_use]
    pub fn rule(mut self, rule: Rule) -> Self {
        self.group.rules.push(rule);
        self
    }

    /// Rejects included concrete groups, duplicate rule names, rules
    /// without targets, and targets of the wrong kind.
    pub fn build(self) -> Result<RuleGroup, RuleError> {
        let group = self.group;
        if group.name.trim().is_empty() {
            return Err(RuleError::invalid_group(&group.name, "name must not be empty"));
        }
        if let Some((base, _)) = self.included.iter().find(|(_, is_abstract)| !is_abstract) {
            return Err(RuleError::invalid_group(
                &group.name,
                format!("included group {base} is not abstract"),
            ));
        }
        let mut names = BTreeSet::new();
        for rule in &group.rules {
            if !names.insert(rule.name.as_str()) {
                return Err(RuleError::invalid_group(
                    &group.name,
                    format!("rule {} is declared twice", rule.name),
                ));
            }
            if rule.targets.is_empty() {
                return Err(RuleError::invalid_group(
                    &group.name,
                    format!("rule {} has no targets", rule.name),
                ));
            }
            let matches_kind = matches!(
                (&group.kind, &rule.targets),
                (RuleGroupKind::Crf, Targets::Crfs(_))
                    | (RuleGroupKind::Requisition { .. }, Targets::Panels(_))
            );
            if !matches_kind {
                return Err(RuleError::invalid_group(
                    &group.name,
                    format!("rule {} targets do not match a {} group", rule.name, group.kind),
                ));
            }
        }
        Ok(group)
    }
}
