//! A loaded subject history plus engine configuration, shared by the
//! `evaluate` and `status` commands.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crf_model::{MetadataEntry, SubjectIdentifier, Visit, VisitCode};
use crf_reference::{DataAccess, EngineConfig, HistoryDocument, InMemoryReferences};
use crf_rules::{FiredRule, Predicates, RuleEngine, RuleRegistry, StatusSnapshot, bcpp_registry};

use crate::logging::redact_value;

/// What to evaluate at a visit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// One concrete rule group.
    Group(String),
    /// Every group triggered by saving this form.
    Source(String),
}

/// Result of evaluating a selection at one visit.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub subject_identifier: SubjectIdentifier,
    pub visit_code: VisitCode,
    pub report_datetime: DateTime<Utc>,
    pub entries: Vec<MetadataEntry>,
    pub fired: Vec<FiredRule>,
}

/// Status of a subject as of one visit.
#[derive(Debug, Clone, Serialize)]
pub struct VisitStatus {
    pub visit_code: VisitCode,
    pub report_datetime: DateTime<Utc>,
    pub survey_schedule: String,
    pub status: StatusSnapshot,
}

pub struct Session {
    config: EngineConfig,
    store: InMemoryReferences,
}

impl Session {
    pub fn new(config: EngineConfig, store: InMemoryReferences) -> Self {
        Self { config, store }
    }

    /// Load the engine configuration (defaults when `config_path` is
    /// `None`) and a JSON history document.
    pub fn load(config_path: Option<&Path>, history: &Path) -> Result<Self> {
        let config = load_config(config_path)?;
        let contents = std::fs::read_to_string(history)
            .with_context(|| format!("read history {}", history.display()))?;
        Self::from_json_str(config, &contents)
            .with_context(|| format!("load history {}", history.display()))
    }

    pub fn from_json_str(config: EngineConfig, contents: &str) -> Result<Self> {
        let document = HistoryDocument::from_json_str(contents)?;
        let registry = config.entity_registry()?;
        info!(
            subjects = document.subjects.len(),
            visits = document.visits.len(),
            observations = document.observations.len(),
            "loaded history"
        );
        let store = InMemoryReferences::from_document(document, &registry)?;
        Ok(Self::new(config, store))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> Result<RuleRegistry> {
        Ok(bcpp_registry(&self.config.app_label)?)
    }

    fn access(&self) -> Result<DataAccess<'_>> {
        Ok(DataAccess::new(&self.store, self.config.entity_registry()?))
    }

    fn predicates(&self) -> Result<Predicates<'_>> {
        Ok(Predicates::new(self.access()?, &self.config)?)
    }

    fn find_visit(&self, subject: &SubjectIdentifier, visit_code: &VisitCode) -> Result<Visit> {
        self.access()?
            .visits(subject)
            .into_iter()
            .find(|visit| &visit.visit_code == visit_code)
            .ok_or_else(|| {
                anyhow!(
                    "no visit {visit_code} for subject {}",
                    redact_value(subject.as_str())
                )
            })
    }

    pub fn evaluate(
        &self,
        subject: &SubjectIdentifier,
        visit_code: &VisitCode,
        selection: &Selection,
    ) -> Result<Evaluation> {
        let visit = self.find_visit(subject, visit_code)?;
        let engine = RuleEngine::new(self.registry()?, self.predicates()?)?;
        let outcome = match selection {
            Selection::Group(name) => engine.evaluate(name, &visit)?,
            Selection::Source(model) => engine.evaluate_source(model, &visit)?,
        };
        debug!(
            subject = %redact_value(subject.as_str()),
            visit_code = %visit_code,
            targets = outcome.states.len(),
            "evaluated"
        );
        Ok(Evaluation {
            entries: outcome.entries(&visit),
            fired: outcome.fired,
            subject_identifier: visit.subject_identifier,
            visit_code: visit.visit_code,
            report_datetime: visit.report_datetime,
        })
    }

    /// Status snapshot at every visit of the subject, oldest first.
    pub fn statuses(&self, subject: &SubjectIdentifier) -> Result<Vec<VisitStatus>> {
        let predicates = self.predicates()?;
        let visits = predicates.access().visits(subject);
        if visits.is_empty() {
            return Err(anyhow!(
                "no visits for subject {}",
                redact_value(subject.as_str())
            ));
        }
        visits
            .into_iter()
            .map(|visit| -> Result<VisitStatus> {
                let status = predicates.status(&visit)?;
                Ok(VisitStatus {
                    visit_code: visit.visit_code,
                    report_datetime: visit.report_datetime,
                    survey_schedule: visit.survey_schedule,
                    status,
                })
            })
            .collect()
    }
}

pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("load config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}
