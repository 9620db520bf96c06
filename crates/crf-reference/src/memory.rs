//! In-memory reference source.
//!
//! Backs the CLI (loaded from a JSON history document) and the tests.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crf_model::{
    EntityName, Observation, PanelName, Subject, SubjectIdentifier, Value, Visit, VisitCode,
};

use crate::error::ReferenceError;
use crate::registry::EntityRegistry;
use crate::source::ReferenceSource;

/// Serialized subject history: registered subjects, their visits, and the
/// field values captured at each visit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryDocument {
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub visits: Vec<Visit>,
    #[serde(default)]
    pub observations: Vec<RecordedValue>,
}

/// A captured value, attached to a visit by code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedValue {
    /// Logical or storage entity name.
    pub entity: String,
    pub subject_identifier: SubjectIdentifier,
    pub visit_code: VisitCode,
    pub field: String,
    pub value: Value,
    #[serde(default)]
    pub panel: Option<PanelName>,
}

impl HistoryDocument {
    pub fn from_json_str(contents: &str) -> Result<Self, ReferenceError> {
        Ok(serde_json::from_str(contents)?)
    }
}

type FieldKey = (EntityName, SubjectIdentifier, String);

#[derive(Debug, Clone, Default)]
pub struct InMemoryReferences {
    subjects: BTreeMap<SubjectIdentifier, Subject>,
    visits: BTreeMap<SubjectIdentifier, Vec<Visit>>,
    observations: BTreeMap<FieldKey, Vec<Observation>>,
}

impl InMemoryReferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a history document, resolving entity names
    /// through the registry.
    pub fn from_document(
        document: HistoryDocument,
        registry: &EntityRegistry,
    ) -> Result<Self, ReferenceError> {
        let mut store = Self::new();
        for subject in document.subjects {
            store.add_subject(subject);
        }
        for visit in document.visits {
            store.add_visit(visit)?;
        }
        for recorded in document.observations {
            let entity = registry.resolve(&recorded.entity)?.clone();
            store.insert(
                entity,
                recorded.panel,
                &recorded.subject_identifier,
                &recorded.visit_code,
                &recorded.field,
                recorded.value,
            )?;
        }
        Ok(store)
    }

    /// Add or replace a registered subject.
    pub fn add_subject(&mut self, subject: Subject) {
        self.subjects
            .insert(subject.subject_identifier.clone(), subject);
    }

    pub fn add_visit(&mut self, visit: Visit) -> Result<(), ReferenceError> {
        let visits = self
            .visits
            .entry(visit.subject_identifier.clone())
            .or_default();
        if visits.iter().any(|v| v.visit_code == visit.visit_code) {
            return Err(ReferenceError::DuplicateVisit {
                subject_identifier: visit.subject_identifier.to_string(),
                visit_code: visit.visit_code.to_string(),
            });
        }
        visits.push(visit);
        Ok(())
    }

    /// Record a field value on a form at a visit, replacing any value
    /// already recorded for the same form, field and visit.
    pub fn record(
        &mut self,
        entity: EntityName,
        subject_identifier: &SubjectIdentifier,
        visit_code: &VisitCode,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<(), ReferenceError> {
        self.insert(entity, None, subject_identifier, visit_code, field, value.into())
    }

    /// Record a field value on the requisition of one panel.
    pub fn record_panel(
        &mut self,
        entity: EntityName,
        panel: PanelName,
        subject_identifier: &SubjectIdentifier,
        visit_code: &VisitCode,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<(), ReferenceError> {
        self.insert(
            entity,
            Some(panel),
            subject_identifier,
            visit_code,
            field,
            value.into(),
        )
    }

    fn insert(
        &mut self,
        entity: EntityName,
        panel: Option<PanelName>,
        subject_identifier: &SubjectIdentifier,
        visit_code: &VisitCode,
        field: &str,
        value: Value,
    ) -> Result<(), ReferenceError> {
        let report_datetime = self
            .visits
            .get(subject_identifier)
            .and_then(|visits| visits.iter().find(|v| &v.visit_code == visit_code))
            .map(|visit| visit.report_datetime)
            .ok_or_else(|| ReferenceError::UnknownVisit {
                subject_identifier: subject_identifier.to_string(),
                visit_code: visit_code.to_string(),
            })?;
        let records = self
            .observations
            .entry((entity.clone(), subject_identifier.clone(), field.to_string()))
            .or_default();
        records.retain(|o| !(&o.visit_code == visit_code && o.panel == panel));
        records.push(Observation {
            entity,
            subject_identifier: subject_identifier.clone(),
            visit_code: visit_code.clone(),
            report_datetime,
            field: field.to_string(),
            value,
            panel,
        });
        Ok(())
    }
}

impl ReferenceSource for InMemoryReferences {
    fn subject(&self, subject_identifier: &SubjectIdentifier) -> Option<Subject> {
        self.subjects.get(subject_identifier).cloned()
    }

    fn visits(&self, subject_identifier: &SubjectIdentifier) -> Vec<Visit> {
        self.visits
            .get(subject_identifier)
            .cloned()
            .unwrap_or_default()
    }

    fn observations(
        &self,
        entity: &EntityName,
        subject_identifier: &SubjectIdentifier,
        field: &str,
    ) -> Vec<Observation> {
        self.observations
            .get(&(entity.clone(), subject_identifier.clone(), field.to_string()))
            .cloned()
            .unwrap_or_default()
    }
}
