//! Data access facade used by predicates.
//!
//! Resolves logical entity names through the [`EntityRegistry`] and answers
//! three kinds of lookup over a subject's captured data:
//!
//! - existence of a value ([`DataAccess::exists`])
//! - the most recent value ([`DataAccess::latest`])
//! - the full history, oldest first ([`DataAccess::history`])
//!
//! Missing data is never an error here: it is `false`, `None` or an empty
//! list. Unknown entities are configuration errors.

use tracing::warn;

use crf_model::{Observation, Subject, SubjectIdentifier, Value, Visit};

use crate::error::ReferenceError;
use crate::query::{Lookup, Query};
use crate::registry::EntityRegistry;
use crate::source::ReferenceSource;

pub struct DataAccess<'a> {
    source: &'a dyn ReferenceSource,
    registry: EntityRegistry,
}

impl<'a> DataAccess<'a> {
    pub fn new(source: &'a dyn ReferenceSource, registry: EntityRegistry) -> Self {
        Self { source, registry }
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Single entry point: existence when `filter` is given, the most recent
    /// value for point-in-time scopes, otherwise the history in scope.
    pub fn fetch(&self, query: &Query, filter: Option<&Value>) -> Result<Lookup, ReferenceError> {
        if let Some(value) = filter {
            return self.exists(query, value).map(Lookup::Exists);
        }
        if query.scope.is_point_in_time() {
            return Ok(match self.latest(query)? {
                Some(value) => Lookup::Value(value),
                None => Lookup::Absent,
            });
        }
        let values = self.history(query)?;
        if values.is_empty() {
            Ok(Lookup::Absent)
        } else {
            Ok(Lookup::History(values))
        }
    }

    /// True if any record in scope equals `value`.
    pub fn exists(&self, query: &Query, value: &Value) -> Result<bool, ReferenceError> {
        Ok(self
            .matching(query)?
            .iter()
            .any(|observation| observation.value.matches(value)))
    }

    /// Most recent value in scope.
    ///
    /// Several records sharing the most recent report time cannot be
    /// ordered and are reported as [`ReferenceError::DataIntegrity`].
    pub fn latest(&self, query: &Query) -> Result<Option<Value>, ReferenceError> {
        let mut records = self.matching(query)?;
        let Some(last) = records.pop() else {
            return Ok(None);
        };
        let ties = records
            .iter()
            .filter(|o| o.report_datetime == last.report_datetime)
            .count();
        if ties > 0 {
            warn!(
                entity = %query.entity,
                field = %query.field,
                report_datetime = %last.report_datetime,
                "multiple records at the same report time"
            );
            return Err(ReferenceError::DataIntegrity {
                entity: query.entity.clone(),
                field: query.field.clone(),
                subject_identifier: query.subject_identifier.to_string(),
                report_datetime: last.report_datetime,
                count: ties + 1,
            });
        }
        Ok(Some(last.value))
    }

    /// Every value in scope, ordered by report time.
    pub fn history(&self, query: &Query) -> Result<Vec<Value>, ReferenceError> {
        Ok(self
            .matching(query)?
            .into_iter()
            .map(|observation| observation.value)
            .collect())
    }

    pub fn subject(&self, subject_identifier: &SubjectIdentifier) -> Option<Subject> {
        self.source.subject(subject_identifier)
    }

    /// Visits of a subject ordered by report time.
    pub fn visits(&self, subject_identifier: &SubjectIdentifier) -> Vec<Visit> {
        let mut visits = self.source.visits(subject_identifier);
        visits.sort_by(|a, b| {
            a.report_datetime
                .cmp(&b.report_datetime)
                .then_with(|| a.visit_code.cmp(&b.visit_code))
        });
        visits
    }

    fn matching(&self, query: &Query) -> Result<Vec<Observation>, ReferenceError> {
        let entity = self.registry.resolve(&query.entity)?;
        let mut records: Vec<Observation> = self
            .source
            .observations(entity, &query.subject_identifier, &query.field)
            .into_iter()
            .filter(|o| query.scope.contains(o.report_datetime))
            .filter(|o| query.panel.is_none() || o.panel == query.panel)
            .collect();
        records.sort_by_key(|o| o.report_datetime);
        Ok(records)
    }
}
