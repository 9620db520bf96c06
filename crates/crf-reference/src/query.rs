use chrono::{DateTime, Utc};

use crf_model::{PanelName, SubjectIdentifier, Value};

/// Temporal scope of a lookup, relative to visit report times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Every visit of the subject.
    All,
    /// Visits reported at or before the given time.
    AtOrBefore(DateTime<Utc>),
    /// Only the visit reported at exactly the given time.
    At(DateTime<Utc>),
}

impl Scope {
    pub fn contains(&self, report_datetime: DateTime<Utc>) -> bool {
        match self {
            Scope::All => true,
            Scope::AtOrBefore(limit) => report_datetime <= *limit,
            Scope::At(at) => report_datetime == *at,
        }
    }

    /// Point-in-time scopes expect at most one record.
    pub fn is_point_in_time(&self) -> bool {
        matches!(self, Scope::At(_))
    }
}

/// One field lookup against a logical entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub entity: String,
    pub subject_identifier: SubjectIdentifier,
    pub field: String,
    pub scope: Scope,
    pub panel: Option<PanelName>,
}

impl Query {
    pub fn new(
        entity: impl Into<String>,
        subject_identifier: &SubjectIdentifier,
        field: impl Into<String>,
    ) -> Self {
        Self {
            entity: entity.into(),
            subject_identifier: subject_identifier.clone(),
            field: field.into(),
            scope: Scope::All,
            panel: None,
        }
    }

    #[must_use]
    pub fn at_or_before(mut self, report_datetime: DateTime<Utc>) -> Self {
        self.scope = Scope::AtOrBefore(report_datetime);
        self
    }

    #[must_use]
    pub fn at(mut self, report_datetime: DateTime<Utc>) -> Self {
        self.scope = Scope::At(report_datetime);
        self
    }

    /// Restrict to requisition records of one panel.
    #[must_use]
    pub fn panel(mut self, panel: PanelName) -> Self {
        self.panel = Some(panel);
        self
    }
}

/// Result of [`DataAccess::fetch`](crate::DataAccess::fetch).
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// Nothing recorded in scope.
    Absent,
    /// Most recent value of a point-in-time lookup.
    Value(Value),
    /// Whether any record in scope matched the value filter.
    Exists(bool),
    /// Every value in scope, oldest first.
    History(Vec<Value>),
}

impl Lookup {
    /// Whether something was recorded: absent lookups, blank text and
    /// empty histories are false. A recorded `No` still counts.
    pub fn is_truthy(&self) -> bool {
        match self {
            Lookup::Absent => false,
            Lookup::Value(Value::Text(text)) => !text.trim().is_empty(),
            Lookup::Value(_) => true,
            Lookup::Exists(found) => *found,
            Lookup::History(values) => !values.is_empty(),
        }
    }
}
