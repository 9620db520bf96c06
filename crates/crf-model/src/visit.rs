use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::Gender;
use crate::ids::{EntityName, PanelName, SubjectIdentifier, VisitCode};
use crate::value::Value;

/// A person under observation, as registered at enrollment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub subject_identifier: SubjectIdentifier,
    #[serde(default)]
    pub gender: Option<Gender>,
    /// Enrolled through anonymous consent.
    #[serde(default)]
    pub anonymous: bool,
}

/// One scheduled subject encounter.
///
/// Visits of a subject are totally ordered by `report_datetime`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Visit {
    pub subject_identifier: SubjectIdentifier,
    pub visit_code: VisitCode,
    pub report_datetime: DateTime<Utc>,
    /// Survey schedule the visit belongs to (e.g. `bcpp-year-2`).
    #[serde(default)]
    pub survey_schedule: String,
}

impl Visit {
    pub fn new(
        subject_identifier: SubjectIdentifier,
        visit_code: VisitCode,
        report_datetime: DateTime<Utc>,
        survey_schedule: impl Into<String>,
    ) -> Self {
        Self {
            subject_identifier,
            visit_code,
            report_datetime,
            survey_schedule: survey_schedule.into(),
        }
    }
}

/// A field value recorded on a form at a visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Storage name of the form (`bcpp_subject.circumcision`).
    pub entity: EntityName,
    pub subject_identifier: SubjectIdentifier,
    pub visit_code: VisitCode,
    pub report_datetime: DateTime<Utc>,
    pub field: String,
    pub value: Value,
    /// Panel of a requisition record; `None` for ordinary forms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panel: Option<PanelName>,
}
