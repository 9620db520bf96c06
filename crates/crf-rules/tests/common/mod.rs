#![allow(dead_code)]

use chrono::{DateTime, Months, TimeZone, Utc};

use crf_model::{
    ArtStatus, EntityName, Gender, HivResult, PanelName, Subject, SubjectIdentifier, Value, Visit,
    VisitCode,
};
use crf_reference::{DataAccess, EngineConfig, InMemoryReferences};
use crf_rules::{Predicates, RuleEngine, bcpp_registry};

pub const SUBJECT: &str = "111111111";
pub const APP_LABEL: &str = "bcpp_subject";
pub const MICROTUBE: &str = "Microtube";

pub fn baseline() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2015, 1, 7, 0, 0, 0).unwrap()
}

/// One male subject with visits T0, T1, T2 a year apart from 2015-01-07.
pub struct Fixture {
    pub store: InMemoryReferences,
    pub config: EngineConfig,
    pub visits: Vec<Visit>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_schedules(&["bcpp-year-1", "bcpp-year-2", "bcpp-year-3"])
    }

    pub fn with_schedules(schedules: &[&str; 3]) -> Self {
        let mut store = InMemoryReferences::new();
        store.add_subject(Subject {
            subject_identifier: subject(),
            gender: Some(Gender::Male),
            anonymous: false,
        });
        let mut visits = Vec::new();
        for (index, schedule) in schedules.iter().enumerate() {
            let report_datetime = baseline()
                .checked_add_months(Months::new(12 * index as u32))
                .unwrap();
            let visit = Visit::new(
                subject(),
                VisitCode::new(format!("T{index}")).unwrap(),
                report_datetime,
                *schedule,
            );
            store.add_visit(visit.clone()).unwrap();
            visits.push(visit);
        }
        Self {
            store,
            config: EngineConfig::default(),
            visits,
        }
    }

    pub fn visit(&self, index: usize) -> &Visit {
        &self.visits[index]
    }

    pub fn set_subject(&mut self, gender: Option<Gender>, anonymous: bool) {
        self.store.add_subject(Subject {
            subject_identifier: subject(),
            gender,
            anonymous,
        });
    }

    pub fn record(&mut self, visit: usize, model: &str, field: &str, value: impl Into<Value>) {
        let code = self.visits[visit].visit_code.clone();
        self.store
            .record(entity(model), &subject(), &code, field, value)
            .unwrap();
    }

    pub fn record_panel(
        &mut self,
        visit: usize,
        panel: &str,
        field: &str,
        value: impl Into<Value>,
    ) {
        let code = self.visits[visit].visit_code.clone();
        self.store
            .record_panel(
                entity("subjectrequisition"),
                PanelName::new(panel).unwrap(),
                &subject(),
                &code,
                field,
                value,
            )
            .unwrap();
    }

    /// Today's HIV test result at a visit.
    pub fn hiv_result(&mut self, visit: usize, result: HivResult) {
        self.record(visit, "hivresult", "hiv_result", result);
    }

    /// Documented previous result reviewed at a visit.
    pub fn recorded_hiv_result(&mut self, visit: usize, result: HivResult) {
        self.record(visit, "hivtestreview", "recorded_hiv_result", result);
    }

    /// Adherence answers that read back as `status`.
    pub fn art(&mut self, visit: usize, status: ArtStatus) {
        let (ever_taken, on_arv) = match status {
            ArtStatus::Naive => (Value::no(), Value::no()),
            ArtStatus::Defaulter => (Value::yes(), Value::no()),
            ArtStatus::OnArt => (Value::yes(), Value::yes()),
        };
        self.record(visit, "hivcareadherence", "ever_taken_arv", ever_taken);
        self.record(visit, "hivcareadherence", "on_arv", on_arv);
    }

    pub fn access(&self) -> DataAccess<'_> {
        DataAccess::new(&self.store, self.config.entity_registry().unwrap())
    }

    pub fn predicates(&self) -> Predicates<'_> {
        Predicates::new(self.access(), &self.config).unwrap()
    }

    pub fn engine(&self) -> RuleEngine<'_> {
        RuleEngine::new(bcpp_registry(APP_LABEL).unwrap(), self.predicates()).unwrap()
    }
}

pub fn subject() -> SubjectIdentifier {
    SubjectIdentifier::new(SUBJECT).unwrap()
}

pub fn entity(model: &str) -> EntityName {
    EntityName::qualified(APP_LABEL, model).unwrap()
}

pub fn target(model: &str) -> String {
    format!("{APP_LABEL}.{model}")
}
