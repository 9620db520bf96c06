//! Status resolution over a subject's visit history.
//!
//! A [`StatusSnapshot`] answers "what is true about this subject as of this
//! visit". It is a left fold over every visit reported at or before the
//! visit being evaluated, oldest first:
//!
//! - the HIV reading of a visit is today's result, else the documented
//!   result reviewed at that visit;
//! - `final_hiv_status` follows the latest reading, but once `POS` it never
//!   changes;
//! - `final_arv_status` is seeded by the first ART reading and replaced by
//!   later readings, except that a later `NAIVE` never replaces `DEFAULTER`
//!   or `ON_ART`;
//! - baseline flags come from the first visit only.
//!
//! [`StatusResolver::resolve`] recomputes the fold on every call.
//! [`EvaluationScope`] memoizes it for one evaluation pass.

use std::cell::OnceCell;

use serde::Serialize;
use tracing::trace;

use crf_model::{ArtStatus, HivResult, Value, Visit};
use crf_reference::{DataAccess, Lookup, Query};

use crate::error::RuleError;

pub(crate) const HIV_RESULT: (&str, &str) = ("hivresult", "hiv_result");
pub(crate) const RECORDED_HIV_RESULT: (&str, &str) = ("hivtestreview", "recorded_hiv_result");
pub(crate) const EVER_TAKEN_ARV: (&str, &str) = ("hivcareadherence", "ever_taken_arv");
pub(crate) const ON_ARV: (&str, &str) = ("hivcareadherence", "on_arv");

/// Derived status of a subject at one visit. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatusSnapshot {
    /// Today's HIV test result recorded at exactly this visit.
    pub current_hiv_result: Option<HivResult>,
    /// Some answer is recorded for today's test, even one that is not a
    /// POS/NEG/IND result.
    pub todays_result_recorded: bool,
    pub final_hiv_status: Option<HivResult>,
    pub final_arv_status: Option<ArtStatus>,
    /// Positive status was already established at the baseline visit.
    pub known_positive: bool,
    pub naive_at_baseline: bool,
    pub defaulter_at_baseline: bool,
}

impl StatusSnapshot {
    pub fn is_positive(&self) -> bool {
        self.final_hiv_status == Some(HivResult::Pos)
    }
}

/// Readings taken from a single visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisitReading {
    pub hiv: Option<HivResult>,
    pub art: Option<ArtStatus>,
}

/// ART status reported on the adherence form.
pub fn art_reading(ever_taken_arv: Option<&Value>, on_arv: Option<&Value>) -> Option<ArtStatus> {
    let on_arv_yes = on_arv.is_some_and(Value::is_yes);
    let on_arv_no = on_arv.is_some_and(Value::is_no);
    let ever_yes = ever_taken_arv.is_some_and(Value::is_yes);
    let ever_no = ever_taken_arv.is_some_and(Value::is_no);

    if on_arv_yes {
        Some(ArtStatus::OnArt)
    } else if ever_yes && on_arv_no {
        Some(ArtStatus::Defaulter)
    } else if ever_no {
        Some(ArtStatus::Naive)
    } else {
        None
    }
}

/// Fold readings, oldest first, into a snapshot.
///
/// `current_hiv_result` and `todays_result_recorded` are left unset; they
/// are not part of the history.
pub fn fold_readings(readings: &[VisitReading]) -> StatusSnapshot {
    let mut snapshot = StatusSnapshot::default();
    for (index, reading) in readings.iter().enumerate() {
        snapshot.final_hiv_status = next_hiv_status(snapshot.final_hiv_status, reading.hiv);
        snapshot.final_arv_status = next_arv_status(snapshot.final_arv_status, reading.art);
        if index == 0 {
            snapshot.known_positive = snapshot.is_positive();
            snapshot.naive_at_baseline = reading.art == Some(ArtStatus::Naive);
            snapshot.defaulter_at_baseline = reading.art == Some(ArtStatus::Defaulter);
        }
    }
    snapshot
}

fn next_hiv_status(status: Option<HivResult>, reading: Option<HivResult>) -> Option<HivResult> {
    match (status, reading) {
        (Some(HivResult::Pos), _) => Some(HivResult::Pos),
        (status, None) => status,
        (_, Some(result)) => Some(result),
    }
}

fn next_arv_status(status: Option<ArtStatus>, reading: Option<ArtStatus>) -> Option<ArtStatus> {
    match (status, reading) {
        (status, None) => status,
        (Some(ArtStatus::Defaulter | ArtStatus::OnArt), Some(ArtStatus::Naive)) => status,
        (_, Some(art)) => Some(art),
    }
}

/// Computes status snapshots through the data access facade.
#[derive(Clone, Copy)]
pub struct StatusResolver<'a> {
    access: &'a DataAccess<'a>,
}

impl<'a> StatusResolver<'a> {
    pub fn new(access: &'a DataAccess<'a>) -> Self {
        Self { access }
    }

    /// Status as of `visit`, folded over every visit of the subject
    /// reported at or before it.
    pub fn resolve(&self, visit: &Visit) -> Result<StatusSnapshot, RuleError> {
        let mut readings = Vec::new();
        for earlier in self
            .access
            .visits(&visit.subject_identifier)
            .iter()
            .filter(|v| v.report_datetime <= visit.report_datetime)
        {
            readings.push(self.reading(earlier)?);
        }
        let mut snapshot = fold_readings(&readings);
        let today = self.todays_lookup(visit)?;
        snapshot.todays_result_recorded = today.is_truthy();
        snapshot.current_hiv_result = hiv_result_of(&today);
        trace!(
            visit_code = %visit.visit_code,
            visits = readings.len(),
            final_hiv_status = ?snapshot.final_hiv_status,
            final_arv_status = ?snapshot.final_arv_status,
            "resolved status"
        );
        Ok(snapshot)
    }

    /// Readings recorded at exactly one visit.
    pub fn reading(&self, visit: &Visit) -> Result<VisitReading, RuleError> {
        let hiv = match self.todays_result(visit)? {
            Some(result) => Some(result),
            None => self
                .value_at(RECORDED_HIV_RESULT, visit)?
                .and_then(|value| value.as_hiv_result()),
        };
        let ever_taken_arv = self.value_at(EVER_TAKEN_ARV, visit)?;
        let on_arv = self.value_at(ON_ARV, visit)?;
        Ok(VisitReading {
            hiv,
            art: art_reading(ever_taken_arv.as_ref(), on_arv.as_ref()),
        })
    }

    fn todays_result(&self, visit: &Visit) -> Result<Option<HivResult>, RuleError> {
        Ok(hiv_result_of(&self.todays_lookup(visit)?))
    }

    fn todays_lookup(&self, visit: &Visit) -> Result<Lookup, RuleError> {
        let (entity, field) = HIV_RESULT;
        let query = Query::new(entity, &visit.subject_identifier, field).at(visit.report_datetime);
        Ok(self.access.fetch(&query, None)?)
    }

    fn value_at(
        &self,
        (entity, field): (&str, &str),
        visit: &Visit,
    ) -> Result<Option<Value>, RuleError> {
        let query =
            Query::new(entity, &visit.subject_identifier, field).at(visit.report_datetime);
        Ok(self.access.latest(&query)?)
    }
}

fn hiv_result_of(lookup: &Lookup) -> Option<HivResult> {
    match lookup {
        Lookup::Value(value) => value.as_hiv_result(),
        _ => None,
    }
}

/// Status memoized for the visit of one evaluation pass.
///
/// Agrees with [`StatusResolver::resolve`] for the same history; history
/// must not change while the scope is alive.
pub struct EvaluationScope<'a> {
    resolver: StatusResolver<'a>,
    visit: &'a Visit,
    snapshot: OnceCell<StatusSnapshot>,
}

impl<'a> EvaluationScope<'a> {
    pub fn new(resolver: StatusResolver<'a>, visit: &'a Visit) -> Self {
        Self {
            resolver,
            visit,
            snapshot: OnceCell::new(),
        }
    }

    pub fn visit(&self) -> &'a Visit {
        self.visit
    }

    pub fn status(&self) -> Result<StatusSnapshot, RuleError> {
        if let Some(snapshot) = self.snapshot.get() {
            return Ok(*snapshot);
        }
        let snapshot = self.resolver.resolve(self.visit)?;
        Ok(*self.snapshot.get_or_init(|| snapshot))
    }
}
