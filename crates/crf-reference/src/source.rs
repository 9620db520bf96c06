use crf_model::{EntityName, Observation, Subject, SubjectIdentifier, Visit};

/// Read access to persisted subject history.
///
/// Implemented by the persistence collaborator. Lookups for data that does
/// not exist return `None` or an empty list, never an error.
pub trait ReferenceSource: Send + Sync {
    /// Registered subject, if any.
    fn subject(&self, subject_identifier: &SubjectIdentifier) -> Option<Subject>;

    /// All visits of a subject, in any order.
    fn visits(&self, subject_identifier: &SubjectIdentifier) -> Vec<Visit>;

    /// Every observation of `field` recorded on the storage entity for the
    /// subject, across all visits, in any order.
    fn observations(
        &self,
        entity: &EntityName,
        subject_identifier: &SubjectIdentifier,
        field: &str,
    ) -> Vec<Observation>;
}
