use serde::{Deserialize, Serialize};

use crate::enums::RequiredState;
use crate::ids::{SubjectIdentifier, VisitCode};

/// Computed metadata state for one target of one visit.
///
/// The external metadata store owns persistence; the rule engine only
/// produces these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub subject_identifier: SubjectIdentifier,
    pub visit_code: VisitCode,
    /// Target form name or panel name.
    pub target: String,
    pub entry_status: RequiredState,
}
