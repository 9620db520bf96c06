pub mod enums;
pub mod error;
pub mod ids;
pub mod metadata;
pub mod value;
pub mod visit;

pub use enums::{ArtStatus, Gender, HivResult, RequiredState};
pub use error::{ModelError, Result};
pub use ids::{EntityName, PanelName, SubjectIdentifier, VisitCode};
pub use metadata::MetadataEntry;
pub use value::{NO, NOT_SURE, Value, YES};
pub use visit::{Observation, Subject, Visit};
