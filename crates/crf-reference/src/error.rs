use std::path::PathBuf;

use chrono::{DateTime, Utc};
use crf_model::ModelError;

/// Errors raised by the data access layer.
#[derive(Debug, thiserror::Error)]
pub enum ReferenceError {
    #[error("entity {name:?} is not in the entity registry")]
    UnknownEntity { name: String },

    #[error("no visit {visit_code} recorded for subject {subject_identifier}")]
    UnknownVisit {
        subject_identifier: String,
        visit_code: String,
    },

    #[error("visit {visit_code} already recorded for subject {subject_identifier}")]
    DuplicateVisit {
        subject_identifier: String,
        visit_code: String,
    },

    #[error(
        "ambiguous {entity}.{field} for subject {subject_identifier}: \
         {count} records at {report_datetime}"
    )]
    DataIntegrity {
        entity: String,
        field: String,
        subject_identifier: String,
        report_datetime: DateTime<Utc>,
        count: usize,
    },

    #[error("failed to parse history document: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl ReferenceError {
    /// Configuration errors are fatal and never degraded to a default.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::UnknownEntity { .. })
    }

    pub(crate) fn unknown_entity(name: impl Into<String>) -> Self {
        Self::UnknownEntity { name: name.into() }
    }
}

/// Errors loading the engine configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML config {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid entity mapping {logical} -> {storage}: {source}")]
    InvalidEntity {
        logical: String,
        storage: String,
        #[source]
        source: ModelError,
    },

    #[error("invalid config: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
