#![deny(unsafe_code)]

use crf_model::ModelError;
use crf_reference::ReferenceError;

/// Errors raised while building or evaluating rule groups.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("rule group {name} is already registered")]
    DuplicateRuleGroup { name: String },

    #[error("rule group {name} is not registered")]
    UnknownRuleGroup { name: String },

    #[error("rule group {name} is abstract and cannot be evaluated")]
    AbstractRuleGroup { name: String },

    #[error("rule group {name} is invalid: {message}")]
    InvalidRuleGroup { name: String, message: String },

    #[error("predicate {name:?} is not in the predicate registry")]
    UnknownPredicate { name: String },

    #[error("predicate {name:?} is already registered")]
    DuplicatePredicate { name: String },

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl RuleError {
    /// Configuration errors halt evaluation and are never recovered.
    ///
    /// Data access errors are configuration errors only for unknown
    /// entities; data integrity conflicts are data-quality errors.
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::Reference(error) => error.is_configuration(),
            _ => true,
        }
    }

    pub fn is_data_integrity(&self) -> bool {
        matches!(
            self,
            Self::Reference(ReferenceError::DataIntegrity { .. })
        )
    }

    pub(crate) fn invalid_group(name: &str, message: impl Into<String>) -> Self {
        Self::InvalidRuleGroup {
            name: name.to_string(),
            message: message.into(),
        }
    }
}
