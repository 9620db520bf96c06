use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid subject identifier: {0:?}")]
    InvalidSubjectIdentifier(String),
    #[error("invalid entity name: {0:?}")]
    InvalidEntityName(String),
    #[error("invalid panel name: {0:?}")]
    InvalidPanelName(String),
    #[error("invalid visit code: {0:?}")]
    InvalidVisitCode(String),
    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
