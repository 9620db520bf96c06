#![deny(unsafe_code)]

use std::fmt;

use crate::ModelError;

#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct SubjectIdentifier(String);

impl SubjectIdentifier {
    pub fn new(value: impl Into<String>) -> Result<Self, ModelError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ModelError::InvalidSubjectIdentifier(value));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SubjectIdentifier {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SubjectIdentifier> for String {
    fn from(value: SubjectIdentifier) -> Self {
        value.0
    }
}

/// A form (model) name, either logical (`circumcision`) or qualified with
/// its app label (`bcpp_subject.circumcision`).
///
/// Names are case-insensitive and stored lowercase.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct EntityName(String);

impl EntityName {
    pub fn new(value: impl Into<String>) -> Result<Self, ModelError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.starts_with('.') || trimmed.ends_with('.') {
            return Err(ModelError::InvalidEntityName(value));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// Qualify a model name with an app label.
    pub fn qualified(app_label: &str, model: &str) -> Result<Self, ModelError> {
        Self::new(format!("{}.{}", app_label.trim(), model.trim()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// App label part of a qualified name.
    pub fn app_label(&self) -> Option<&str> {
        self.0.split_once('.').map(|(label, _)| label)
    }

    /// Model part of the name, without the app label.
    pub fn model_name(&self) -> &str {
        self.0
            .split_once('.')
            .map(|(_, model)| model)
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for EntityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EntityName {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EntityName> for String {
    fn from(value: EntityName) -> Self {
        value.0
    }
}

/// Lab panel name, as printed on requisitions (`Microtube`, `Viral Load`).
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct PanelName(String);

impl PanelName {
    pub fn new(value: impl Into<String>) -> Result<Self, ModelError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ModelError::InvalidPanelName(value));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PanelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PanelName {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PanelName> for String {
    fn from(value: PanelName) -> Self {
        value.0
    }
}

/// Timepoint label of a scheduled visit (`T0`, `T1`, ...).
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct VisitCode(String);

impl VisitCode {
    pub fn new(value: impl Into<String>) -> Result<Self, ModelError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ModelError::InvalidVisitCode(value));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VisitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for VisitCode {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VisitCode> for String {
    fn from(value: VisitCode) -> Self {
        value.0
    }
}
