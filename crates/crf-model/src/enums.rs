//! Type-safe enumerations for coded CRF values.
//!
//! Source forms capture these as short codes (`M`, `POS`, `REQUIRED`);
//! the enums keep the codes in one place and give the rule engine
//! exhaustive matches instead of string comparisons.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Gender as recorded on the registered subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M", alias = "Male", alias = "MALE")]
    Male,
    #[serde(rename = "F", alias = "Female", alias = "FEMALE")]
    Female,
}

impl Gender {
    /// Returns the code stored on forms.
    pub fn as_code(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "M" | "MALE" => Ok(Gender::Male),
            "F" | "FEMALE" => Ok(Gender::Female),
            _ => Err(format!("Unknown gender: {s}")),
        }
    }
}

/// HIV test result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HivResult {
    /// Positive.
    Pos,
    /// Negative.
    Neg,
    /// Indeterminate; needs an ELISA confirmation.
    Ind,
}

impl HivResult {
    pub fn as_code(&self) -> &'static str {
        match self {
            HivResult::Pos => "POS",
            HivResult::Neg => "NEG",
            HivResult::Ind => "IND",
        }
    }
}

impl fmt::Display for HivResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

impl FromStr for HivResult {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "POS" | "POSITIVE" => Ok(HivResult::Pos),
            "NEG" | "NEGATIVE" => Ok(HivResult::Neg),
            "IND" | "INDETERMINATE" => Ok(HivResult::Ind),
            _ => Err(format!("Unknown HIV result: {s}")),
        }
    }
}

/// Antiretroviral therapy status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtStatus {
    /// Never took ARVs.
    Naive,
    /// Took ARVs in the past but is not on ART now.
    Defaulter,
    /// Currently on ART.
    OnArt,
}

impl ArtStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtStatus::Naive => "NAIVE",
            ArtStatus::Defaulter => "DEFAULTER",
            ArtStatus::OnArt => "ON_ART",
        }
    }
}

impl fmt::Display for ArtStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata state assigned to a target form or panel.
///
/// There is deliberately no "unknown" state at this boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequiredState {
    Required,
    NotRequired,
}

impl RequiredState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequiredState::Required => "REQUIRED",
            RequiredState::NotRequired => "NOT_REQUIRED",
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, RequiredState::Required)
    }
}

impl fmt::Display for RequiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequiredState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "REQUIRED" => Ok(RequiredState::Required),
            "NOT_REQUIRED" | "NOT REQUIRED" => Ok(RequiredState::NotRequired),
            _ => Err(format!("Unknown required state: {s}")),
        }
    }
}
