//! Captured field values.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{Gender, HivResult};

/// Response code for "Yes" answers.
pub const YES: &str = "Yes";
/// Response code for "No" answers.
pub const NO: &str = "No";
/// Response code for "Not Sure" answers.
pub const NOT_SURE: &str = "Not Sure";

/// A single field value captured on a form.
///
/// Deserialization tries booleans, integers and RFC 3339 datetimes before
/// falling back to text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    DateTime(DateTime<Utc>),
    Text(String),
}

impl Value {
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    pub fn yes() -> Self {
        Value::Text(YES.to_string())
    }

    pub fn no() -> Self {
        Value::Text(NO.to_string())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Integer view; numeric text such as `"2"` is accepted.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(value) => Some(*value),
            Value::Text(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// `true` for `Yes` (any case) or a boolean `true`.
    pub fn is_yes(&self) -> bool {
        match self {
            Value::Boolean(flag) => *flag,
            Value::Text(text) => text.trim().eq_ignore_ascii_case(YES),
            _ => false,
        }
    }

    /// `true` for `No` (any case) or a boolean `false`.
    pub fn is_no(&self) -> bool {
        match self {
            Value::Boolean(flag) => !*flag,
            Value::Text(text) => text.trim().eq_ignore_ascii_case(NO),
            _ => false,
        }
    }

    pub fn as_hiv_result(&self) -> Option<HivResult> {
        self.as_text().and_then(|text| text.parse().ok())
    }

    pub fn as_gender(&self) -> Option<Gender> {
        self.as_text().and_then(|text| text.parse().ok())
    }

    /// Value equality as forms use it: yes/no text matches booleans,
    /// integer text matches integers, text compares trimmed.
    pub fn matches(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Boolean(flag), other) | (other, Value::Boolean(flag)) => {
                if *flag {
                    other.is_yes()
                } else {
                    other.is_no()
                }
            }
            (Value::Integer(left), right) | (right, Value::Integer(left)) => {
                right.as_integer() == Some(*left)
            }
            (Value::DateTime(left), Value::DateTime(right)) => left == right,
            (Value::Text(left), Value::Text(right)) => left.trim() == right.trim(),
            _ => false,
        }
    }

    /// Ordering for the `gt`/`lt`/`ge`/`le` operators. Values of
    /// different kinds are incomparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::DateTime(left), Value::DateTime(right)) => Some(left.cmp(right)),
            (Value::Text(left), Value::Text(right)) => {
                match (left.trim().parse::<i64>(), right.trim().parse::<i64>()) {
                    (Ok(left), Ok(right)) => Some(left.cmp(&right)),
                    _ => Some(left.trim().cmp(right.trim())),
                }
            }
            (Value::Boolean(_), _) | (_, Value::Boolean(_)) => None,
            (left, right) => match (left.as_integer(), right.as_integer()) {
                (Some(left), Some(right)) => Some(left.cmp(&right)),
                _ => None,
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(flag) => write!(f, "{flag}"),
            Value::Integer(value) => write!(f, "{value}"),
            Value::DateTime(value) => write!(f, "{}", value.to_rfc3339()),
            Value::Text(text) => f.write_str(text),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::DateTime(value)
    }
}

impl From<HivResult> for Value {
    fn from(value: HivResult) -> Self {
        Value::Text(value.as_code().to_string())
    }
}

impl From<Gender> for Value {
    fn from(value: Gender) -> Self {
        Value::Text(value.as_code().to_string())
    }
}
