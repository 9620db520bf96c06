//! Predicate shapes used by rules.

use std::fmt;
use std::str::FromStr;

use crf_model::Value;
use crf_reference::Query;

use crate::error::RuleError;
use crate::named::{NamedPredicate, PredicateRegistry};
use crate::predicates::PredicateContext;

/// Field that falls back to the registered subject when the source form
/// does not capture it.
const GENDER_FIELD: &str = "gender";

/// Comparison operator of a field predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Gt => "gt",
            Operator::Lt => "lt",
            Operator::Ge => "ge",
            Operator::Le => "le",
        }
    }

    /// Apply the operator; incomparable values never satisfy an ordering.
    pub fn apply(&self, left: &Value, right: &Value) -> bool {
        match self {
            Operator::Eq => left.matches(right),
            Operator::Ne => !left.matches(right),
            Operator::Gt => left.compare(right).is_some_and(|o| o.is_gt()),
            Operator::Lt => left.compare(right).is_some_and(|o| o.is_lt()),
            Operator::Ge => left.compare(right).is_some_and(|o| o.is_ge()),
            Operator::Le => left.compare(right).is_some_and(|o| o.is_le()),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "eq" | "==" => Ok(Operator::Eq),
            "ne" | "!=" => Ok(Operator::Ne),
            "gt" | ">" => Ok(Operator::Gt),
            "lt" | "<" => Ok(Operator::Lt),
            "ge" | ">=" => Ok(Operator::Ge),
            "le" | "<=" => Ok(Operator::Le),
            _ => Err(format!("Unknown operator: {s}")),
        }
    }
}

/// Compares one field of the source form at this visit to a literal.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPredicate {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

/// Combines two fields of the source form at this visit.
///
/// If either field is absent the predicate is false; the combiner only
/// sees recorded values.
#[derive(Clone)]
pub struct PairPredicate {
    pub first: String,
    pub second: String,
    pub combine: fn(&Value, &Value) -> bool,
}

impl fmt::Debug for PairPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PairPredicate")
            .field("first", &self.first)
            .field("second", &self.second)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum Predicate {
    Field(FieldPredicate),
    Pair(PairPredicate),
    /// Resolved by name through the [`PredicateRegistry`].
    Named(String),
}

impl Predicate {
    pub fn field(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Predicate::Field(FieldPredicate {
            field: field.into(),
            operator,
            value: value.into(),
        })
    }

    pub fn pair(
        first: impl Into<String>,
        second: impl Into<String>,
        combine: fn(&Value, &Value) -> bool,
    ) -> Self {
        Predicate::Pair(PairPredicate {
            first: first.into(),
            second: second.into(),
            combine,
        })
    }

    pub fn named(predicate: NamedPredicate) -> Self {
        Predicate::Named(predicate.name().to_string())
    }

    /// A predicate registered outside the built-in table.
    pub fn custom(name: impl Into<String>) -> Self {
        Predicate::Named(name.into())
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Predicate::Named(name) => Some(name),
            _ => None,
        }
    }

    pub fn evaluate(
        &self,
        context: &PredicateContext<'_>,
        functions: &PredicateRegistry,
    ) -> Result<bool, RuleError> {
        match self {
            Predicate::Field(predicate) => Ok(source_value(context, &predicate.field)?
                .is_some_and(|value| predicate.operator.apply(&value, &predicate.value))),
            Predicate::Pair(predicate) => {
                let first = source_value(context, &predicate.first)?;
                let second = source_value(context, &predicate.second)?;
                Ok(match (first, second) {
                    (Some(first), Some(second)) => (predicate.combine)(&first, &second),
                    _ => false,
                })
            }
            Predicate::Named(name) => {
                let function = functions.get(name)?;
                function(context)
            }
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Field(p) => write!(f, "{} {} {}", p.field, p.operator, p.value),
            Predicate::Pair(p) => write!(f, "pair({}, {})", p.first, p.second),
            Predicate::Named(name) => f.write_str(name),
        }
    }
}

/// Value of a field on the source form at exactly this visit.
fn source_value(context: &PredicateContext<'_>, field: &str) -> Result<Option<Value>, RuleError> {
    let visit = context.visit();
    let query = Query::new(context.source_entity(), &visit.subject_identifier, field)
        .at(visit.report_datetime);
    let value = context.access().latest(&query)?;
    if value.is_none() && field.eq_ignore_ascii_case(GENDER_FIELD) {
        return Ok(context
            .subject()
            .and_then(|subject| subject.gender)
            .map(Value::from));
    }
    Ok(value)
}
