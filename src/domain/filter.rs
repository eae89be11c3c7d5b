//! Listing filters.
//!
//! A [`Filter`] is a conjunction of field conditions. The pagination engine
//! never looks inside it: it is handed to the store, which interprets it
//! against the record's serialized fields, and echoed back in the result.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::IndexError;

/// Comparison operator of a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
}

impl FilterOp {
    /// SQL spelling of the operator.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }

    const fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering.is_eq(),
            Self::Ne => ordering.is_ne(),
            Self::Gt => ordering.is_gt(),
            Self::Gte => ordering.is_ge(),
            Self::Lt => ordering.is_lt(),
            Self::Lte => ordering.is_le(),
        }
    }
}

/// Right-hand side of a [`Condition`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Boolean field.
    Bool(bool),
    /// Unsigned integer field.
    Number(u64),
    /// Text field (hashes, addresses and amounts are text).
    Text(String),
}

/// A single `field <op> value` predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// Serialized field name of the record.
    pub field: String,
    /// Comparison operator.
    pub op: FilterOp,
    /// Value to compare against.
    pub value: FilterValue,
}

/// Conjunction of conditions scoping a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    /// Filter matching every record.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Adds an equality condition.
    #[must_use]
    pub fn where_eq(self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.with(field, FilterOp::Eq, value)
    }

    /// Adds an arbitrary condition.
    #[must_use]
    pub fn with(
        mut self,
        field: impl Into<String>,
        op: FilterOp,
        value: impl Into<FilterValue>,
    ) -> Self {
        self.conditions.push(Condition {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    /// Returns the conditions in insertion order.
    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Returns `true` if the filter matches every record.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Checks that every field name is a plain identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidFilter`] naming the first bad field.
    pub fn validate(&self) -> Result<(), IndexError> {
        for condition in &self.conditions {
            let field = condition.field.as_str();
            let plain = !field.is_empty()
                && field
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
            if !plain {
                return Err(IndexError::InvalidFilter(format!("bad field name `{field}`")));
            }
        }
        Ok(())
    }

    /// Evaluates the filter against a record serialized as a JSON object.
    ///
    /// Missing fields and type mismatches never match.
    #[must_use]
    pub fn matches(&self, record: &Value) -> bool {
        self.conditions.iter().all(|condition| {
            record
                .get(&condition.field)
                .and_then(|field| compare(field, &condition.value))
                .is_some_and(|ordering| condition.op.accepts(ordering))
        })
    }
}

fn compare(field: &Value, value: &FilterValue) -> Option<Ordering> {
    match (field, value) {
        (Value::Bool(a), FilterValue::Bool(b)) => Some(a.cmp(b)),
        (Value::Number(a), FilterValue::Number(b)) => a.as_u64().map(|a| a.cmp(b)),
        (Value::String(a), FilterValue::Text(b)) => Some(a.as_str().cmp(b.as_str())),
        _ => None,
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<u64> for FilterValue {
    fn from(value: u64) -> Self {
        Self::Number(value)
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_filter_matches_everything() {
        assert!(Filter::all().matches(&json!({ "anything": 1 })));
    }

    #[test]
    fn conditions_are_conjunctive() {
        let filter = Filter::all()
            .where_eq("sender", "0xaa")
            .with("block_number", FilterOp::Gte, 10u64);
        assert!(filter.matches(&json!({ "sender": "0xaa", "block_number": 12 })));
        assert!(!filter.matches(&json!({ "sender": "0xaa", "block_number": 9 })));
        assert!(!filter.matches(&json!({ "sender": "0xbb", "block_number": 12 })));
    }

    #[test]
    fn type_mismatch_never_matches() {
        let filter = Filter::all().where_eq("validator_id", "7");
        assert!(!filter.matches(&json!({ "validator_id": 7 })));
    }

    #[test]
    fn validate_rejects_odd_field_names() {
        assert!(Filter::all().where_eq("block_number", 1u64).validate().is_ok());
        assert!(Filter::all().where_eq("payload'--", 1u64).validate().is_err());
        assert!(Filter::all().where_eq("", 1u64).validate().is_err());
    }

    #[test]
    fn deserializes_from_condition_list() {
        let raw = r#"[{"field":"restaked","op":"eq","value":true}]"#;
        let Ok(filter) = serde_json::from_str::<Filter>(raw) else {
            panic!("filter should parse");
        };
        assert_eq!(filter.conditions().len(), 1);
        assert!(filter.matches(&json!({ "restaked": true })));
    }
}
