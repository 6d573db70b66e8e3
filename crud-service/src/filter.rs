//! Field filters for selecting entities
//!
//! A [`Filter`] maps field names to match conditions and is evaluated against
//! the serialized form of an entity. Filters are the only selection mechanism
//! the storage contract understands: callers build them directly or let the
//! query translator merge date-range and soft-delete visibility conditions in.
//!
//! # Example
//!
//! ```rust
//! use crud_service::filter::Filter;
//! use serde_json::json;
//!
//! let filter = Filter::new()
//!     .eq("title", "Hello")
//!     .is_null("deletedAt");
//!
//! let row = json!({"id": 1, "title": "Hello", "deletedAt": null});
//! assert!(filter.matches(&row));
//! ```

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use crate::entity::{DELETED_AT_FIELD, ID_FIELD};

/// A match condition on a single field
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals the given value
    Equals(Value),
    /// Field lies in the closed range `[low, high]`
    Between(Value, Value),
    /// Field is null or absent
    IsNull,
    /// Field is present and non-null
    IsNotNull,
}

impl Condition {
    /// Evaluate the condition against a field value (`None` = absent)
    fn matches(&self, value: Option<&Value>) -> bool {
        let value = value.unwrap_or(&Value::Null);
        match self {
            Self::Equals(expected) => {
                compare(value, expected) == Some(Ordering::Equal) || value == expected
            }
            Self::Between(low, high) => matches!(
                (compare(value, low), compare(value, high)),
                (Some(Ordering::Greater | Ordering::Equal), Some(Ordering::Less | Ordering::Equal))
            ),
            Self::IsNull => value.is_null(),
            Self::IsNotNull => !value.is_null(),
        }
    }

    /// Diagnostic JSON form, used for display and serialization
    fn as_value(&self) -> Value {
        match self {
            Self::Equals(v) => v.clone(),
            Self::Between(low, high) => json!({ "between": [low, high] }),
            Self::IsNull => Value::Null,
            Self::IsNotNull => json!({ "not": null }),
        }
    }
}

/// A predicate over entity fields
///
/// Maps field names to [`Condition`]s; a row matches when every condition
/// holds. Constructors follow the builder pattern:
///
/// ```rust
/// use crud_service::filter::Filter;
///
/// let active_admins = Filter::new()
///     .eq("role", "admin")
///     .is_null("deletedAt");
/// assert_eq!(active_admins.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: BTreeMap<String, Condition>,
}

impl Filter {
    /// Create an empty filter (matches every row)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a filter matching a single identifier
    ///
    /// ```rust
    /// use crud_service::filter::Filter;
    ///
    /// let filter = Filter::by_id(7);
    /// assert!(filter.contains("id"));
    /// ```
    #[must_use]
    pub fn by_id(id: i64) -> Self {
        Self::new().eq(ID_FIELD, id)
    }

    /// Add an equality condition
    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions
            .insert(field.into(), Condition::Equals(value.into()));
        self
    }

    /// Add a closed-range condition (`low <= field <= high`)
    #[must_use]
    pub fn between(
        mut self,
        field: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        self.conditions
            .insert(field.into(), Condition::Between(low.into(), high.into()));
        self
    }

    /// Add an is-null condition
    #[must_use]
    pub fn is_null(mut self, field: impl Into<String>) -> Self {
        self.conditions.insert(field.into(), Condition::IsNull);
        self
    }

    /// Add an is-not-null condition
    #[must_use]
    pub fn is_not_null(mut self, field: impl Into<String>) -> Self {
        self.conditions.insert(field.into(), Condition::IsNotNull);
        self
    }

    /// Set a condition, replacing any existing one on the same field
    pub fn set(&mut self, field: impl Into<String>, condition: Condition) {
        self.conditions.insert(field.into(), condition);
    }

    /// Whether the filter constrains the given field
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.conditions.contains_key(field)
    }

    /// The condition on a field, if any
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Condition> {
        self.conditions.get(field)
    }

    /// Number of constrained fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// Whether the filter has no conditions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Iterate over `(field, condition)` pairs in field order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Condition)> {
        self.conditions.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Evaluate the filter against a serialized row
    ///
    /// Every condition must hold; an empty filter matches everything.
    #[must_use]
    pub fn matches(&self, row: &Value) -> bool {
        self.conditions
            .iter()
            .all(|(field, condition)| condition.matches(row.get(field)))
    }

    /// Exclude soft-deleted rows unless the filter already constrains
    /// `deletedAt`
    ///
    /// Lookups for a concrete target go through this so that a logically
    /// deleted row never satisfies an existence or duplicate check, while a
    /// caller explicitly filtering on `deletedAt` keeps full control.
    ///
    /// ```rust
    /// use crud_service::filter::Filter;
    ///
    /// let filter = Filter::by_id(1).excluding_deleted();
    /// assert!(filter.contains("deletedAt"));
    ///
    /// let explicit = Filter::by_id(1).is_not_null("deletedAt").excluding_deleted();
    /// assert_eq!(explicit.len(), 2);
    /// ```
    #[must_use]
    pub fn excluding_deleted(mut self) -> Self {
        if !self.conditions.contains_key(DELETED_AT_FIELD) {
            self.conditions
                .insert(DELETED_AT_FIELD.to_string(), Condition::IsNull);
        }
        self
    }

    /// Diagnostic JSON form of the whole filter
    #[must_use]
    pub fn as_value(&self) -> Value {
        Value::Object(
            self.conditions
                .iter()
                .map(|(field, condition)| (field.clone(), condition.as_value()))
                .collect(),
        )
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_value())
    }
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_value().serialize(serializer)
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_value().serialize(serializer)
    }
}

/// Order two scalar JSON values, coercing temporal strings
///
/// Numbers compare numerically, booleans as `false < true`, and strings
/// lexically unless both parse as timestamps or calendar dates, in which case
/// they compare as instants. Mixed or non-scalar operands are incomparable.
pub(crate) fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => match (parse_instant(x), parse_instant(y)) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => Some(x.cmp(y)),
        },
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Coerce a string to an instant: RFC 3339, `YYYY-MM-DD`, or
/// `YYYY-MM-DD HH:MM:SS`; calendar dates resolve to midnight UTC
fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    None
}
