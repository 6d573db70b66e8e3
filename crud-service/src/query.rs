//! Query parameters for list operations
//!
//! [`ListQuery`] is the wire surface consumed from the transport layer
//! (`page`, `limit`, `sort`, `startDate`, `endDate`, `isDeleted`) together
//! with the pure translation functions that turn it into pagination bounds,
//! an order specification, and merged filter conditions.
//!
//! # Example
//!
//! ```rust
//! use crud_service::query::{ListQuery, OrderDirection};
//!
//! let query = ListQuery::new()
//!     .with_page(2)
//!     .with_limit(20)
//!     .with_sort("title-asc,createdAt-desc");
//!
//! let page = query.pagination();
//! assert_eq!(page.skip, 20);
//! assert_eq!(page.take, 20);
//!
//! let order = query.order_spec();
//! assert_eq!(order[0], ("title".to_string(), OrderDirection::Asc));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::{CREATED_AT_FIELD, DELETED_AT_FIELD};
use crate::filter::{Condition, Filter};

/// Default page number when the caller omits `page`
pub const DEFAULT_PAGE: u32 = 1;

/// Default page size when the caller omits `limit`
pub const DEFAULT_LIMIT: u32 = 10;

/// Sort direction for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    /// Ascending (A-Z, 0-9, oldest first)
    Asc,
    /// Descending (Z-A, 9-0, newest first)
    Desc,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "asc"),
            Self::Desc => write!(f, "desc"),
        }
    }
}

impl OrderDirection {
    /// Parse a direction keyword, case-insensitively
    #[must_use]
    pub fn parse(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// Ordered list of `(field, direction)` pairs applied left to right
pub type OrderSpec = Vec<(String, OrderDirection)>;

/// The fallback ordering when no valid sort token was given
#[must_use]
pub fn default_order() -> OrderSpec {
    vec![(CREATED_AT_FIELD.to_string(), OrderDirection::Desc)]
}

/// Offset pagination bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Number of rows to skip
    pub skip: u64,
    /// Maximum number of rows to return
    pub take: u64,
}

impl Pagination {
    /// Create pagination bounds directly
    #[must_use]
    pub const fn new(skip: u64, take: u64) -> Self {
        Self { skip, take }
    }

    /// Bounds for a 1-indexed page of the given size
    ///
    /// ```rust
    /// use crud_service::query::Pagination;
    ///
    /// let page = Pagination::page(3, 20);
    /// assert_eq!(page.skip, 40);
    /// assert_eq!(page.take, 20);
    /// ```
    #[must_use]
    pub const fn page(page_number: u64, page_size: u64) -> Self {
        Self {
            skip: page_number.saturating_sub(1) * page_size,
            take: page_size,
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::page(u64::from(DEFAULT_PAGE), u64::from(DEFAULT_LIMIT))
    }
}

/// Sort parameter: a single `field-direction` string (comma-separable) or a
/// sequence of such tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SortParam {
    /// One string, possibly holding several comma-separated tokens
    One(String),
    /// A sequence of tokens
    Many(Vec<String>),
}

impl From<&str> for SortParam {
    fn from(s: &str) -> Self {
        Self::One(s.to_string())
    }
}

impl From<String> for SortParam {
    fn from(s: String) -> Self {
        Self::One(s)
    }
}

impl From<Vec<String>> for SortParam {
    fn from(tokens: Vec<String>) -> Self {
        Self::Many(tokens)
    }
}

/// Query parameters for list operations
///
/// All fields are optional; accessors apply the documented defaults. The
/// date-range filter only activates when both `startDate` and `endDate` are
/// present, and soft-deleted rows are excluded unless `isDeleted` is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    /// Page number, 1-indexed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    /// Items per page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    /// Sort tokens, each formatted `field-direction`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortParam>,

    /// Lower bound of the creation-date range
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,

    /// Upper bound of the creation-date range
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,

    /// Include soft-deleted rows when true
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_deleted: Option<bool>,
}

impl ListQuery {
    /// Create an empty query (all defaults)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page number
    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Set the page size
    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the sort parameter
    #[must_use]
    pub fn with_sort(mut self, sort: impl Into<SortParam>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Set both creation-date bounds
    #[must_use]
    pub fn with_date_range(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start_date = Some(start.into());
        self.end_date = Some(end.into());
        self
    }

    /// Include or exclude soft-deleted rows
    #[must_use]
    pub fn with_deleted(mut self, include: bool) -> Self {
        self.is_deleted = Some(include);
        self
    }

    /// The 1-indexed page number, defaulting to 1
    #[must_use]
    pub fn page_number(&self) -> u32 {
        self.page.unwrap_or(DEFAULT_PAGE).max(1)
    }

    /// The page size, defaulting to 10
    ///
    /// No upper bound is enforced here; capping page sizes is a transport
    /// concern.
    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT).max(1)
    }

    /// Pagination bounds: `skip = (page - 1) * limit`, `take = limit`
    ///
    /// ```rust
    /// use crud_service::query::ListQuery;
    ///
    /// let page = ListQuery::new().pagination();
    /// assert_eq!(page.skip, 0);
    /// assert_eq!(page.take, 10);
    /// ```
    #[must_use]
    pub fn pagination(&self) -> Pagination {
        Pagination::page(u64::from(self.page_number()), u64::from(self.page_size()))
    }

    /// Parse the sort parameter into an order specification
    ///
    /// Tokens split on a hyphen into `(field, direction)`; tokens with a
    /// missing field, missing direction, or unknown direction keyword are
    /// dropped individually. A later token for an already-seen field updates
    /// that field's direction in place. When nothing valid remains the
    /// result is `createdAt DESC`.
    ///
    /// ```rust
    /// use crud_service::query::{ListQuery, OrderDirection};
    ///
    /// let order = ListQuery::new().with_sort("bogus").order_spec();
    /// assert_eq!(order, vec![("createdAt".to_string(), OrderDirection::Desc)]);
    /// ```
    #[must_use]
    pub fn order_spec(&self) -> OrderSpec {
        let Some(sort) = &self.sort else {
            return default_order();
        };

        let tokens: Vec<String> = match sort {
            SortParam::One(s) => s.split(',').map(str::to_string).collect(),
            SortParam::Many(tokens) => tokens.clone(),
        };

        let mut order: OrderSpec = Vec::new();
        for token in &tokens {
            let mut parts = token.trim().split('-');
            let field = parts.next().unwrap_or_default();
            let Some(direction) = parts.next().and_then(OrderDirection::parse) else {
                continue;
            };
            if field.is_empty() {
                continue;
            }
            match order.iter_mut().find(|(existing, _)| existing == field) {
                Some(entry) => entry.1 = direction,
                None => order.push((field.to_string(), direction)),
            }
        }

        if order.is_empty() {
            default_order()
        } else {
            order
        }
    }

    /// Merge this query's conditions into a caller-supplied filter
    ///
    /// Sets `createdAt` to a closed range when both date bounds are present,
    /// then sets `deletedAt IS NULL` unless `isDeleted` is true. Both
    /// reserved fields overwrite any caller condition on the same field;
    /// callers filtering `createdAt` or `deletedAt` directly must not also
    /// pass the corresponding query parameters.
    ///
    /// ```rust
    /// use crud_service::filter::Filter;
    /// use crud_service::query::ListQuery;
    ///
    /// let filter = ListQuery::new().build_filter(Filter::new());
    /// assert!(filter.contains("deletedAt"));
    ///
    /// let filter = ListQuery::new().with_deleted(true).build_filter(Filter::new());
    /// assert!(filter.is_empty());
    /// ```
    #[must_use]
    pub fn build_filter(&self, base: Filter) -> Filter {
        let mut filter = base;

        if let (Some(start), Some(end)) = (&self.start_date, &self.end_date) {
            filter.set(
                CREATED_AT_FIELD,
                Condition::Between(start.clone().into(), end.clone().into()),
            );
        }

        if !self.is_deleted.unwrap_or(false) {
            filter.set(DELETED_AT_FIELD, Condition::IsNull);
        }

        filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_direction_display() {
        assert_eq!(format!("{}", OrderDirection::Asc), "asc");
        assert_eq!(format!("{}", OrderDirection::Desc), "desc");
    }

    #[test]
    fn test_order_direction_parse_case_insensitive() {
        assert_eq!(OrderDirection::parse("asc"), Some(OrderDirection::Asc));
        assert_eq!(OrderDirection::parse("DESC"), Some(OrderDirection::Desc));
        assert_eq!(OrderDirection::parse("Asc"), Some(OrderDirection::Asc));
        assert_eq!(OrderDirection::parse("descending"), None);
        assert_eq!(OrderDirection::parse(""), None);
    }

    #[test]
    fn test_pagination_defaults() {
        let page = ListQuery::new().pagination();
        assert_eq!(page.skip, 0);
        assert_eq!(page.take, 10);
    }

    #[test]
    fn test_pagination_formula() {
        let page = ListQuery::new().with_page(1).with_limit(10).pagination();
        assert_eq!(page.skip, 0);
        assert_eq!(page.take, 10);

        let page = ListQuery::new().with_page(3).with_limit(25).pagination();
        assert_eq!(page.skip, 50);
        assert_eq!(page.take, 25);
    }

    #[test]
    fn test_pagination_no_upper_bound() {
        let page = ListQuery::new().with_limit(5000).pagination();
        assert_eq!(page.take, 5000);
    }

    #[test]
    fn test_pagination_page_zero_treated_as_first() {
        let page = ListQuery::new().with_page(0).pagination();
        assert_eq!(page.skip, 0);
    }

    #[test]
    fn test_order_spec_multiple_tokens() {
        let order = ListQuery::new()
            .with_sort("title-asc,createdAt-desc")
            .order_spec();
        assert_eq!(
            order,
            vec![
                ("title".to_string(), OrderDirection::Asc),
                ("createdAt".to_string(), OrderDirection::Desc),
            ]
        );
    }

    #[test]
    fn test_order_spec_default_when_missing() {
        assert_eq!(ListQuery::new().order_spec(), default_order());
    }

    #[test]
    fn test_order_spec_default_when_all_malformed() {
        let order = ListQuery::new().with_sort("bogus").order_spec();
        assert_eq!(order, default_order());
    }

    #[test]
    fn test_order_spec_drops_malformed_tokens_individually() {
        let order = ListQuery::new()
            .with_sort("title-asc,bogus,author-sideways,-desc")
            .order_spec();
        assert_eq!(order, vec![("title".to_string(), OrderDirection::Asc)]);
    }

    #[test]
    fn test_order_spec_case_insensitive_direction() {
        let order = ListQuery::new().with_sort("title-ASC").order_spec();
        assert_eq!(order, vec![("title".to_string(), OrderDirection::Asc)]);
    }

    #[test]
    fn test_order_spec_trims_tokens() {
        let order = ListQuery::new().with_sort(" title-asc , author-desc ").order_spec();
        assert_eq!(order.len(), 2);
    }

    #[test]
    fn test_order_spec_from_sequence() {
        let order = ListQuery::new()
            .with_sort(vec!["viewCount-desc".to_string(), "title-asc".to_string()])
            .order_spec();
        assert_eq!(
            order,
            vec![
                ("viewCount".to_string(), OrderDirection::Desc),
                ("title".to_string(), OrderDirection::Asc),
            ]
        );
    }

    #[test]
    fn test_order_spec_repeated_field_updates_in_place() {
        let order = ListQuery::new().with_sort("title-asc,title-desc").order_spec();
        assert_eq!(order, vec![("title".to_string(), OrderDirection::Desc)]);
    }

    #[test]
    fn test_build_filter_excludes_deleted_by_default() {
        let filter = ListQuery::new().build_filter(Filter::new());
        assert!(filter.contains(DELETED_AT_FIELD));
    }

    #[test]
    fn test_build_filter_keeps_deleted_when_requested() {
        let filter = ListQuery::new().with_deleted(true).build_filter(Filter::new());
        assert!(!filter.contains(DELETED_AT_FIELD));
    }

    #[test]
    fn test_build_filter_date_range_requires_both_bounds() {
        let both = ListQuery::new()
            .with_date_range("2024-01-01", "2024-01-31")
            .build_filter(Filter::new());
        assert!(both.contains(CREATED_AT_FIELD));

        let mut only_start = ListQuery::new();
        only_start.start_date = Some("2024-01-01".to_string());
        assert!(!only_start.build_filter(Filter::new()).contains(CREATED_AT_FIELD));

        let mut only_end = ListQuery::new();
        only_end.end_date = Some("2024-01-31".to_string());
        assert!(!only_end.build_filter(Filter::new()).contains(CREATED_AT_FIELD));
    }

    #[test]
    fn test_build_filter_preserves_caller_conditions() {
        let base = Filter::new().eq("title", "A");
        let filter = ListQuery::new().build_filter(base);
        assert!(filter.contains("title"));
        assert!(filter.contains(DELETED_AT_FIELD));
    }

    #[test]
    fn test_build_filter_reserved_fields_overwrite_caller() {
        let base = Filter::new().is_not_null(DELETED_AT_FIELD);
        let filter = ListQuery::new().build_filter(base);
        assert_eq!(filter.get(DELETED_AT_FIELD), Some(&Condition::IsNull));
    }

    #[test]
    fn test_list_query_serde_wire_names() {
        let json = r#"{"page":2,"limit":20,"sort":"title-asc","startDate":"2024-01-01","endDate":"2024-01-31","isDeleted":false}"#;
        let query: ListQuery = serde_json::from_str(json).unwrap();
        assert_eq!(query.page, Some(2));
        assert_eq!(query.start_date.as_deref(), Some("2024-01-01"));
        assert_eq!(query.is_deleted, Some(false));
        assert_eq!(query.sort, Some(SortParam::One("title-asc".to_string())));
    }

    #[test]
    fn test_sort_param_accepts_sequence() {
        let json = r#"{"sort":["title-asc","createdAt-desc"]}"#;
        let query: ListQuery = serde_json::from_str(json).unwrap();
        assert_eq!(query.order_spec().len(), 2);
    }
}
