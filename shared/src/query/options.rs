//! The normalized query model.
//!
//! [`QueryOptions`] is the single intermediate representation between the
//! two front ends (the query-language parser and the CLI flag layer) and
//! the SQL builder. Both front ends normalize into it; nothing downstream
//! ever sees raw query text or raw flags.

use super::error::QueryError;
use super::sql;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Column selection for the `SELECT` clause.
///
/// The wildcard is exclusive: a selection is either every column or an
/// explicit list, never a mix.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FieldSelection {
    /// Select every column (`*`).
    #[default]
    All,
    /// Select the named columns, in order.
    Columns(Vec<String>),
}

impl FieldSelection {
    /// Builds a named selection, collapsing duplicates to their first
    /// occurrence.
    #[must_use]
    pub fn columns<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut columns: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if !columns.iter().any(|existing| *existing == name) {
                columns.push(name);
            }
        }
        Self::Columns(columns)
    }
}

/// Row ordering by the timestamp column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Oldest rows first.
    Ascending,
    /// Newest rows first.
    #[default]
    Descending,
}

impl SortOrder {
    /// The SQL keyword for the `ORDER BY` clause.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// Normalized query intent.
///
/// # Example
///
/// ```
/// use shared::query::{QueryOptions, SortOrder};
///
/// let options = QueryOptions::new()
///     .with_limit(20)
///     .with_level("ERROR")
///     .with_order(SortOrder::Ascending)
///     .validated()
///     .unwrap();
/// assert_eq!(options.level.as_deref(), Some("error"));
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Columns for the `SELECT` clause.
    pub fields: FieldSelection,
    /// Log level equality filter, stored lowercase.
    pub level: Option<String>,
    /// Subsystem equality filter.
    pub subsystem: Option<String>,
    /// Inclusive lower time bound.
    pub since: Option<DateTime<Utc>>,
    /// Exclusive upper time bound.
    pub until: Option<DateTime<Utc>>,
    /// Maximum number of rows; `None` lets the SQL builder apply its
    /// default cap.
    pub limit: Option<u64>,
    /// Column equality filters as ordered key/value pairs.
    pub where_filters: Vec<(String, String)>,
    /// Free-text pattern matched against the message column.
    pub search_pattern: Option<String>,
    /// Row ordering by the timestamp column.
    pub order: SortOrder,
}

impl QueryOptions {
    /// Creates options with the defaults: all columns, no filters,
    /// newest rows first.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the column selection.
    #[must_use]
    pub fn with_fields(mut self, fields: FieldSelection) -> Self {
        self.fields = fields;
        self
    }

    /// Sets the level filter, normalizing to lowercase.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into().to_lowercase());
        self
    }

    /// Sets the subsystem filter.
    #[must_use]
    pub fn with_subsystem(mut self, subsystem: impl Into<String>) -> Self {
        self.subsystem = Some(subsystem.into());
        self
    }

    /// Sets the inclusive lower time bound.
    #[must_use]
    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    /// Sets the exclusive upper time bound.
    #[must_use]
    pub fn with_until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    /// Caps the number of rows returned.
    #[must_use]
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Adds one column equality filter.
    #[must_use]
    pub fn with_where_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert_where(key, value);
        self
    }

    /// Sets the free-text search pattern.
    #[must_use]
    pub fn with_search(mut self, pattern: impl Into<String>) -> Self {
        self.search_pattern = Some(pattern.into());
        self
    }

    /// Sets the row ordering.
    #[must_use]
    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    /// Inserts a column equality filter.
    ///
    /// A duplicate key keeps its original position but takes the new
    /// value, so repeated filters behave like map updates.
    pub fn insert_where(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self
            .where_filters
            .iter_mut()
            .find(|(existing, _)| *existing == key)
        {
            Some(entry) => entry.1 = value,
            None => self.where_filters.push((key, value)),
        }
    }

    /// Checks the cross-field invariants and returns the options unchanged.
    ///
    /// # Errors
    ///
    /// - [`QueryError::Syntax`] when the limit is zero
    /// - [`QueryError::InvalidRange`] when `since` lies after `until`
    /// - [`QueryError::FieldSelection`] when an explicit column list is empty
    /// - [`QueryError::UnsafeIdentifier`] when a column name or filter key
    ///   contains characters outside `[A-Za-z0-9_]`
    pub fn validated(self) -> Result<Self, QueryError> {
        if self.limit == Some(0) {
            return Err(QueryError::Syntax("limit must be at least 1".to_string()));
        }
        if let (Some(since), Some(until)) = (self.since, self.until) {
            if since > until {
                return Err(QueryError::InvalidRange { since, until });
            }
        }
        if let FieldSelection::Columns(columns) = &self.fields {
            if columns.is_empty() {
                return Err(QueryError::FieldSelection(
                    "field selection cannot be empty".to_string(),
                ));
            }
            for column in columns {
                sql::ensure_identifier(column)?;
            }
        }
        for (key, _) in &self.where_filters {
            sql::ensure_identifier(key)?;
        }
        Ok(self)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_options() {
        let options = QueryOptions::new();
        assert_eq!(options.fields, FieldSelection::All);
        assert_eq!(options.level, None);
        assert_eq!(options.limit, None);
        assert_eq!(options.order, SortOrder::Descending);
        assert!(options.where_filters.is_empty());
    }

    #[test]
    fn test_level_is_lowercased() {
        let options = QueryOptions::new().with_level("ERROR");
        assert_eq!(options.level.as_deref(), Some("error"));
    }

    #[test]
    fn test_field_selection_deduplicates_keeping_first() {
        let fields = FieldSelection::columns(["dt", "message", "dt", "level"]);
        assert_eq!(
            fields,
            FieldSelection::Columns(vec![
                "dt".to_string(),
                "message".to_string(),
                "level".to_string(),
            ])
        );
    }

    #[test]
    fn test_where_entries_keep_insertion_order() {
        let options = QueryOptions::new()
            .with_where_entry("requestId", "abc")
            .with_where_entry("userId", "42");
        assert_eq!(
            options.where_filters,
            vec![
                ("requestId".to_string(), "abc".to_string()),
                ("userId".to_string(), "42".to_string()),
            ]
        );
    }

    #[test]
    fn test_duplicate_where_key_takes_last_value_in_place() {
        let options = QueryOptions::new()
            .with_where_entry("requestId", "first")
            .with_where_entry("userId", "42")
            .with_where_entry("requestId", "second");
        assert_eq!(
            options.where_filters,
            vec![
                ("requestId".to_string(), "second".to_string()),
                ("userId".to_string(), "42".to_string()),
            ]
        );
    }

    #[test]
    fn test_validated_rejects_zero_limit() {
        let result = QueryOptions::new().with_limit(0).validated();
        assert!(matches!(result, Err(QueryError::Syntax(_))));
    }

    #[test]
    fn test_validated_accepts_limit_of_one() {
        assert!(QueryOptions::new().with_limit(1).validated().is_ok());
    }

    #[test]
    fn test_validated_rejects_inverted_range() {
        let since = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let until = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        let result = QueryOptions::new()
            .with_since(since)
            .with_until(until)
            .validated();
        assert!(matches!(result, Err(QueryError::InvalidRange { .. })));
    }

    #[test]
    fn test_validated_accepts_equal_bounds() {
        let bound = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let result = QueryOptions::new()
            .with_since(bound)
            .with_until(bound)
            .validated();
        assert!(result.is_ok());
    }

    #[test]
    fn test_validated_rejects_empty_column_list() {
        let result = QueryOptions::new()
            .with_fields(FieldSelection::Columns(Vec::new()))
            .validated();
        assert!(matches!(result, Err(QueryError::FieldSelection(_))));
    }

    #[test]
    fn test_validated_rejects_unsafe_column_name() {
        let result = QueryOptions::new()
            .with_fields(FieldSelection::columns(["dt; DROP TABLE logs"]))
            .validated();
        assert!(matches!(result, Err(QueryError::UnsafeIdentifier(name)) if name.contains("DROP")));
    }

    #[test]
    fn test_validated_rejects_unsafe_where_key() {
        let result = QueryOptions::new()
            .with_where_entry("user-id", "42")
            .validated();
        assert!(matches!(result, Err(QueryError::UnsafeIdentifier(name)) if name == "user-id"));
    }

    #[test]
    fn test_sort_order_keywords() {
        assert_eq!(SortOrder::Ascending.keyword(), "ASC");
        assert_eq!(SortOrder::Descending.keyword(), "DESC");
    }
}
