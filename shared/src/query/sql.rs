//! ClickHouse SQL rendering.
//!
//! [`build_sql`] turns a [`QueryOptions`] into one `SELECT` statement with
//! a fixed shape: field list, table, `AND`-joined predicates (time bounds,
//! level, subsystem, where entries, search), `ORDER BY`, `LIMIT`.
//! Rendering is deterministic: identical options always yield byte-identical
//! SQL.
//!
//! Identifiers are double-quoted and restricted to `[A-Za-z0-9_]`; string
//! values are single-quoted with embedded quotes doubled. Nothing else from
//! the input ever reaches the statement.

use super::error::QueryError;
use super::options::{FieldSelection, QueryOptions};
use crate::models::{MESSAGE_COLUMN, TIMESTAMP_COLUMN};
use crate::time;

/// Row cap applied when the options carry no explicit limit.
pub const DEFAULT_LIMIT: u64 = 100;

/// Renders one `SELECT` statement for the given table.
///
/// # Errors
///
/// Returns [`QueryError::UnsafeIdentifier`] when the table, a selected
/// column, or a where-filter key contains characters outside `[A-Za-z0-9_]`,
/// and [`QueryError::FieldSelection`] when an explicit column list is empty.
///
/// # Example
///
/// ```
/// use shared::query::{build_sql, QueryOptions};
///
/// let options = QueryOptions::new().with_level("error").with_limit(10);
/// let sql = build_sql(&options, "t123_app_logs").unwrap();
/// assert_eq!(
///     sql,
///     "SELECT * FROM \"t123_app_logs\" WHERE \"level\" = 'error' \
///      ORDER BY \"dt\" DESC LIMIT 10"
/// );
/// ```
pub fn build_sql(options: &QueryOptions, table: &str) -> Result<String, QueryError> {
    ensure_identifier(table)?;

    let mut sql = String::from("SELECT ");
    match &options.fields {
        FieldSelection::All => sql.push('*'),
        FieldSelection::Columns(columns) => {
            if columns.is_empty() {
                return Err(QueryError::FieldSelection(
                    "field selection cannot be empty".to_string(),
                ));
            }
            for (index, column) in columns.iter().enumerate() {
                ensure_identifier(column)?;
                if index > 0 {
                    sql.push_str(", ");
                }
                sql.push_str(&format!("\"{column}\""));
            }
        }
    }
    sql.push_str(&format!(" FROM \"{table}\""));

    let mut predicates: Vec<String> = Vec::new();
    if let Some(since) = options.since {
        predicates.push(format!(
            "\"{TIMESTAMP_COLUMN}\" >= toDateTime64('{}', 3)",
            time::clickhouse_datetime(since)
        ));
    }
    if let Some(until) = options.until {
        predicates.push(format!(
            "\"{TIMESTAMP_COLUMN}\" < toDateTime64('{}', 3)",
            time::clickhouse_datetime(until)
        ));
    }
    if let Some(level) = &options.level {
        predicates.push(format!("\"level\" = '{}'", escape_literal(level)));
    }
    if let Some(subsystem) = &options.subsystem {
        predicates.push(format!("\"subsystem\" = '{}'", escape_literal(subsystem)));
    }
    for (key, value) in &options.where_filters {
        ensure_identifier(key)?;
        predicates.push(format!("\"{key}\" = '{}'", escape_literal(value)));
    }
    if let Some(pattern) = &options.search_pattern {
        predicates.push(format!(
            "\"{MESSAGE_COLUMN}\" LIKE '%{}%'",
            escape_literal(pattern)
        ));
    }
    if !predicates.is_empty() {
        sql.push_str(&format!(" WHERE {}", predicates.join(" AND ")));
    }

    sql.push_str(&format!(
        " ORDER BY \"{TIMESTAMP_COLUMN}\" {} LIMIT {}",
        options.order.keyword(),
        options.limit.unwrap_or(DEFAULT_LIMIT)
    ));

    Ok(sql)
}

/// Doubles embedded single quotes so a value can sit inside a SQL string
/// literal.
#[must_use]
pub fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// Rejects identifiers containing anything outside `[A-Za-z0-9_]`.
///
/// # Errors
///
/// Returns [`QueryError::UnsafeIdentifier`] carrying the rejected name.
pub fn ensure_identifier(name: &str) -> Result<(), QueryError> {
    let safe = !name.is_empty()
        && name
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || byte == b'_');
    if safe {
        Ok(())
    } else {
        Err(QueryError::UnsafeIdentifier(name.to_string()))
    }
}

// ============================================================================
// Tests
// ============================================================================
