//! Result-row model for query responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Column holding the row timestamp in every log table.
pub const TIMESTAMP_COLUMN: &str = "dt";

/// Column holding the log message.
pub const MESSAGE_COLUMN: &str = "message";

/// Column under which multi-source operations tag the originating source.
pub const SOURCE_COLUMN: &str = "source";

/// A single log row as returned by the query endpoint.
///
/// Rows are schemaless: whatever columns the `SELECT` named come back as
/// members of a JSON object, and commands that touch several sources tag
/// each row with the source name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogRecord(Map<String, Value>);

impl LogRecord {
    /// Wraps a decoded response row.
    #[must_use]
    pub fn new(columns: Map<String, Value>) -> Self {
        Self(columns)
    }

    /// All columns of the row, keyed by name.
    #[must_use]
    pub fn columns(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    /// Looks up a column and narrows it to a string.
    #[must_use]
    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.0.get(column).and_then(Value::as_str)
    }

    /// The raw timestamp column, as sent by the server.
    #[must_use]
    pub fn dt(&self) -> Option<&str> {
        self.get_str(TIMESTAMP_COLUMN)
    }

    /// The timestamp column parsed to UTC, when present and well-formed.
    #[must_use]
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.dt().and_then(crate::time::parse_timestamp)
    }

    /// Tags the row with the source it came from, replacing any existing
    /// tag.
    pub fn set_source(&mut self, name: &str) {
        self.0
            .insert(SOURCE_COLUMN.to_string(), Value::String(name.to_string()));
    }

    /// The source tag, when the row carries one.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.get_str(SOURCE_COLUMN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> LogRecord {
        match value {
            Value::Object(map) => LogRecord::new(map),
            _ => panic!("expected a JSON object"),
        }
    }

    #[test]
    fn test_get_str_narrows_string_columns() {
        let row = record(json!({"dt": "2024-01-15 10:30:00.123", "count": 3}));
        assert_eq!(row.get_str("dt"), Some("2024-01-15 10:30:00.123"));
        assert_eq!(row.get_str("count"), None);
        assert_eq!(row.get("count"), Some(&json!(3)));
    }

    #[test]
    fn test_timestamp_parses_clickhouse_format() {
        let row = record(json!({"dt": "2024-01-15 10:30:00.123"}));
        let ts = row.timestamp().unwrap();
        assert_eq!(ts.timestamp_subsec_millis(), 123);
    }

    #[test]
    fn test_timestamp_is_none_without_dt_column() {
        let row = record(json!({"message": "hello"}));
        assert_eq!(row.timestamp(), None);
    }

    #[test]
    fn test_source_tag_overwrites_existing_value() {
        let mut row = record(json!({"source": "old", "message": "hi"}));
        row.set_source("sweetistics-dev");
        assert_eq!(row.source(), Some("sweetistics-dev"));
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let row = record(json!({"dt": "2024-01-15 10:30:00", "message": "ok"}));
        let text = serde_json::to_string(&row).unwrap();
        assert!(text.starts_with('{'));
        assert!(text.contains("\"message\":\"ok\""));
    }
}
