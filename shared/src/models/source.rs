//! Source models for the management API.

use serde::{Deserialize, Serialize};

/// A log source as returned by the sources API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Server-assigned identifier.
    pub id: String,
    /// Resource type tag, normally `source`.
    #[serde(rename = "type")]
    pub kind: String,
    /// The source's attributes.
    pub attributes: SourceAttributes,
}

/// Attributes of a log source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceAttributes {
    /// Human-readable source name, unique per team.
    pub name: String,
    /// Team that owns the source.
    pub team_id: u64,
    /// Table-name stem the ingest pipeline writes to.
    pub table_name: String,
    /// Ingest platform tag, e.g. `http` or `kubernetes`.
    #[serde(default)]
    pub platform: String,
    /// Ingest token.
    #[serde(default)]
    pub token: String,
    /// Creation timestamp, as sent by the server.
    #[serde(default)]
    pub created_at: String,
    /// Last-update timestamp, as sent by the server.
    #[serde(default)]
    pub updated_at: String,
    /// Whether ingestion is currently paused.
    #[serde(default)]
    pub ingesting_paused: bool,
    /// Rows ingested so far.
    #[serde(default)]
    pub messages_count: u64,
    /// Bytes ingested so far.
    #[serde(default)]
    pub bytes_count: u64,
}

impl Source {
    /// The queryable log table for this source.
    ///
    /// # Example
    ///
    /// ```
    /// # use shared::models::{Source, SourceAttributes};
    /// # let source: Source = serde_json::from_str(r#"{
    /// #   "id": "1", "type": "source",
    /// #   "attributes": {"name": "app", "team_id": 123, "table_name": "app"}
    /// # }"#).unwrap();
    /// assert_eq!(source.log_table(), "t123_app_logs");
    /// ```
    #[must_use]
    pub fn log_table(&self) -> String {
        format!(
            "t{}_{}_logs",
            self.attributes.team_id, self.attributes.table_name
        )
    }
}

/// One page of the sources listing.
#[derive(Debug, Clone, Deserialize)]
pub struct SourcesPage {
    /// The sources on this page.
    pub data: Vec<Source>,
    /// Links to neighboring pages.
    #[serde(default)]
    pub pagination: Pagination,
}

/// Pagination links attached to a listing response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pagination {
    /// URL of the first page.
    pub first: Option<String>,
    /// URL of the last page.
    pub last: Option<String>,
    /// URL of the previous page, absent on the first.
    pub prev: Option<String>,
    /// URL of the next page, absent on the last.
    pub next: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "data": [
            {
                "id": "12045",
                "type": "source",
                "attributes": {
                    "name": "sweetistics-dev",
                    "team_id": 12345,
                    "table_name": "sweetistics_dev",
                    "platform": "http",
                    "token": "abcdef123456",
                    "ingesting_paused": false,
                    "messages_count": 420000,
                    "bytes_count": 1073741824
                }
            }
        ],
        "pagination": {
            "first": "https://telemetry.example.com/api/v1/sources?page=1",
            "last": "https://telemetry.example.com/api/v1/sources?page=1",
            "prev": null,
            "next": null
        }
    }"#;

    #[test]
    fn test_page_deserializes() {
        let page: SourcesPage = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(page.data.len(), 1);
        let source = &page.data[0];
        assert_eq!(source.id, "12045");
        assert_eq!(source.attributes.name, "sweetistics-dev");
        assert_eq!(source.attributes.team_id, 12345);
        assert!(page.pagination.next.is_none());
    }

    #[test]
    fn test_log_table_combines_team_and_table_name() {
        let page: SourcesPage = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(page.data[0].log_table(), "t12345_sweetistics_dev_logs");
    }

    #[test]
    fn test_missing_optional_attributes_default() {
        let json = r#"{
            "id": "7", "type": "source",
            "attributes": {"name": "bare", "team_id": 1, "table_name": "bare"}
        }"#;
        let source: Source = serde_json::from_str(json).unwrap();
        assert_eq!(source.attributes.platform, "");
        assert_eq!(source.attributes.messages_count, 0);
        assert!(!source.attributes.ingesting_paused);
    }
}
