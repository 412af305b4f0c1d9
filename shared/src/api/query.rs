//! Client for the ClickHouse-over-HTTP query endpoint.

use super::ApiError;
use crate::models::LogRecord;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

/// Seconds before an outstanding request is abandoned.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Longest malformed-row fragment echoed back in errors.
const ROW_FRAGMENT_LEN: usize = 200;

/// Credentials for the query endpoint.
#[derive(Debug, Clone)]
pub enum QueryAuth {
    /// HTTP Basic credentials issued for remote query access.
    Basic {
        /// Query username.
        username: String,
        /// Query password.
        password: String,
    },
    /// Bearer token fallback (the sources API token).
    Bearer(String),
}

impl QueryAuth {
    /// Renders the `Authorization` header value.
    #[must_use]
    pub fn header_value(&self) -> String {
        match self {
            Self::Basic { username, password } => {
                let encoded = STANDARD.encode(format!("{username}:{password}"));
                format!("Basic {encoded}")
            }
            Self::Bearer(token) => format!("Bearer {token}"),
        }
    }
}

/// HTTP client executing SQL against the query endpoint.
///
/// Statements are posted as plain text. The endpoint answers in whatever
/// format the statement names; this client forces `JSONEachRow` (one JSON
/// object per line) unless the statement already carries a format clause.
#[derive(Debug, Clone)]
pub struct QueryClient {
    base_url: String,
    auth: QueryAuth,
    http: reqwest::Client,
}

impl QueryClient {
    /// Creates a client for the given endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Network`] if the underlying HTTP client cannot
    /// be constructed.
    pub fn new(base_url: impl Into<String>, auth: QueryAuth) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            base_url: base_url.into(),
            auth,
            http,
        })
    }

    /// Executes a statement and decodes the response rows.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Network`] on transport failures,
    /// [`ApiError::Auth`] when the endpoint rejects the credentials,
    /// [`ApiError::Status`] for other non-success responses, and
    /// [`ApiError::MalformedRow`] when a response line is not a JSON
    /// object.
    pub async fn execute(&self, sql: &str) -> Result<Vec<LogRecord>, ApiError> {
        let statement = with_response_format(sql);
        debug!(sql = %statement, "executing query");

        let response = self
            .http
            .post(&self.base_url)
            .header(CONTENT_TYPE, "text/plain")
            .header(AUTHORIZATION, self.auth.header_value())
            .body(statement)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                return Err(ApiError::Auth { status });
            }
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }

        let body = response.text().await?;
        parse_rows(&body)
    }
}

/// Appends ` FORMAT JSONEachRow` unless the statement already names a
/// format.
fn with_response_format(sql: &str) -> String {
    let trimmed = sql.trim();
    if trimmed.to_lowercase().contains("format") {
        trimmed.to_string()
    } else {
        format!("{trimmed} FORMAT JSONEachRow")
    }
}

/// Decodes a `JSONEachRow` payload: one JSON object per line, blank lines
/// ignored.
fn parse_rows(body: &str) -> Result<Vec<LogRecord>, ApiError> {
    let mut rows = Vec::new();
    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<serde_json::Value>(line) {
            Ok(serde_json::Value::Object(columns)) => rows.push(LogRecord::new(columns)),
            Ok(_) | Err(_) => {
                let shown: String = line.chars().take(ROW_FRAGMENT_LEN).collect();
                return Err(ApiError::MalformedRow(shown));
            }
        }
    }
    Ok(rows)
}

// ============================================================================
// Tests
// ============================================================================
