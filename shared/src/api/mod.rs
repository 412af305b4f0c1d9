//! HTTP clients for the query and sources endpoints.
//!
//! [`QueryClient`] posts SQL to the ClickHouse-compatible query endpoint
//! and decodes `JSONEachRow` responses; [`SourcesClient`] talks to the
//! sources management API. Both carry their own credentials and a 30
//! second request timeout.

mod query;
mod sources;

pub use query::{QueryAuth, QueryClient};
pub use sources::{SourcesClient, SOURCES_BASE_URL};

use thiserror::Error;

/// Errors from the HTTP transport layer.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection, TLS, timeout, or other network-level failure.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server rejected the request.
    #[error("Request failed with status {status}: {body}")]
    Status {
        /// HTTP status code of the response.
        status: reqwest::StatusCode,
        /// Response body, as far as it could be read.
        body: String,
    },

    /// The query endpoint rejected the credentials.
    #[error(
        "Query endpoint authentication failed ({status}). The query endpoint \
         takes its own credentials: set LOQ_QUERY_USERNAME and \
         LOQ_QUERY_PASSWORD, or check the token"
    )]
    Auth {
        /// HTTP status code of the rejection.
        status: reqwest::StatusCode,
    },

    /// A response line was not a JSON object.
    #[error("Malformed response row: {0}")]
    MalformedRow(String),
}
