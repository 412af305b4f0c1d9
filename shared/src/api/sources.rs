//! Client for the sources management API.

use super::ApiError;
use crate::models::{Source, SourcesPage};
use reqwest::header::AUTHORIZATION;
use std::time::Duration;
use tracing::debug;

/// Base URL of the sources API.
pub const SOURCES_BASE_URL: &str = "https://telemetry.betterstack.com/api/v1";

/// Sources fetched per page when listing.
const PAGE_SIZE: u32 = 50;

/// Seconds before an outstanding request is abandoned.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// HTTP client for listing and looking up log sources.
#[derive(Debug, Clone)]
pub struct SourcesClient {
    base_url: String,
    token: String,
    http: reqwest::Client,
}

impl SourcesClient {
    /// Creates a client against the standard endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Network`] if the underlying HTTP client cannot
    /// be constructed.
    pub fn new(token: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_base_url(SOURCES_BASE_URL, token)
    }

    /// Creates a client against a non-standard base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Network`] if the underlying HTTP client cannot
    /// be constructed.
    pub fn with_base_url(
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            base_url: base_url.into(),
            token: token.into(),
            http,
        })
    }

    /// Fetches every source, following pagination to the last page.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Network`] on transport failures and
    /// [`ApiError::Status`] for non-success responses.
    pub async fn list_all(&self) -> Result<Vec<Source>, ApiError> {
        let mut sources = Vec::new();
        let mut page = 1;
        loop {
            let batch = self.page(page).await?;
            let has_more = batch.pagination.next.is_some();
            sources.extend(batch.data);
            if !has_more {
                break;
            }
            page += 1;
        }
        Ok(sources)
    }

    /// Finds a source by its exact name.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Network`] on transport failures and
    /// [`ApiError::Status`] for non-success responses.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Source>, ApiError> {
        let sources = self.list_all().await?;
        Ok(sources
            .into_iter()
            .find(|source| source.attributes.name == name))
    }

    async fn page(&self, page: u32) -> Result<SourcesPage, ApiError> {
        let url = format!(
            "{}/sources?page={page}&per_page={PAGE_SIZE}",
            self.base_url
        );
        debug!(%url, "fetching sources page");

        let response = self
            .http
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }
        Ok(response.json().await?)
    }
}

// ============================================================================
// Tests
// ============================================================================
