//! Multi-source correlation: fan-out queries and chronological merging.
//!
//! Tracing a request id runs the same query against every target source
//! in the order given, tags each row with its source, and merges the
//! batches oldest-first. The merge is stable: rows with equal timestamps
//! keep the source-list order, so repeated runs against the same data
//! produce identical output.

use crate::api::{ApiError, QueryClient};
use crate::models::LogRecord;
use crate::query::{build_sql, QueryError, QueryOptions, SortOrder};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Column the correlation filter matches against.
pub const REQUEST_ID_COLUMN: &str = "requestId";

/// One source resolved to its queryable table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTarget {
    /// Source name, used to tag rows and break merge ties.
    pub source: String,
    /// Table identifier the SQL runs against.
    pub table: String,
}

impl QueryTarget {
    /// Pairs a source name with its table.
    #[must_use]
    pub fn new(source: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            table: table.into(),
        }
    }
}

/// Errors from a multi-source trace.
#[derive(Debug, Error)]
pub enum TraceError {
    /// Rendering a per-source statement failed.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// A per-source request failed; transport errors pass through
    /// unmodified.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Per-source options for a correlation lookup: the request id pinned as
/// a where entry, rows oldest-first.
#[must_use]
pub fn correlation_options(base: &QueryOptions, request_id: &str) -> QueryOptions {
    base.clone()
        .with_where_entry(REQUEST_ID_COLUMN, request_id)
        .with_order(SortOrder::Ascending)
}

/// Runs the correlation query against every target in order and merges
/// the results chronologically.
///
/// # Errors
///
/// Returns [`TraceError::Query`] when a statement cannot be rendered and
/// [`TraceError::Api`] when a request fails; the first failure aborts the
/// whole trace.
pub async fn trace_request(
    client: &QueryClient,
    targets: &[QueryTarget],
    base: &QueryOptions,
    request_id: &str,
) -> Result<Vec<LogRecord>, TraceError> {
    let options = correlation_options(base, request_id);
    let mut batches = Vec::with_capacity(targets.len());
    for target in targets {
        let sql = build_sql(&options, &target.table)?;
        let mut rows = client.execute(&sql).await?;
        for row in &mut rows {
            row.set_source(&target.source);
        }
        batches.push(rows);
    }
    Ok(merge_chronological(batches))
}

/// Stable k-way merge of per-source batches, ascending by timestamp.
///
/// Each batch must already be in ascending order. Rows with equal
/// timestamps come out in batch order; rows without a parseable timestamp
/// sort before everything else.
#[must_use]
pub fn merge_chronological(batches: Vec<Vec<LogRecord>>) -> Vec<LogRecord> {
    let total = batches.iter().map(Vec::len).sum();
    let mut streams: Vec<_> = batches
        .into_iter()
        .map(|batch| {
            batch
                .into_iter()
                .map(|record| (record.timestamp(), record))
                .collect::<Vec<_>>()
                .into_iter()
                .peekable()
        })
        .collect();

    let mut merged = Vec::with_capacity(total);
    loop {
        let mut winner: Option<(usize, Option<DateTime<Utc>>)> = None;
        for (index, stream) in streams.iter_mut().enumerate() {
            let Some((timestamp, _)) = stream.peek() else {
                continue;
            };
            let earlier = match &winner {
                None => true,
                Some((_, best)) => timestamp < best,
            };
            if earlier {
                winner = Some((index, *timestamp));
            }
        }
        let Some((index, _)) = winner else {
            break;
        };
        if let Some((_, record)) = streams[index].next() {
            merged.push(record);
        }
    }
    merged
}

// ============================================================================
// Tests
// ============================================================================
