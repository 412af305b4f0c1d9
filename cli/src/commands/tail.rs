//! `loq tail` and its presets (`errors`, `warnings`, `search`).
//!
//! A tail is a snapshot of the newest rows, displayed newest first. With
//! `--follow` the snapshot is followed by a poll loop that prints fresh
//! rows oldest first as they arrive. Multiple sources are fetched
//! per-target and merged chronologically, each row tagged with the source
//! it came from.

use anyhow::Result;
use chrono::{DateTime, Utc};
use colored::Colorize;
use shared::api::QueryClient;
use shared::config::Config;
use shared::models::LogRecord;
use shared::query::{build_sql, QueryOptions, SortOrder, DEFAULT_LIMIT};
use shared::time::{self, TimeError};
use shared::trace::{merge_chronological, QueryTarget};
use std::time::Duration;

use super::{
    build_options, effective_sources, print_batch, print_results, query_client, resolve_targets,
    sources_client,
};
use crate::{FilterArgs, FollowArgs};

/// Ceiling on rows fetched per follow tick.
const FOLLOW_LIMIT_CAP: u64 = 50;

/// Lower bound for the first poll when the user gave no `--since`.
const FOLLOW_FALLBACK_WINDOW: &str = "1m";

/// Runs a tail-family command.
pub async fn run(
    filter: &FilterArgs,
    level: Option<String>,
    search: Option<String>,
    follow: &FollowArgs,
) -> Result<()> {
    let config = Config::load()?;
    let options = build_options(filter, level, search, &config, Utc::now())?;

    let names = effective_sources(&filter.source, &config)?;
    let sources = sources_client()?;
    let targets = resolve_targets(&sources, &names).await?;

    let client = query_client(&config)?;
    let format = filter.format.unwrap_or(config.output_format);

    let batches = fetch_batches(&client, &targets, &options).await?;
    let mut watermarks: Vec<Option<DateTime<Utc>>> =
        batches.iter().map(|rows| newest_timestamp(rows)).collect();

    let snapshot = snapshot_view(batches, &options);
    print_results(&snapshot, format, filter.jq.as_deref());

    if !follow.follow {
        return Ok(());
    }

    eprintln!("{}", "Following logs... (Ctrl+C to stop)".dimmed());
    let interval = Duration::from_secs(follow.interval.max(1));
    let poll_limit = options
        .limit
        .unwrap_or(DEFAULT_LIMIT)
        .clamp(1, FOLLOW_LIMIT_CAP);

    loop {
        tokio::time::sleep(interval).await;
        match poll_tick(&client, &targets, &options, poll_limit, &mut watermarks).await {
            Ok(fresh) if !fresh.is_empty() => print_batch(&fresh, format, filter.jq.as_deref()),
            Ok(_) => {}
            Err(error) => eprintln!("{}", format!("Polling error: {error}").red()),
        }
    }
}

/// One descending batch per target, rows tagged with their source when
/// more than one target is involved.
async fn fetch_batches(
    client: &QueryClient,
    targets: &[QueryTarget],
    options: &QueryOptions,
) -> Result<Vec<Vec<LogRecord>>> {
    let tag = targets.len() > 1;
    let mut batches = Vec::with_capacity(targets.len());
    for target in targets {
        let sql = build_sql(options, &target.table)?;
        let mut rows = client.execute(&sql).await?;
        if tag {
            for row in &mut rows {
                row.set_source(&target.source);
            }
        }
        batches.push(rows);
    }
    Ok(batches)
}

/// Merges descending per-target batches into one newest-first view capped
/// at the requested limit.
fn snapshot_view(batches: Vec<Vec<LogRecord>>, options: &QueryOptions) -> Vec<LogRecord> {
    let limit = display_limit(options);
    if batches.len() == 1 {
        let mut rows = batches.into_iter().next().unwrap_or_default();
        rows.truncate(limit);
        return rows;
    }

    let ascending = batches
        .into_iter()
        .map(|mut rows| {
            rows.reverse();
            rows
        })
        .collect();
    let mut merged = merge_chronological(ascending);
    if merged.len() > limit {
        let excess = merged.len() - limit;
        merged.drain(..excess);
    }
    merged.reverse();
    merged
}

/// One poll across all targets: fetches rows strictly newer than each
/// target's watermark, advances the watermarks, and returns the fresh
/// rows merged oldest first.
async fn poll_tick(
    client: &QueryClient,
    targets: &[QueryTarget],
    options: &QueryOptions,
    poll_limit: u64,
    watermarks: &mut [Option<DateTime<Utc>>],
) -> Result<Vec<LogRecord>> {
    let now = Utc::now();
    let tag = targets.len() > 1;
    let mut batches = Vec::with_capacity(targets.len());

    for (index, target) in targets.iter().enumerate() {
        let since = poll_since(watermarks[index], options.since, now)?;
        let tick = tick_options(options, since, poll_limit);

        let sql = build_sql(&tick, &target.table)?;
        let mut rows = client.execute(&sql).await?;
        if tag {
            for row in &mut rows {
                row.set_source(&target.source);
            }
        }

        let fresh = newer_than(rows, watermarks[index]);
        if let Some(newest) = newest_timestamp(&fresh) {
            watermarks[index] = Some(watermarks[index].map_or(newest, |seen| seen.max(newest)));
        }
        batches.push(fresh);
    }

    Ok(merge_chronological(batches))
}

/// Lower bound for a poll: the watermark, then the user's own bound, then
/// a short window ending now.
fn poll_since(
    watermark: Option<DateTime<Utc>>,
    user_since: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, TimeError> {
    match watermark.or(user_since) {
        Some(bound) => Ok(bound),
        None => time::resolve(FOLLOW_FALLBACK_WINDOW, now),
    }
}

/// Options for one poll of one target: ascending, capped, with the upper
/// bound dropped so new rows keep flowing.
fn tick_options(options: &QueryOptions, since: DateTime<Utc>, poll_limit: u64) -> QueryOptions {
    let mut tick = options
        .clone()
        .with_since(since)
        .with_limit(poll_limit)
        .with_order(SortOrder::Ascending);
    tick.until = None;
    tick
}

/// Rows strictly newer than the watermark; rows without a parseable
/// timestamp pass through.
fn newer_than(rows: Vec<LogRecord>, watermark: Option<DateTime<Utc>>) -> Vec<LogRecord> {
    let Some(seen) = watermark else {
        return rows;
    };
    rows.into_iter()
        .filter(|row| match row.timestamp() {
            Some(ts) => ts > seen,
            None => true,
        })
        .collect()
}

/// The newest parseable timestamp in a batch.
fn newest_timestamp(records: &[LogRecord]) -> Option<DateTime<Utc>> {
    records.iter().filter_map(LogRecord::timestamp).max()
}

fn display_limit(options: &QueryOptions) -> usize {
    usize::try_from(options.limit.unwrap_or(DEFAULT_LIMIT)).unwrap_or(usize::MAX)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::{Map, Value};

    fn record(dt: &str, message: &str) -> LogRecord {
        let mut columns = Map::new();
        columns.insert("dt".to_string(), Value::String(dt.to_string()));
        columns.insert("message".to_string(), Value::String(message.to_string()));
        LogRecord::new(columns)
    }

    fn messages(records: &[LogRecord]) -> Vec<&str> {
        records
            .iter()
            .map(|r| r.get_str("message").unwrap_or(""))
            .collect()
    }

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_snapshot_view_single_batch_passes_through() {
        let batches = vec![vec![
            record("2024-06-01 10:20:00.000", "newest"),
            record("2024-06-01 10:00:00.000", "oldest"),
        ]];
        let options = QueryOptions::new().with_limit(10);
        let view = snapshot_view(batches, &options);
        assert_eq!(messages(&view), vec!["newest", "oldest"]);
    }

    #[test]
    fn test_snapshot_view_merges_and_caps_multiple_batches() {
        let batches = vec![
            vec![
                record("2024-06-01 10:20:00.000", "a-new"),
                record("2024-06-01 10:00:00.000", "a-old"),
            ],
            vec![
                record("2024-06-01 10:15:00.000", "b-new"),
                record("2024-06-01 10:10:00.000", "b-old"),
            ],
        ];
        let options = QueryOptions::new().with_limit(3);
        let view = snapshot_view(batches, &options);
        // Newest three rows overall, newest first.
        assert_eq!(messages(&view), vec!["a-new", "b-new", "b-old"]);
    }

    #[test]
    fn test_newer_than_without_watermark_keeps_everything() {
        let rows = vec![record("2024-06-01 10:00:00.000", "one")];
        assert_eq!(newer_than(rows, None).len(), 1);
    }

    #[test]
    fn test_newer_than_is_strict() {
        let rows = vec![
            record("2024-06-01 10:00:00.000", "boundary"),
            record("2024-06-01 10:00:01.000", "fresh"),
        ];
        let fresh = newer_than(rows, Some(at(10, 0)));
        assert_eq!(messages(&fresh), vec!["fresh"]);
    }

    #[test]
    fn test_watermark_blocks_replayed_rows_on_next_tick() {
        let first = vec![record("2024-06-01 10:00:00.000", "one")];
        let fresh = newer_than(first, None);
        let watermark = newest_timestamp(&fresh);
        assert_eq!(watermark, Some(at(10, 0)));

        let replay = vec![record("2024-06-01 10:00:00.000", "one")];
        assert!(newer_than(replay, watermark).is_empty());
    }

    #[test]
    fn test_newest_timestamp_ignores_untimed_rows() {
        let mut untimed = Map::new();
        untimed.insert("message".to_string(), Value::String("x".to_string()));
        let rows = vec![
            LogRecord::new(untimed),
            record("2024-06-01 10:30:00.000", "timed"),
        ];
        assert_eq!(newest_timestamp(&rows), Some(at(10, 30)));
    }

    #[test]
    fn test_poll_since_prefers_watermark() {
        let since = poll_since(Some(at(11, 0)), Some(at(9, 0)), at(12, 0)).unwrap();
        assert_eq!(since, at(11, 0));
    }

    #[test]
    fn test_poll_since_falls_back_to_user_bound() {
        let since = poll_since(None, Some(at(9, 0)), at(12, 0)).unwrap();
        assert_eq!(since, at(9, 0));
    }

    #[test]
    fn test_poll_since_defaults_to_recent_window() {
        let since = poll_since(None, None, at(12, 0)).unwrap();
        assert_eq!(since, at(11, 59));
    }

    #[test]
    fn test_tick_options_reshapes_for_polling() {
        let base = QueryOptions::new()
            .with_level("error")
            .with_limit(500)
            .with_until(at(13, 0));
        let tick = tick_options(&base, at(12, 0), 50);

        assert_eq!(tick.since, Some(at(12, 0)));
        assert_eq!(tick.until, None);
        assert_eq!(tick.limit, Some(50));
        assert_eq!(tick.order, SortOrder::Ascending);
        assert_eq!(tick.level.as_deref(), Some("error"));
    }
}
