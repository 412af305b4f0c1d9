//! Output rendering for query results.
//!
//! Four formats: `pretty` (colored, line-oriented), `json` (pretty-printed
//! array), `table` (Unicode table), and `csv`. Table and CSV output take
//! the union of all columns seen across the rows, with the timestamp
//! pinned first and the source tag last; a column missing from a row
//! renders as an empty cell.

use crate::models::{LogRecord, MESSAGE_COLUMN, SOURCE_COLUMN, TIMESTAMP_COLUMN};
use clap::ValueEnum;
use colored::Colorize;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{ContentArrangement, Table};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Output format selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Colored, line-oriented log view.
    #[default]
    Pretty,
    /// Pretty-printed JSON array.
    Json,
    /// Unicode table.
    Table,
    /// Comma-separated values with a header row.
    Csv,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pretty => "pretty",
            Self::Json => "json",
            Self::Table => "table",
            Self::Csv => "csv",
        };
        write!(f, "{name}")
    }
}

/// Renders rows in the chosen format.
#[must_use]
pub fn format_records(records: &[LogRecord], format: OutputFormat) -> String {
    match format {
        OutputFormat::Pretty => format_pretty(records),
        OutputFormat::Json => {
            serde_json::to_string_pretty(records).unwrap_or_else(|_| "[]".to_string())
        }
        OutputFormat::Table => format_table(records),
        OutputFormat::Csv => format_csv(records),
    }
}

/// Human-readable byte count, e.g. `1.50 GB`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["Bytes", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} Bytes")
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}

// ============================================================================
// Pretty
// ============================================================================

fn format_pretty(records: &[LogRecord]) -> String {
    records
        .iter()
        .map(pretty_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn pretty_line(record: &LogRecord) -> String {
    let timestamp = record.dt().unwrap_or("(no timestamp)");
    let level_tag = match record.get_str("level") {
        Some(level) => colorize_level(level),
        None => "LOG".dimmed().to_string(),
    };

    let mut line = format!("{} {}", timestamp.dimmed(), level_tag);
    if let Some(subsystem) = record.get_str("subsystem") {
        line.push(' ');
        line.push_str(&format!("[{subsystem}]").cyan().to_string());
    }
    if let Some(source) = record.source() {
        line.push(' ');
        line.push_str(&format!("({source})").dimmed().to_string());
    }
    line.push(' ');
    line.push_str(&message_of(record));

    for (column, value) in record.columns() {
        if is_headline_column(column) {
            continue;
        }
        line.push_str(&format!(
            "\n  {}: {}",
            column.dimmed(),
            cell_value(Some(value))
        ));
    }
    line
}

fn is_headline_column(column: &str) -> bool {
    column == TIMESTAMP_COLUMN
        || column == MESSAGE_COLUMN
        || column == SOURCE_COLUMN
        || column == "level"
        || column == "subsystem"
        || column == "raw"
}

fn colorize_level(level: &str) -> String {
    let tag = level.to_uppercase();
    match level.to_lowercase().as_str() {
        "error" | "fatal" => tag.red().bold().to_string(),
        "warn" | "warning" => tag.yellow().to_string(),
        "info" => tag.blue().to_string(),
        "debug" | "trace" => tag.dimmed().to_string(),
        _ => tag.normal().to_string(),
    }
}

fn message_of(record: &LogRecord) -> String {
    if let Some(message) = record.get_str(MESSAGE_COLUMN) {
        return message.to_string();
    }
    if let Some(raw) = record.get_str("raw") {
        return raw.to_string();
    }
    Value::Object(record.columns().clone()).to_string()
}

// ============================================================================
// Table and CSV
// ============================================================================

fn format_table(records: &[LogRecord]) -> String {
    if records.is_empty() {
        return String::new();
    }
    let columns = column_union(records);
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(columns.clone());
    for record in records {
        let row: Vec<String> = columns
            .iter()
            .map(|column| cell_value(record.get(column)))
            .collect();
        table.add_row(row);
    }
    table.to_string()
}

fn format_csv(records: &[LogRecord]) -> String {
    if records.is_empty() {
        return String::new();
    }
    let columns = column_union(records);
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(
        columns
            .iter()
            .map(|column| csv_escape(column))
            .collect::<Vec<_>>()
            .join(","),
    );
    for record in records {
        let row: Vec<String> = columns
            .iter()
            .map(|column| csv_escape(&cell_value(record.get(column))))
            .collect();
        lines.push(row.join(","));
    }
    lines.join("\n")
}

/// Union of all column names, timestamp first and source tag last.
fn column_union(records: &[LogRecord]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for column in record.columns().keys() {
            if !columns.iter().any(|existing| existing == column) {
                columns.push(column.clone());
            }
        }
    }
    if let Some(position) = columns.iter().position(|c| c == TIMESTAMP_COLUMN) {
        let timestamp = columns.remove(position);
        columns.insert(0, timestamp);
    }
    if let Some(position) = columns.iter().position(|c| c == SOURCE_COLUMN) {
        let source = columns.remove(position);
        columns.push(source);
    }
    columns
}

fn cell_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

/// Quotes a CSV field when needed, doubling embedded quotes.
fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================
