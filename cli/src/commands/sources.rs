//! `loq sources list` and `loq sources get`.

use anyhow::Result;
use colored::{ColoredString, Colorize};
use serde_json::{Map, Value};
use shared::format::{format_bytes, format_records, OutputFormat};
use shared::models::{LogRecord, Source};

use super::{resolve_source, sources_client};

/// Lists every source on the account.
pub async fn list(format: Option<OutputFormat>) -> Result<()> {
    let client = sources_client()?;
    let sources = client.list_all().await?;

    match format.unwrap_or(OutputFormat::Pretty) {
        OutputFormat::Pretty => print_source_list(&sources),
        format @ (OutputFormat::Json | OutputFormat::Table | OutputFormat::Csv) => {
            let rows: Vec<LogRecord> = sources.iter().map(source_row).collect();
            println!("{}", format_records(&rows, format));
        }
    }
    Ok(())
}

/// Shows one source in detail.
pub async fn get(name: &str, format: Option<OutputFormat>) -> Result<()> {
    let client = sources_client()?;
    let source = resolve_source(&client, name).await?;

    match format.unwrap_or(OutputFormat::Pretty) {
        OutputFormat::Pretty => print_source_detail(&source),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&source)?),
        format @ (OutputFormat::Table | OutputFormat::Csv) => {
            let rows = vec![source_row(&source)];
            println!("{}", format_records(&rows, format));
        }
    }
    Ok(())
}

fn print_source_list(sources: &[Source]) {
    println!("\n{}\n", "Available Sources:".bold());
    for source in sources {
        let attrs = &source.attributes;
        println!("  {}", attrs.name.cyan());
        println!("    Platform: {}", attrs.platform);
        println!("    Messages: {}", thousands(attrs.messages_count));
        println!("    Size: {}", format_bytes(attrs.bytes_count));
        println!("    Status: {}", status_label(attrs.ingesting_paused));
        println!("    ID: {}", source.id);
        println!();
    }
}

fn print_source_detail(source: &Source) {
    let attrs = &source.attributes;
    println!("\n{}\n", format!("Source: {}", attrs.name).bold());
    println!("ID: {}", source.id);
    println!("Platform: {}", attrs.platform);
    println!("Token: {}", token_display(&attrs.token));
    println!("Messages: {}", thousands(attrs.messages_count));
    println!("Size: {}", format_bytes(attrs.bytes_count));
    println!("Status: {}", status_label(attrs.ingesting_paused));
    println!("Created: {}", value_or_na(&attrs.created_at));
    println!("Updated: {}", value_or_na(&attrs.updated_at));
    println!("Table: {}", source.log_table());
}

/// Flat row used for the machine-readable formats.
fn source_row(source: &Source) -> LogRecord {
    let attrs = &source.attributes;
    let mut columns = Map::new();
    columns.insert("id".to_string(), Value::String(source.id.clone()));
    columns.insert("type".to_string(), Value::String(source.kind.clone()));
    columns.insert("name".to_string(), Value::String(attrs.name.clone()));
    columns.insert(
        "platform".to_string(),
        Value::String(attrs.platform.clone()),
    );
    columns.insert(
        "messages_count".to_string(),
        Value::from(attrs.messages_count),
    );
    columns.insert("bytes_count".to_string(), Value::from(attrs.bytes_count));
    columns.insert(
        "ingesting_paused".to_string(),
        Value::from(attrs.ingesting_paused),
    );
    LogRecord::new(columns)
}

fn status_label(paused: bool) -> ColoredString {
    if paused {
        "Paused".red()
    } else {
        "Active".green()
    }
}

/// First ten characters of the token, or `N/A` when unset.
fn token_display(token: &str) -> String {
    if token.is_empty() {
        return "N/A".to_string();
    }
    let prefix: String = token.chars().take(10).collect();
    format!("{prefix}...")
}

fn value_or_na(value: &str) -> &str {
    if value.is_empty() {
        "N/A"
    } else {
        value
    }
}

/// Decimal rendering with `,` thousands separators.
fn thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_source() -> Source {
        serde_json::from_value(json!({
            "id": "42",
            "type": "source",
            "attributes": {
                "name": "sweetistics",
                "team_id": 123,
                "table_name": "sweetistics",
                "platform": "http",
                "token": "abcdefghijklmnop",
                "messages_count": 1234567u64,
                "bytes_count": 1048576u64,
                "ingesting_paused": false
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_thousands_groups_digits() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1000), "1,000");
        assert_eq!(thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_token_display_truncates() {
        assert_eq!(token_display("abcdefghijklmnop"), "abcdefghij...");
        assert_eq!(token_display(""), "N/A");
    }

    #[test]
    fn test_value_or_na() {
        assert_eq!(value_or_na(""), "N/A");
        assert_eq!(value_or_na("2024-01-01"), "2024-01-01");
    }

    #[test]
    fn test_source_row_flattens_attributes() {
        let row = source_row(&sample_source());
        assert_eq!(row.get_str("id"), Some("42"));
        assert_eq!(row.get_str("name"), Some("sweetistics"));
        assert_eq!(row.get("messages_count"), Some(&Value::from(1234567u64)));
        assert_eq!(row.get("ingesting_paused"), Some(&Value::from(false)));
    }
}
