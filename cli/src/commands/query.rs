//! `loq query` and `loq sql`.

use anyhow::{Context, Result};
use chrono::Utc;
use shared::config::Config;
use shared::format::OutputFormat;
use shared::query::{build_sql, parse_query};
use tracing::debug;

use super::{apply_config_defaults, print_results, query_client, resolve_source, sources_client};

/// Parses a query string, runs it against one source, and prints the rows.
pub async fn run_query(
    query: &str,
    source: Option<String>,
    format: Option<OutputFormat>,
) -> Result<()> {
    let mut config = Config::load()?;

    let options = parse_query(query, Utc::now())?;
    let options = apply_config_defaults(options, &config).validated()?;

    record_history(&mut config, query);

    let source_name = source.or_else(|| config.default_source.clone()).context(
        "No source specified. Use --source or set a default with: loq config set source <name>",
    )?;
    let sources = sources_client()?;
    let source = resolve_source(&sources, &source_name).await?;

    let sql = build_sql(&options, &source.log_table())?;
    let client = query_client(&config)?;
    let records = client.execute(&sql).await?;

    print_results(&records, format.unwrap_or(config.output_format), None);
    Ok(())
}

/// Runs a raw SQL statement verbatim.
pub async fn run_sql(sql: &str, format: Option<OutputFormat>) -> Result<()> {
    let mut config = Config::load()?;

    record_history(&mut config, &format!("SQL: {sql}"));

    let client = query_client(&config)?;
    let records = client.execute(sql).await?;

    print_results(&records, format.unwrap_or(OutputFormat::Json), None);
    Ok(())
}

/// Appends to the query history; persistence failures are logged and
/// swallowed.
fn record_history(config: &mut Config, entry: &str) {
    config.push_history(entry);
    if let Err(error) = config.save() {
        debug!(%error, "could not persist query history");
    }
}
