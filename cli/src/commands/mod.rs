//! Command implementations.
//!
//! Each submodule backs one top-level subcommand. The helpers here cover
//! the plumbing every command shares: client construction, source
//! resolution, config defaults, and result printing.

pub mod config;
pub mod query;
pub mod sources;
pub mod tail;
pub mod trace;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use colored::Colorize;
use shared::api::{QueryAuth, QueryClient, SourcesClient};
use shared::config::{api_token, query_credentials, resolve_source_alias, Config};
use shared::format::{format_records, OutputFormat};
use shared::models::{LogRecord, Source, TIMESTAMP_COLUMN};
use shared::query::{FieldSelection, QueryOptions};
use shared::time;
use shared::trace::QueryTarget;
use std::io::Write as _;
use std::process::{Command, Stdio};

use crate::options::{normalize_names, parse_where_filters};
use crate::FilterArgs;

/// Builds the query-endpoint client from environment credentials.
///
/// Basic credentials win when both halves are present; otherwise the
/// sources-API token is sent as a bearer token.
pub fn query_client(config: &Config) -> Result<QueryClient> {
    let auth = match query_credentials() {
        Some((username, password)) => QueryAuth::Basic { username, password },
        None => {
            let token = api_token().context(
                "no query credentials: set LOQ_QUERY_USERNAME and LOQ_QUERY_PASSWORD, or LOQ_API_TOKEN",
            )?;
            QueryAuth::Bearer(token)
        }
    };
    Ok(QueryClient::new(config.query_url(), auth)?)
}

/// Builds the sources-API client from the environment token.
pub fn sources_client() -> Result<SourcesClient> {
    let token = api_token()?;
    Ok(SourcesClient::new(token)?)
}

/// Resolves a user-facing name (or alias) to a source via the API.
pub async fn resolve_source(client: &SourcesClient, name: &str) -> Result<Source> {
    let canonical = resolve_source_alias(name);
    client
        .find_by_name(canonical)
        .await?
        .with_context(|| format!("Source not found: {canonical}"))
}

/// Resolves every requested source into a query target.
pub async fn resolve_targets(
    client: &SourcesClient,
    names: &[String],
) -> Result<Vec<QueryTarget>> {
    let mut targets = Vec::with_capacity(names.len());
    for name in names {
        let source = resolve_source(client, name).await?;
        let table = source.log_table();
        targets.push(QueryTarget::new(source.attributes.name, table));
    }
    Ok(targets)
}

/// The source names a command should hit: the flags, or the configured
/// default when no flag was given.
pub fn effective_sources(requested: &[String], config: &Config) -> Result<Vec<String>> {
    let names = normalize_names(requested);
    if !names.is_empty() {
        return Ok(names);
    }
    if let Some(default) = &config.default_source {
        return Ok(vec![default.clone()]);
    }
    bail!("No source specified. Use --source or set a default with: loq config set source <name>");
}

/// Prints formatted rows to stdout and a count note to stderr.
pub fn print_results(records: &[LogRecord], format: OutputFormat, jq: Option<&str>) {
    if records.is_empty() {
        if format == OutputFormat::Json {
            println!("[]");
        }
        eprintln!("{}", "No results found".yellow());
        return;
    }
    print_batch(records, format, jq);
    eprintln!("{}", format!("{} results returned", records.len()).dimmed());
}

/// Prints one batch of rows. A jq filter supersedes `format`: the rows go
/// out as JSON through the filter instead.
pub fn print_batch(records: &[LogRecord], format: OutputFormat, jq: Option<&str>) {
    let Some(filter) = jq else {
        println!("{}", format_records(records, format));
        return;
    };
    let payload = format_records(records, OutputFormat::Json);
    match pipe_through("jq", filter, &payload) {
        Ok(filtered) => {
            print!("{filtered}");
            if !filtered.ends_with('\n') {
                println!();
            }
        }
        Err(error) => {
            eprintln!("{}", format!("{error}").red());
            println!("{payload}");
        }
    }
}

/// Feeds `payload` to `program filter` on stdin and captures its stdout.
///
/// # Errors
///
/// Fails when the program cannot be spawned or exits non-zero; the error
/// message carries the exit status and anything it wrote to stderr.
fn pipe_through(program: &str, filter: &str, payload: &str) -> Result<String> {
    let mut child = Command::new(program)
        .arg(filter)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|error| anyhow!("{program} execution failed: {error}"))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(payload.as_bytes())
            .map_err(|error| anyhow!("{program} execution failed: {error}"))?;
    }

    let output = child
        .wait_with_output()
        .map_err(|error| anyhow!("{program} execution failed: {error}"))?;

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        if stderr.is_empty() {
            bail!("{program} exited with status {code}");
        }
        bail!("{program} exited with status {code}: {stderr}");
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Fills options the caller left unset from the configured defaults.
///
/// The file level is normalized like a flag level; `all` in any case
/// means no level filter.
pub fn apply_config_defaults(mut options: QueryOptions, config: &Config) -> QueryOptions {
    if options.level.is_none() && !config.default_log_level.eq_ignore_ascii_case("all") {
        options.level = Some(config.default_log_level.to_lowercase());
    }
    if options.limit.is_none() {
        options.limit = Some(config.default_limit);
    }
    options
}

/// Builds validated query options from tail-family flags.
///
/// A named `--fields` list always gets the timestamp column pinned first;
/// follow watermarks and chronological merging read row times from it.
pub fn build_options(
    filter: &FilterArgs,
    level: Option<String>,
    search: Option<String>,
    config: &Config,
    now: DateTime<Utc>,
) -> Result<QueryOptions> {
    let mut options = QueryOptions::new();

    let mut fields = normalize_names(&filter.fields);
    if !fields.is_empty() {
        fields.insert(0, TIMESTAMP_COLUMN.to_string());
        options = options.with_fields(FieldSelection::columns(fields));
    }
    if let Some(level) = level {
        options = options.with_level(level);
    }
    if let Some(subsystem) = &filter.subsystem {
        options = options.with_subsystem(subsystem.clone());
    }
    if let Some(since) = &filter.since {
        let bound = time::resolve(since, now)
            .with_context(|| format!("invalid --since value '{since}'"))?;
        options = options.with_since(bound);
    }
    if let Some(until) = &filter.until {
        let bound = time::resolve(until, now)
            .with_context(|| format!("invalid --until value '{until}'"))?;
        options = options.with_until(bound);
    }
    if let Some(limit) = filter.limit {
        options = options.with_limit(limit);
    }
    if let Some(pattern) = search {
        options = options.with_search(pattern);
    }
    for (key, value) in parse_where_filters(&filter.filters)? {
        options.insert_where(key, value);
    }

    Ok(apply_config_defaults(options, config).validated()?)
}

// ============================================================================
// Tests
// ============================================================================
