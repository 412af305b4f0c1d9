//! `loq trace`.

use anyhow::Result;
use chrono::Utc;
use shared::config::Config;
use shared::trace::trace_request;

use super::{
    build_options, effective_sources, print_results, query_client, resolve_targets,
    sources_client,
};
use crate::FilterArgs;

/// Collects every row sharing one request id across the requested sources
/// and prints them oldest first.
pub async fn run(request_id: &str, filter: &FilterArgs) -> Result<()> {
    let config = Config::load()?;
    let base = build_options(filter, None, None, &config, Utc::now())?;

    let names = effective_sources(&filter.source, &config)?;
    let sources = sources_client()?;
    let targets = resolve_targets(&sources, &names).await?;

    let client = query_client(&config)?;
    let records = trace_request(&client, &targets, &base, request_id).await?;

    print_results(
        &records,
        filter.format.unwrap_or(config.output_format),
        filter.jq.as_deref(),
    );
    Ok(())
}
