//! `loq config set` and `loq config show`.

use anyhow::{anyhow, bail, Result};
use clap::ValueEnum;
use colored::Colorize;
use shared::config::{Config, DEFAULT_QUERY_BASE_URL};
use shared::format::OutputFormat;

/// Keys accepted by `config set`.
const VALID_KEYS: [&str; 5] = ["source", "limit", "format", "logLevel", "queryBaseUrl"];

/// Levels accepted for `logLevel`.
const VALID_LEVELS: [&str; 7] = ["all", "trace", "debug", "info", "warning", "error", "fatal"];

/// Sets one configuration key after validating the value.
pub fn set(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load()?;

    let message = match key {
        "source" => {
            config.default_source = Some(value.to_string());
            format!("Default source set to: {value}")
        }
        "limit" => {
            let limit = parse_limit(value)?;
            config.default_limit = limit;
            format!("Default limit set to: {limit}")
        }
        "format" => {
            let format = parse_format(value)?;
            config.output_format = format;
            format!("Default output format set to: {format}")
        }
        "logLevel" => {
            let level = normalize_level(value)?;
            config.default_log_level = level.to_string();
            format!("Default log level set to: {level}")
        }
        "queryBaseUrl" => {
            validate_url(value)?;
            config.query_base_url = Some(value.to_string());
            format!("Query base URL set to: {value}")
        }
        _ => bail!(
            "invalid config key '{key}' (valid keys: {})",
            VALID_KEYS.join(", ")
        ),
    };

    config.save()?;
    println!("{}", message.green());
    Ok(())
}

/// Prints the current configuration.
pub fn show(format: Option<OutputFormat>) -> Result<()> {
    let config = Config::load()?;

    if format.unwrap_or(OutputFormat::Pretty) == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    println!("\n{}\n", "Current Configuration:".bold());
    println!(
        "Default Source: {}",
        config.default_source.as_deref().unwrap_or("(not set)")
    );
    println!("Default Limit: {}", config.default_limit);
    println!("Default Log Level: {}", config.default_log_level);
    println!("Output Format: {}", config.output_format);
    println!(
        "Query Base URL: {}",
        config
            .query_base_url
            .as_deref()
            .unwrap_or(DEFAULT_QUERY_BASE_URL)
    );

    if !config.saved_queries.is_empty() {
        println!("\n{}", "Saved Queries:".bold());
        for (name, query) in &config.saved_queries {
            println!("  {}: {query}", name.cyan());
        }
    }
    println!();
    Ok(())
}

fn parse_limit(value: &str) -> Result<u64> {
    value
        .parse::<u64>()
        .ok()
        .filter(|limit| *limit >= 1)
        .ok_or_else(|| anyhow!("limit must be a positive number"))
}

fn parse_format(value: &str) -> Result<OutputFormat> {
    OutputFormat::from_str(value, true)
        .map_err(|_| anyhow!("invalid format '{value}' (valid formats: pretty, json, table, csv)"))
}

/// Validates a level name, mapping the `warn` shorthand to `warning`.
fn normalize_level(value: &str) -> Result<&'static str> {
    let lowered = value.trim().to_lowercase();
    let resolved = if lowered == "warn" {
        "warning".to_string()
    } else {
        lowered
    };
    VALID_LEVELS
        .iter()
        .find(|level| **level == resolved)
        .copied()
        .ok_or_else(|| {
            anyhow!(
                "invalid log level '{value}' (valid levels: {})",
                VALID_LEVELS.join(", ")
            )
        })
}

fn validate_url(value: &str) -> Result<()> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        bail!("queryBaseUrl must start with http:// or https://")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_limit_accepts_positive() {
        assert_eq!(parse_limit("50").unwrap(), 50);
    }

    #[test]
    fn test_parse_limit_rejects_zero_and_garbage() {
        assert!(parse_limit("0").is_err());
        assert!(parse_limit("-3").is_err());
        assert!(parse_limit("many").is_err());
    }

    #[test]
    fn test_parse_format_is_case_insensitive() {
        assert_eq!(parse_format("JSON").unwrap(), OutputFormat::Json);
        assert_eq!(parse_format("table").unwrap(), OutputFormat::Table);
        assert!(parse_format("yaml").is_err());
    }

    #[test]
    fn test_normalize_level_aliases_warn() {
        assert_eq!(normalize_level("warn").unwrap(), "warning");
        assert_eq!(normalize_level("WARNING").unwrap(), "warning");
    }

    #[test]
    fn test_normalize_level_accepts_known_levels() {
        assert_eq!(normalize_level("all").unwrap(), "all");
        assert_eq!(normalize_level("fatal").unwrap(), "fatal");
        assert!(normalize_level("verbose").is_err());
    }

    #[test]
    fn test_validate_url_requires_scheme() {
        assert!(validate_url("https://example.com").is_ok());
        assert!(validate_url("http://localhost:8123").is_ok());
        assert!(validate_url("example.com").is_err());
    }
}
