//! Loq CLI
//!
//! Command-line interface for querying log sources with a GraphQL-inspired
//! syntax.
//!
//! # Usage
//!
//! ```bash
//! loq --help
//! loq query "{ logs(level: 'error', limit: 10) { dt, message } }"
//! loq tail --source prod --level error --follow
//! loq trace 9f2c4e1a --source dev,prod
//! loq sources list
//! ```

#![deny(unsafe_code)]

mod commands;
mod options;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use shared::format::OutputFormat;

/// Loq CLI - log analytics queries with a GraphQL-inspired syntax
#[derive(Parser)]
#[command(name = "loq")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log internal diagnostics to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a query string, e.g. "{ logs(level: 'error') { dt, message } }"
    Query {
        /// Query string
        query: String,

        /// Source name or alias
        #[arg(short, long)]
        source: Option<String>,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Run a raw SQL statement verbatim
    Sql {
        /// SQL statement
        sql: String,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Show the newest logs
    Tail {
        #[command(flatten)]
        filter: FilterArgs,

        /// Filter by log level
        #[arg(short, long)]
        level: Option<String>,

        /// Only rows whose message contains this text
        #[arg(long)]
        search: Option<String>,

        #[command(flatten)]
        follow: FollowArgs,
    },

    /// Show the newest error logs
    Errors {
        #[command(flatten)]
        filter: FilterArgs,

        #[command(flatten)]
        follow: FollowArgs,
    },

    /// Show the newest warning logs
    Warnings {
        #[command(flatten)]
        filter: FilterArgs,

        #[command(flatten)]
        follow: FollowArgs,
    },

    /// Search log messages for a substring
    Search {
        /// Substring to look for
        pattern: String,

        /// Filter by log level
        #[arg(short, long)]
        level: Option<String>,

        #[command(flatten)]
        filter: FilterArgs,

        #[command(flatten)]
        follow: FollowArgs,
    },

    /// Collect all logs sharing a request id across sources
    Trace {
        /// Request id to correlate on
        request_id: String,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Inspect log sources
    Sources {
        #[command(subcommand)]
        command: SourcesCommands,
    },

    /// Read or change persistent settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum SourcesCommands {
    /// List all sources on the account
    List {
        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Show one source in detail
    Get {
        /// Source name or alias
        name: String,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Set a key (source, limit, format, logLevel, queryBaseUrl)
    Set {
        /// Configuration key
        key: String,

        /// New value
        value: String,
    },

    /// Print the current configuration
    Show {
        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Set the default source (shorthand for `config set source`)
    Source {
        /// Source name
        name: String,
    },
}

/// Filters shared by the tail-family and trace commands.
#[derive(Args)]
struct FilterArgs {
    /// Sources to query (repeat the flag or comma-separate)
    #[arg(short, long, value_delimiter = ',')]
    source: Vec<String>,

    /// Maximum number of rows
    #[arg(short = 'n', long)]
    limit: Option<u64>,

    /// Filter by subsystem
    #[arg(long)]
    subsystem: Option<String>,

    /// Lower time bound (relative like `15m`, or absolute)
    #[arg(long)]
    since: Option<String>,

    /// Upper time bound, exclusive
    #[arg(long)]
    until: Option<String>,

    /// Column filter as FIELD=VALUE (repeatable)
    #[arg(short = 'w', long = "where", value_name = "FIELD=VALUE")]
    filters: Vec<String>,

    /// Columns to select (comma-separated)
    #[arg(long, value_delimiter = ',')]
    fields: Vec<String>,

    /// Output format
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Pipe rows as JSON through this jq filter
    #[arg(long, value_name = "FILTER")]
    jq: Option<String>,
}

/// Polling flags for the tail-family commands.
#[derive(Args)]
struct FollowArgs {
    /// Keep polling for new rows
    #[arg(short, long)]
    follow: bool,

    /// Seconds between polls
    #[arg(long, default_value_t = 2)]
    interval: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Query {
            query,
            source,
            format,
        } => commands::query::run_query(&query, source, format).await,
        Commands::Sql { sql, format } => commands::query::run_sql(&sql, format).await,
        Commands::Tail {
            filter,
            level,
            search,
            follow,
        } => commands::tail::run(&filter, level, search, &follow).await,
        Commands::Errors { filter, follow } => {
            commands::tail::run(&filter, Some("error".to_string()), None, &follow).await
        }
        Commands::Warnings { filter, follow } => {
            commands::tail::run(&filter, Some("warning".to_string()), None, &follow).await
        }
        Commands::Search {
            pattern,
            level,
            filter,
            follow,
        } => commands::tail::run(&filter, level, Some(pattern), &follow).await,
        Commands::Trace { request_id, filter } => {
            commands::trace::run(&request_id, &filter).await
        }
        Commands::Sources { command } => match command {
            SourcesCommands::List { format } => commands::sources::list(format).await,
            SourcesCommands::Get { name, format } => commands::sources::get(&name, format).await,
        },
        Commands::Config { command } => match command {
            ConfigCommands::Set { key, value } => commands::config::set(&key, &value),
            ConfigCommands::Show { format } => commands::config::show(format),
            ConfigCommands::Source { name } => commands::config::set("source", &name),
        },
    }
}

/// Routes diagnostics to stderr so stdout stays pipeable.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["loq"]).is_err());
    }

    #[test]
    fn test_query_command_parse() {
        let cli = Cli::try_parse_from([
            "loq",
            "query",
            "{ logs { dt } }",
            "-s",
            "dev",
            "-f",
            "json",
        ])
        .unwrap();
        let Commands::Query {
            query,
            source,
            format,
        } = cli.command
        else {
            panic!("expected query command");
        };
        assert_eq!(query, "{ logs { dt } }");
        assert_eq!(source.as_deref(), Some("dev"));
        assert_eq!(format, Some(OutputFormat::Json));
    }

    #[test]
    fn test_sql_command_parse() {
        let cli = Cli::try_parse_from(["loq", "sql", "SELECT 1"]).unwrap();
        let Commands::Sql { sql, format } = cli.command else {
            panic!("expected sql command");
        };
        assert_eq!(sql, "SELECT 1");
        assert_eq!(format, None);
    }

    #[test]
    fn test_tail_flags() {
        let cli = Cli::try_parse_from([
            "loq", "tail", "-s", "dev,prod", "-n", "20", "-l", "error", "--since", "2h", "-w",
            "requestId=abc", "--fields", "dt,message", "--format", "table", "-f", "--interval",
            "5",
        ])
        .unwrap();
        let Commands::Tail {
            filter,
            level,
            search,
            follow,
        } = cli.command
        else {
            panic!("expected tail command");
        };
        assert_eq!(filter.source, vec!["dev", "prod"]);
        assert_eq!(filter.limit, Some(20));
        assert_eq!(filter.since.as_deref(), Some("2h"));
        assert_eq!(filter.filters, vec!["requestId=abc"]);
        assert_eq!(filter.fields, vec!["dt", "message"]);
        assert_eq!(filter.format, Some(OutputFormat::Table));
        assert_eq!(level.as_deref(), Some("error"));
        assert_eq!(search, None);
        assert!(follow.follow);
        assert_eq!(follow.interval, 5);
    }

    #[test]
    fn test_tail_short_f_means_follow() {
        let cli = Cli::try_parse_from(["loq", "tail", "-f"]).unwrap();
        let Commands::Tail { filter, follow, .. } = cli.command else {
            panic!("expected tail command");
        };
        assert!(follow.follow);
        assert_eq!(filter.format, None);
    }

    #[test]
    fn test_errors_and_warnings_parse() {
        assert!(Cli::try_parse_from(["loq", "errors", "-s", "prod"]).is_ok());
        assert!(Cli::try_parse_from(["loq", "warnings", "-n", "5"]).is_ok());
    }

    #[test]
    fn test_search_requires_pattern() {
        assert!(Cli::try_parse_from(["loq", "search"]).is_err());
        let cli = Cli::try_parse_from(["loq", "search", "timeout", "-l", "error"]).unwrap();
        let Commands::Search { pattern, level, .. } = cli.command else {
            panic!("expected search command");
        };
        assert_eq!(pattern, "timeout");
        assert_eq!(level.as_deref(), Some("error"));
    }

    #[test]
    fn test_trace_parse() {
        let cli =
            Cli::try_parse_from(["loq", "trace", "9f2c4e1a", "--source", "dev,prod"]).unwrap();
        let Commands::Trace { request_id, filter } = cli.command else {
            panic!("expected trace command");
        };
        assert_eq!(request_id, "9f2c4e1a");
        assert_eq!(filter.source, vec!["dev", "prod"]);
    }

    #[test]
    fn test_jq_flag_parse() {
        let cli = Cli::try_parse_from(["loq", "tail", "--jq", ".[].message"]).unwrap();
        let Commands::Tail { filter, .. } = cli.command else {
            panic!("expected tail command");
        };
        assert_eq!(filter.jq.as_deref(), Some(".[].message"));

        let cli = Cli::try_parse_from(["loq", "trace", "abc", "--jq", ".[]"]).unwrap();
        let Commands::Trace { filter, .. } = cli.command else {
            panic!("expected trace command");
        };
        assert_eq!(filter.jq.as_deref(), Some(".[]"));
    }

    #[test]
    fn test_sources_subcommands() {
        let cli = Cli::try_parse_from(["loq", "sources", "list", "-f", "json"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Sources {
                command: SourcesCommands::List {
                    format: Some(OutputFormat::Json)
                }
            }
        ));

        let cli = Cli::try_parse_from(["loq", "sources", "get", "sweetistics"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Sources {
                command: SourcesCommands::Get { .. }
            }
        ));
    }

    #[test]
    fn test_config_subcommands() {
        let cli = Cli::try_parse_from(["loq", "config", "set", "limit", "50"]).unwrap();
        let Commands::Config {
            command: ConfigCommands::Set { key, value },
        } = cli.command
        else {
            panic!("expected config set");
        };
        assert_eq!(key, "limit");
        assert_eq!(value, "50");

        let cli = Cli::try_parse_from(["loq", "config", "source", "prod"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                command: ConfigCommands::Source { .. }
            }
        ));

        assert!(Cli::try_parse_from(["loq", "config", "show"]).is_ok());
    }

    #[test]
    fn test_verbose_is_global() {
        let cli = Cli::try_parse_from(["loq", "-v", "tail"]).unwrap();
        assert!(cli.verbose);

        let cli = Cli::try_parse_from(["loq", "tail", "-v"]).unwrap();
        assert!(cli.verbose);
    }
}
