//! Loq Shared Library
//!
//! This crate contains the query model, parser, SQL rendering, and API
//! clients used by the Loq command-line tool.
//!
//! # Modules
//!
//! - [`query`] - GraphQL-inspired query parsing and SQL rendering
//! - [`time`] - Time expression resolution
//! - [`models`] - Source and result-row models
//! - [`api`] - HTTP clients for the query and sources endpoints
//! - [`config`] - Configuration file handling and source aliases
//! - [`format`] - Output rendering
//! - [`trace`] - Multi-source fan-out and chronological merging
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use shared::query::{build_sql, parse_query};
//!
//! let options = parse_query("{ logs(limit: 5, level: 'error') { dt, message } }", Utc::now())
//!     .unwrap();
//! let sql = build_sql(&options, "t123_app_logs").unwrap();
//! assert!(sql.starts_with("SELECT \"dt\", \"message\" FROM \"t123_app_logs\""));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod api;
pub mod config;
pub mod format;
pub mod models;
pub mod query;
pub mod time;
pub mod trace;

/// Re-export common dependencies for convenience.
pub use chrono;
pub use serde;
pub use serde_json;
