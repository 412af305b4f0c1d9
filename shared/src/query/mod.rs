//! GraphQL-inspired query language: parsing, validation, and SQL rendering.
//!
//! [`parse_query`] turns a `{ logs(...) { ... } }` string into
//! [`QueryOptions`]; [`build_sql`] renders those options into one
//! ClickHouse `SELECT` statement. The CLI flag layer builds the same
//! [`QueryOptions`] directly, so both entry points share validation and
//! rendering.
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use shared::query::{build_sql, parse_query};
//!
//! let options = parse_query(
//!     "{ logs(limit: 5, level: 'error') { dt, message } }",
//!     Utc::now(),
//! )
//! .unwrap();
//! let sql = build_sql(&options, "t123_app_logs").unwrap();
//! assert_eq!(
//!     sql,
//!     "SELECT \"dt\", \"message\" FROM \"t123_app_logs\" \
//!      WHERE \"level\" = 'error' ORDER BY \"dt\" DESC LIMIT 5"
//! );
//! ```

mod error;
mod options;
mod parser;
mod sql;

pub use error::QueryError;
pub use options::{FieldSelection, QueryOptions, SortOrder};
pub use parser::parse_query;
pub use sql::{build_sql, escape_literal, DEFAULT_LIMIT};
