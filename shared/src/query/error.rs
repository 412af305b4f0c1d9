//! Error types for query parsing, validation, and SQL rendering.

use crate::time::TimeError;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur while turning a query into SQL.
///
/// Every variant is recoverable: the caller reports it and exits non-zero,
/// and no partial SQL is ever produced alongside one.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The query text is malformed; the message carries the offending
    /// fragment.
    #[error("Invalid query syntax: {0}")]
    Syntax(String),

    /// The query names a root other than `logs`.
    #[error("Unknown query root: '{0}'. Expected 'logs'")]
    UnknownRoot(String),

    /// An argument name outside the recognized set.
    #[error(
        "Unknown argument: '{0}'. Expected one of: limit, level, subsystem, \
         since, until, where, search"
    )]
    UnknownArgument(String),

    /// The field-selection block broke a structural rule.
    #[error("Invalid field selection: {0}")]
    FieldSelection(String),

    /// The input ended before a closing delimiter.
    #[error("Unexpected end of input: expected {expected}")]
    UnexpectedEof {
        /// The delimiter or token that would have completed the query.
        expected: String,
    },

    /// A `since` or `until` value failed to resolve.
    #[error(transparent)]
    InvalidTimeExpression(#[from] TimeError),

    /// The lower time bound lies after the upper one.
    #[error("Invalid time range: since {since} is later than until {until}")]
    InvalidRange {
        /// The resolved lower bound.
        since: DateTime<Utc>,
        /// The resolved upper bound.
        until: DateTime<Utc>,
    },

    /// An identifier contains characters outside `[A-Za-z0-9_]`.
    #[error("Unsafe identifier: '{0}'. Only letters, digits and underscores are allowed")]
    UnsafeIdentifier(String),
}
