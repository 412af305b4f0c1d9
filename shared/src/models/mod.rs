//! Data models shared across the query pipeline and API clients.

mod record;
mod source;

pub use record::{LogRecord, MESSAGE_COLUMN, SOURCE_COLUMN, TIMESTAMP_COLUMN};
pub use source::{Pagination, Source, SourceAttributes, SourcesPage};
