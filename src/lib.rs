//! Facade crate for the odata-feed serializer.
//!
//! This crate re-exports the feed rendering API from `odata-feed-core` and
//! exposes the SQLite row source behind the `store-sqlite` feature.

#![forbid(unsafe_code)]

pub use odata_feed_core::{
    CellValue, Clock, ColumnDescriptor, Columns, DEFAULT_PAGE_SIZE, EdmType, FeedConfig,
    FeedContext, FeedError, FeedRenderer, FeedSummary, PaginationError, PaginationState,
    ROWID_COLUMN, Row, SystemClock, TimeBox, WriteFeedError, encode_cell, make_cells,
    sanitize_identifier, write_feed,
};

#[cfg(feature = "store-sqlite")]
pub use odata_feed_core::source::{SqliteCollection, SqliteSourceError, list_collections};

#[cfg(feature = "test-support")]
pub use odata_feed_core::test_support;
