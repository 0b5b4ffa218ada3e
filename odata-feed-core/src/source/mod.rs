//! Row sources backing a feed.
//!
//! The renderer only needs a [`Columns`](crate::Columns) set and a
//! forward-only iterator of rows; this module provides the SQLite-backed
//! implementation.

mod sqlite;

pub use sqlite::{PageStatement, SqliteCollection, SqliteRows, SqliteSourceError, list_collections};
