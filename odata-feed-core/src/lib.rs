//! Core of the odata-feed serializer.
//!
//! The crate turns rows of a tabular source into an OData-style Atom/XML
//! feed. Rendering is pull-based: [`FeedRenderer`] is an iterator of text
//! fragments which, concatenated in order, form one XML document. Callers
//! forward each fragment to a writer as it is produced, so a page is never
//! materialised in memory.
//!
//! Responsibilities:
//! - Map raw column names to XML element names ([`sanitize_identifier`]).
//! - Encode typed cell values as `d:`/`m:type` elements ([`encode_cell`]).
//! - Resolve `$top`/`$skip`/`$skiptoken` and build continuation links
//!   ([`PaginationState`]).
//! - Frame the feed and bound the time spent per response ([`FeedRenderer`]).
//!
//! Boundaries:
//! - No HTTP handling or compression; see `odata-feed-cli`.
//! - Data access lives behind the `store-sqlite` feature in [`source`].
//!
//! # Examples
//!
//! ```
//! use chrono::NaiveDate;
//! use odata_feed_core::{
//!     CellValue, Columns, FeedConfig, FeedContext, FeedRenderer, PaginationState, Row,
//! };
//!
//! let columns = Columns::from_names(["rowid", "name"]);
//! let rows = vec![Ok::<_, std::io::Error>(Row::new(vec![
//!     CellValue::Int64(1),
//!     CellValue::from("Ada"),
//! ]))];
//! let generated_at = NaiveDate::from_ymd_opt(2024, 1, 19)
//!     .and_then(|date| date.and_hms_opt(12, 0, 0))
//!     .expect("valid timestamp");
//! let context = FeedContext::new(
//!     FeedConfig::new("example.org", "/api", "people"),
//!     1,
//!     PaginationState::default(),
//! )
//! .with_generated_at(generated_at);
//!
//! let renderer = FeedRenderer::new(context, columns, rows.into_iter()).expect("rowid column");
//! let document: String = renderer
//!     .collect::<Result<Vec<_>, _>>()
//!     .expect("render feed")
//!     .concat();
//! assert!(document.contains(r#"<d:name m:type="String">Ada</d:name>"#));
//! assert!(document.ends_with("</feed>\n"));
//! ```

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod cell;
pub mod context;
pub mod pagination;
pub mod render;
pub mod row;
pub mod sanitize;
#[cfg(feature = "store-sqlite")]
pub mod source;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use cell::{CellValue, EdmType, ROWID_COLUMN, encode_cell, make_cells};
pub use context::{FeedConfig, FeedContext};
pub use pagination::{DEFAULT_PAGE_SIZE, PaginationError, PaginationState};
pub use render::{
    Clock, FeedError, FeedRenderer, FeedSummary, SystemClock, TimeBox, WriteFeedError, write_feed,
};
pub use row::{ColumnDescriptor, Columns, Row};
pub use sanitize::sanitize_identifier;
