//! Streaming feed renderer.
//!
//! [`FeedRenderer`] walks three phases and yields one text fragment per
//! step:
//!
//! 1. the feed header (namespaces, title, id, timestamp, `m:count`, self link);
//! 2. for each row from the cursor, an entry-open fragment, one fragment per
//!    data cell and an entry-close fragment;
//! 3. an optional `next` link followed by `</feed>`.
//!
//! The body is time-boxed: every [`TimeBox::checkpoint_rows`] entries the
//! renderer reads its [`Clock`] and ends the body early once more than
//! [`TimeBox::budget`] has elapsed. A time-boxed response still reaches the
//! footer and points the client at the first row it did not emit.
//!
//! A cursor failure or schema violation is yielded as a single `Err`, after
//! which the iterator is exhausted. No footer follows, so the document is
//! left unterminated; callers forwarding fragments to a client must surface
//! the error through their own channel.

mod clock;
mod templates;
mod write;

use std::fmt;
use std::iter::FusedIterator;

use log::{debug, info, warn};
use thiserror::Error;

use crate::cell::{CellValue, EdmType, encode_element};
use crate::context::FeedContext;
use crate::row::{Columns, Row};

pub use clock::{Clock, DEFAULT_BUDGET, DEFAULT_CHECKPOINT_ROWS, SystemClock, TimeBox};
pub use write::{WriteFeedError, write_feed};

use clock::Checkpoint;

/// Errors that end a feed before its footer.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The column set has no identity column, so entries cannot be named.
    #[error("column set has no `rowid` column")]
    MissingRowIdColumn,
    /// A row's width differs from the column set.
    #[error("row {position} has {found} values but the column set has {expected}")]
    ColumnCountMismatch {
        /// Zero-based index of the row in the collection.
        position: u64,
        /// Number of columns in the response.
        expected: usize,
        /// Number of values in the row.
        found: usize,
    },
    /// A row's identity value is not an integer.
    #[error("row {position} has a rowid of type {found}, expected Int64")]
    InvalidRowId {
        /// Zero-based index of the row in the collection.
        position: u64,
        /// Type of the value found in the identity column.
        found: EdmType,
    },
    /// The row cursor failed.
    #[error("row cursor failed after {emitted} rows: {source}")]
    Cursor {
        /// Entries completed before the failure.
        emitted: u64,
        /// Error reported by the cursor.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Outcome of a rendered (or partially rendered) feed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeedSummary {
    /// Entries completed.
    pub emitted: u64,
    /// Zero-based index of the first row not emitted.
    pub next_index: u64,
    /// Whether the time box ended the body early.
    pub timed_out: bool,
    /// Continuation query written into the `next` link, if any.
    pub continuation: Option<String>,
}

enum Phase {
    Header,
    Body,
    Cells { row: Row, next: usize },
    Footer,
    Close,
    Done,
}

/// Pull-based renderer producing the fragments of one feed document.
///
/// `I` is the row cursor: a single-pass iterator of rows already positioned
/// at the page offset. Dropping the renderer drops the cursor.
pub struct FeedRenderer<I, C = SystemClock> {
    context: FeedContext,
    columns: Columns,
    rows: I,
    clock: C,
    checkpoint: Checkpoint,
    phase: Phase,
    emitted: u64,
    timed_out: bool,
    continuation: Option<String>,
}

impl<I, C> fmt::Debug for FeedRenderer<I, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedRenderer")
            .field("collection", &self.context.config().collection())
            .field("columns", &self.columns.len())
            .field("emitted", &self.emitted)
            .field("timed_out", &self.timed_out)
            .finish_non_exhaustive()
    }
}

impl<I> FeedRenderer<I, SystemClock> {
    /// Prepare a renderer over `rows` using the system clock and the default
    /// [`TimeBox`].
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::MissingRowIdColumn`] when `columns` lacks the
    /// identity column. Nothing has been emitted at that point.
    pub fn new(context: FeedContext, columns: Columns, rows: I) -> Result<Self, FeedError> {
        if columns.rowid_index().is_none() {
            return Err(FeedError::MissingRowIdColumn);
        }
        let pagination = context.pagination();
        debug!(
            "rendering {} from offset {} with limit {} ({} rows in total)",
            context.config().collection(),
            pagination.offset(),
            pagination.limit(),
            context.total_count()
        );
        Ok(Self {
            context,
            columns,
            rows,
            clock: SystemClock,
            checkpoint: Checkpoint::new(TimeBox::default()),
            phase: Phase::Header,
            emitted: 0,
            timed_out: false,
            continuation: None,
        })
    }
}

impl<I, C> FeedRenderer<I, C> {
    /// Replace the clock used for time-boxing.
    #[must_use]
    pub fn with_clock<D: Clock>(self, clock: D) -> FeedRenderer<I, D> {
        FeedRenderer {
            context: self.context,
            columns: self.columns,
            rows: self.rows,
            clock,
            checkpoint: self.checkpoint,
            phase: self.phase,
            emitted: self.emitted,
            timed_out: self.timed_out,
            continuation: self.continuation,
        }
    }

    /// Replace the time box. Call before the first fragment is pulled.
    #[must_use]
    pub fn with_time_box(mut self, time_box: TimeBox) -> Self {
        self.checkpoint = Checkpoint::new(time_box);
        self
    }

    /// Context the feed is rendered with.
    #[must_use]
    pub const fn context(&self) -> &FeedContext {
        &self.context
    }

    /// Progress so far; final once the iterator is exhausted.
    #[must_use]
    pub fn summary(&self) -> FeedSummary {
        FeedSummary {
            emitted: self.emitted,
            next_index: self.next_index(),
            timed_out: self.timed_out,
            continuation: self.continuation.clone(),
        }
    }

    fn next_index(&self) -> u64 {
        self.context
            .pagination()
            .offset()
            .saturating_add(self.emitted)
    }

    fn open_entry(&mut self, row: Row) -> Result<String, FeedError> {
        let position = self.next_index();
        if row.len() != self.columns.len() {
            return Err(FeedError::ColumnCountMismatch {
                position,
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        let rowid = match self.columns.rowid_index().and_then(|index| row.get(index)) {
            Some(CellValue::Int64(rowid)) => *rowid,
            Some(other) => {
                return Err(FeedError::InvalidRowId {
                    position,
                    found: other.edm_type(),
                });
            }
            None => return Err(FeedError::MissingRowIdColumn),
        };
        let fragment = templates::entry_open(&self.context, rowid);
        self.phase = Phase::Cells { row, next: 0 };
        Ok(fragment)
    }

    fn open_footer(&mut self) -> Option<String> {
        let continuation = self
            .context
            .pagination()
            .continuation(self.next_index(), self.context.total_count());
        let link = continuation
            .as_deref()
            .map(|query| templates::next_link(&self.context, query));
        self.continuation = continuation;
        link
    }
}

impl<I, C: Clock> FeedRenderer<I, C> {
    fn next_cell(&mut self, row: Row, next: usize) -> String {
        let rowid_index = self.columns.rowid_index();
        let found = self
            .columns
            .iter()
            .zip(row.values())
            .enumerate()
            .skip(next)
            .find(|(index, _)| Some(*index) != rowid_index)
            .map(|(index, (column, value))| (index, encode_element(column.sanitized(), value)));
        match found {
            Some((index, cell)) => {
                self.phase = Phase::Cells {
                    row,
                    next: index + 1,
                };
                cell
            }
            None => self.close_entry(),
        }
    }

    fn close_entry(&mut self) -> String {
        self.emitted = self.emitted.saturating_add(1);
        if self.checkpoint.row_emitted(&self.clock) {
            self.timed_out = true;
            warn!(
                "time box exceeded after {} rows of {}; ending page at row {}",
                self.emitted,
                self.context.config().collection(),
                self.next_index()
            );
            self.phase = Phase::Footer;
        } else {
            self.phase = Phase::Body;
        }
        templates::ENTRY_CLOSE.to_owned()
    }
}

impl<I, E, C> Iterator for FeedRenderer<I, C>
where
    I: Iterator<Item = Result<Row, E>>,
    E: std::error::Error + Send + Sync + 'static,
    C: Clock,
{
    type Item = Result<String, FeedError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match std::mem::replace(&mut self.phase, Phase::Done) {
                Phase::Header => {
                    self.phase = Phase::Body;
                    return Some(Ok(templates::feed_open(&self.context)));
                }
                Phase::Body => {
                    // The time box covers the body only; the first pull
                    // after the header starts it.
                    self.checkpoint.start(&self.clock);
                    match self.rows.next() {
                        None => self.phase = Phase::Footer,
                        Some(Ok(row)) => return Some(self.open_entry(row)),
                        Some(Err(source)) => {
                            return Some(Err(FeedError::Cursor {
                                emitted: self.emitted,
                                source: Box::new(source),
                            }));
                        }
                    }
                }
                Phase::Cells { row, next } => return Some(Ok(self.next_cell(row, next))),
                Phase::Footer => {
                    self.phase = Phase::Close;
                    if let Some(link) = self.open_footer() {
                        return Some(Ok(link));
                    }
                }
                Phase::Close => {
                    info!(
                        "rendered {} rows of {} ({} total, next index {})",
                        self.emitted,
                        self.context.config().collection(),
                        self.context.total_count(),
                        self.next_index()
                    );
                    return Some(Ok(templates::FEED_CLOSE.to_owned()));
                }
                Phase::Done => return None,
            }
        }
    }
}

impl<I, E, C> FusedIterator for FeedRenderer<I, C>
where
    I: Iterator<Item = Result<Row, E>>,
    E: std::error::Error + Send + Sync + 'static,
    C: Clock,
{
}
