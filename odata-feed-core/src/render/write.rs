//! Push adapter draining a renderer into an [`io::Write`](std::io::Write).

use std::io::{self, Write};

use thiserror::Error;

use super::{Clock, FeedError, FeedRenderer, FeedSummary};
use crate::row::Row;

/// Errors raised while streaming a feed into a writer.
#[derive(Debug, Error)]
pub enum WriteFeedError {
    /// Rendering failed; the fragments written so far form a truncated
    /// document.
    #[error("failed to render feed: {0}")]
    Render(#[from] FeedError),
    /// The writer rejected a fragment.
    #[error("failed to write feed: {0}")]
    Write(#[source] io::Error),
}

/// Write every fragment of `renderer` to `writer` as it is produced.
///
/// Returns the final [`FeedSummary`] once the closing tag has been written
/// and the writer flushed.
///
/// # Errors
///
/// Returns [`WriteFeedError::Render`] when the renderer fails mid-stream and
/// [`WriteFeedError::Write`] when the writer does. In both cases the output
/// already written is not repaired.
///
/// # Examples
/// ```
/// use odata_feed_core::{
///     CellValue, Columns, FeedConfig, FeedContext, FeedRenderer, PaginationState, Row,
///     write_feed,
/// };
///
/// let rows = (1..=3).map(|id| Ok::<_, std::io::Error>(Row::new(vec![CellValue::Int64(id)])));
/// let context = FeedContext::new(
///     FeedConfig::new("example.org", "/api", "ids"),
///     5,
///     PaginationState::new(0, 3),
/// );
/// let renderer = FeedRenderer::new(context, Columns::from_names(["rowid"]), rows)
///     .expect("rowid column");
///
/// let mut out = Vec::new();
/// let summary = write_feed(renderer, &mut out).expect("write feed");
/// assert_eq!(summary.emitted, 3);
/// assert_eq!(summary.continuation.as_deref(), Some("?$top=3&$skip=3"));
/// ```
pub fn write_feed<I, E, C, W>(
    mut renderer: FeedRenderer<I, C>,
    writer: &mut W,
) -> Result<FeedSummary, WriteFeedError>
where
    I: Iterator<Item = Result<Row, E>>,
    E: std::error::Error + Send + Sync + 'static,
    C: Clock,
    W: Write + ?Sized,
{
    for fragment in renderer.by_ref() {
        writer
            .write_all(fragment?.as_bytes())
            .map_err(WriteFeedError::Write)?;
    }
    writer.flush().map_err(WriteFeedError::Write)?;
    Ok(renderer.summary())
}
