//! Rendering path shared by the `render` and `cgi` commands.

use camino::{Utf8Path, Utf8PathBuf};
use log::info;
use odata_feed_core::source::{SqliteCollection, SqliteRows};
use odata_feed_core::{FeedConfig, FeedContext, FeedRenderer, PaginationState};
use rusqlite::{Connection, OpenFlags};

use crate::{CliError, fs};

/// Everything needed to render one page of one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FeedRequest {
    pub(crate) database: Utf8PathBuf,
    pub(crate) collection: String,
    pub(crate) pagination: PaginationState,
    pub(crate) server_host: String,
    pub(crate) base_path: String,
}

/// Check that `path` names an existing regular file.
pub(crate) fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
    match fs::file_is_file(path) {
        Ok(true) => Ok(()),
        Ok(false) => Err(CliError::SourcePathNotFile {
            field,
            path: path.to_path_buf(),
        }),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            Err(CliError::MissingSourceFile {
                field,
                path: path.to_path_buf(),
            })
        }
        Err(source) => Err(CliError::InspectSourcePath {
            field,
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Open the database read-only; feeds never write.
pub(crate) fn open_database(path: &Utf8Path) -> Result<Connection, CliError> {
    Connection::open_with_flags(
        path.as_std_path(),
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|source| CliError::OpenDatabase {
        path: path.to_path_buf(),
        source,
    })
}

/// Prepare the renderer for `request` and hand it to `emit`.
///
/// Every error returned before `emit` runs leaves the caller's output
/// untouched, so callers may still answer with an error status.
pub(crate) fn with_feed<T, F>(
    connection: &Connection,
    request: &FeedRequest,
    emit: F,
) -> Result<T, CliError>
where
    F: for<'rows> FnOnce(FeedRenderer<SqliteRows<'rows>>) -> Result<T, CliError>,
{
    let collection = SqliteCollection::open(connection, &request.collection)?;
    let total = collection.count()?;
    let pagination = request.pagination;
    info!(
        "serving {} (offset {}, limit {}, {total} rows)",
        request.collection,
        pagination.offset(),
        pagination.limit()
    );
    let mut page = collection.page(pagination.offset(), pagination.limit())?;
    let rows = page.rows()?;
    let context = FeedContext::new(
        FeedConfig::new(
            request.server_host.as_str(),
            request.base_path.as_str(),
            collection.table(),
        ),
        total,
        pagination,
    );
    let renderer = FeedRenderer::new(context, collection.columns().clone(), rows)?;
    emit(renderer)
}
