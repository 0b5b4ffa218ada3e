//! Error types emitted by the odata-feed CLI.
//!
//! Keep this error type reasonably small, as every command helper returns
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use odata_feed_core::source::SqliteSourceError;
use odata_feed_core::{FeedError, PaginationError, WriteFeedError};
use thiserror::Error;

/// Errors emitted by the odata-feed CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        field: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The request path does not name exactly one collection.
    #[error("request path {path:?} does not name a collection")]
    NoCollection { path: String },
    /// `$top`, `$skip` or `$skiptoken` was malformed.
    #[error(transparent)]
    Pagination(#[from] PaginationError),
    /// Opening the SQLite database failed.
    #[error("failed to open database {path:?}: {source}")]
    OpenDatabase {
        path: Utf8PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    /// The collection could not be read.
    #[error(transparent)]
    Source(#[from] SqliteSourceError),
    /// The renderer rejected the collection before any output.
    #[error(transparent)]
    Feed(#[from] FeedError),
    /// Rendering or writing failed after output had started.
    #[error("feed output was truncated: {0}")]
    Stream(#[from] WriteFeedError),
    /// Opening the output file failed.
    #[error("failed to create output file {path:?}: {source}")]
    CreateOutput {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Writing headers or flushing output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
    /// Opening the log file failed.
    #[error("failed to open log file {path:?}: {source}")]
    OpenLog {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A logger was already installed for this process.
    #[error("failed to install logger: {0}")]
    InstallLogger(#[from] log::SetLoggerError),
}

impl CliError {
    /// CGI status line reporting this error when no output has been written.
    #[must_use]
    pub const fn status(&self) -> &'static str {
        match self {
            Self::Pagination(_) => "400 Bad Request",
            Self::NoCollection { .. } | Self::Source(SqliteSourceError::UnknownTable { .. }) => {
                "404 Not Found"
            }
            _ => "500 Internal Server Error",
        }
    }
}
