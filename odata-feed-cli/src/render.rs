//! `render` command: write one feed page to stdout or a file.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use log::info;
use odata_feed_core::source::SqliteRows;
use odata_feed_core::{FeedRenderer, PaginationState, write_feed};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::feed::{FeedRequest, open_database, require_existing, with_feed};
use crate::{
    ARG_BASE_PATH, ARG_COLLECTION, ARG_DATABASE, ARG_OUTPUT, ARG_SERVER_HOST, CliError,
    ENV_RENDER_COLLECTION, ENV_RENDER_DATABASE, fs,
};

/// Host written into feed URLs when none is configured.
pub(crate) const DEFAULT_SERVER_HOST: &str = "localhost";
/// Path prefix written into feed URLs when none is configured.
pub(crate) const DEFAULT_BASE_PATH: &str = "/odata";

/// CLI arguments for the `render` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "render",
    long_about = "Render one page of a SQLite table as an OData Atom feed. \
                 Paging follows the OData query options: --top sets the page \
                 size, --skip the offset, and --skiptoken resumes from a \
                 previous response's next link.",
    about = "Render one page of a collection"
)]
#[ortho_config(prefix = "ODATA_FEED")]
pub(crate) struct RenderArgs {
    /// Collection (table) to render.
    #[arg(value_name = "collection")]
    #[serde(default)]
    pub(crate) collection: Option<String>,
    /// Path to the SQLite database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Maximum number of rows (`$top`).
    #[arg(long = "top", value_name = "rows")]
    #[serde(default)]
    pub(crate) top: Option<String>,
    /// Rows to skip (`$skip`).
    #[arg(long = "skip", value_name = "rows")]
    #[serde(default)]
    pub(crate) skip: Option<String>,
    /// Continuation token from a previous `next` link (`$skiptoken`).
    #[arg(long = "skiptoken", value_name = "token")]
    #[serde(default)]
    pub(crate) skiptoken: Option<String>,
    /// Host name used in feed URLs.
    #[arg(long = ARG_SERVER_HOST, value_name = "host")]
    #[serde(default)]
    pub(crate) server_host: Option<String>,
    /// Path prefix under which collections are served.
    #[arg(long = ARG_BASE_PATH, value_name = "path")]
    #[serde(default)]
    pub(crate) base_path: Option<String>,
    /// Write the feed to this file instead of stdout.
    #[arg(long = ARG_OUTPUT, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
}

impl RenderArgs {
    pub(crate) fn into_config(self) -> Result<RenderConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        RenderConfig::try_from(merged)
    }
}

/// Resolved `render` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RenderConfig {
    pub(crate) request: FeedRequest,
    pub(crate) output: Option<Utf8PathBuf>,
}

impl RenderConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        require_existing(&self.request.database, ARG_DATABASE)
    }
}

impl TryFrom<RenderArgs> for RenderConfig {
    type Error = CliError;

    fn try_from(args: RenderArgs) -> Result<Self, Self::Error> {
        let collection = args.collection.ok_or(CliError::MissingArgument {
            field: ARG_COLLECTION,
            env: ENV_RENDER_COLLECTION,
        })?;
        let database = args.database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env: ENV_RENDER_DATABASE,
        })?;
        let pagination = PaginationState::from_params(
            args.top.as_deref(),
            args.skip.as_deref(),
            args.skiptoken.as_deref(),
        )?;
        Ok(Self {
            request: FeedRequest {
                database,
                collection,
                pagination,
                server_host: args
                    .server_host
                    .unwrap_or_else(|| DEFAULT_SERVER_HOST.to_owned()),
                base_path: args
                    .base_path
                    .unwrap_or_else(|| DEFAULT_BASE_PATH.to_owned()),
            },
            output: args.output,
        })
    }
}

pub(crate) fn run_render(args: RenderArgs, stdout: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    render_with(&config, stdout)
}

pub(crate) fn render_with(config: &RenderConfig, stdout: &mut dyn Write) -> Result<(), CliError> {
    let connection = open_database(&config.request.database)?;
    with_feed(&connection, &config.request, |renderer| {
        match &config.output {
            Some(path) => {
                let mut file =
                    fs::create_file(path).map_err(|source| CliError::CreateOutput {
                        path: path.clone(),
                        source,
                    })?;
                stream(renderer, &mut file)
            }
            None => stream(renderer, stdout),
        }
    })
}

fn stream<W: Write + ?Sized>(
    renderer: FeedRenderer<SqliteRows<'_>>,
    writer: &mut W,
) -> Result<(), CliError> {
    let summary = write_feed(renderer, writer)?;
    info!(
        "wrote {} entries (next index {}, time-boxed: {})",
        summary.emitted, summary.next_index, summary.timed_out
    );
    Ok(())
}
