//! `cgi` command: answer one request under the CGI/1.1 contract.
//!
//! The request arrives through environment variables. `PATH_INFO` carries
//! `<base path>/<collection>` where the base path is the first four path
//! segments (`/tool/token/cgi-bin/odata`), and `QUERY_STRING` carries the
//! paging options. The response is a header block, a blank line and the
//! feed, gzip-compressed when `HTTP_ACCEPT_ENCODING` mentions gzip.

use std::io::{self, Write};

use camino::Utf8PathBuf;
use clap::Parser;
use flate2::Compression;
use flate2::write::GzEncoder;
use log::{error, info};
use odata_feed_core::{PaginationState, write_feed};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::feed::{FeedRequest, open_database, require_existing, with_feed};
use crate::render::DEFAULT_SERVER_HOST;
use crate::{ARG_DATABASE, ARG_LOG_FILE, ARG_SERVER_HOST, CliError, ENV_CGI_DATABASE, logging};

pub(crate) const FEED_CONTENT_TYPE: &str = "application/xml;charset=utf-8";
const ERROR_CONTENT_TYPE: &str = "text/plain;charset=utf-8";
/// Leading empty segment plus the four segments of the base path.
const BASE_SEGMENTS: usize = 5;
const GZIP_LEVEL: u32 = 1;

/// CLI arguments for the `cgi` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "cgi",
    long_about = "Serve one request as a CGI/1.1 program. The collection and \
                 paging options are read from PATH_INFO and QUERY_STRING; the \
                 database and log file come from flags, configuration files \
                 or ODATA_FEED_CMDS_CGI_* variables.",
    about = "Answer one CGI request"
)]
#[ortho_config(prefix = "ODATA_FEED")]
pub(crate) struct CgiArgs {
    /// Path to the SQLite database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Host used in feed URLs when the request carries no `Host` header.
    #[arg(long = ARG_SERVER_HOST, value_name = "host")]
    #[serde(default)]
    pub(crate) server_host: Option<String>,
    /// Append log records to this file.
    #[arg(long = ARG_LOG_FILE, value_name = "path")]
    #[serde(default)]
    pub(crate) log_file: Option<Utf8PathBuf>,
}

impl CgiArgs {
    pub(crate) fn into_config(self) -> Result<CgiConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        CgiConfig::try_from(merged)
    }
}

/// Resolved `cgi` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CgiConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) server_host: String,
    pub(crate) log_file: Option<Utf8PathBuf>,
}

impl CgiConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        require_existing(&self.database, ARG_DATABASE)
    }
}

impl TryFrom<CgiArgs> for CgiConfig {
    type Error = CliError;

    fn try_from(args: CgiArgs) -> Result<Self, Self::Error> {
        let database = args.database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env: ENV_CGI_DATABASE,
        })?;
        Ok(Self {
            database,
            server_host: args
                .server_host
                .unwrap_or_else(|| DEFAULT_SERVER_HOST.to_owned()),
            log_file: args.log_file,
        })
    }
}

/// Request values taken from the CGI environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CgiRequest {
    pub(crate) path_info: String,
    pub(crate) query_string: String,
    pub(crate) host: Option<String>,
    pub(crate) accepts_gzip: bool,
}

impl CgiRequest {
    pub(crate) fn from_env(lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        Self {
            path_info: lookup("PATH_INFO").unwrap_or_default(),
            query_string: lookup("QUERY_STRING").unwrap_or_default(),
            host: lookup("HTTP_HOST").filter(|host| !host.is_empty()),
            accepts_gzip: lookup("HTTP_ACCEPT_ENCODING")
                .is_some_and(|encodings| encodings.contains("gzip")),
        }
    }

    /// Split `PATH_INFO` into the base path and the collection name.
    ///
    /// A single trailing `/` after the collection is accepted.
    pub(crate) fn route(&self) -> Result<(String, String), CliError> {
        let mut segments = self.path_info.split('/');
        let base: Vec<&str> = segments.by_ref().take(BASE_SEGMENTS).collect();
        let collection = segments.next().filter(|name| !name.is_empty());
        let trailing = segments.collect::<Vec<_>>();
        match (base.len(), collection, trailing.as_slice()) {
            (BASE_SEGMENTS, Some(collection), [] | [""]) => {
                Ok((base.join("/"), collection.to_owned()))
            }
            _ => Err(CliError::NoCollection {
                path: self.path_info.clone(),
            }),
        }
    }
}

/// Read a variable from the process environment.
pub(crate) fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Serve the request described by `env`, writing the full CGI response to
/// `out`.
///
/// Failures before the feed starts are answered with an error status and
/// return `Ok`. Failures after the `200` header has been sent leave a
/// truncated body and are returned.
pub(crate) fn run_cgi(
    args: CgiArgs,
    env: &dyn Fn(&str) -> Option<String>,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let request = CgiRequest::from_env(env);
    let result = args.into_config().and_then(|config| {
        config.validate_sources()?;
        if let Some(path) = &config.log_file {
            logging::init_file_logger(path)?;
        }
        serve(&config, &request, out)
    });
    match result {
        Ok(()) => Ok(()),
        Err(err) if output_started(&err) => {
            error!("response to {} truncated: {err}", request.path_info);
            Err(err)
        }
        Err(err) => {
            error!("request for {} failed: {err}", request.path_info);
            write_error(out, &err).map_err(CliError::WriteOutput)
        }
    }
}

pub(crate) fn serve(
    config: &CgiConfig,
    request: &CgiRequest,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let (base_path, collection) = request.route()?;
    let pagination = PaginationState::from_query(&request.query_string)?;
    let feed = FeedRequest {
        database: config.database.clone(),
        collection,
        pagination,
        server_host: request
            .host
            .clone()
            .unwrap_or_else(|| config.server_host.clone()),
        base_path,
    };
    let connection = open_database(&feed.database)?;
    with_feed(&connection, &feed, |renderer| {
        write_headers(out, request.accepts_gzip).map_err(CliError::WriteOutput)?;
        let summary = if request.accepts_gzip {
            let mut encoder = GzEncoder::new(&mut *out, Compression::new(GZIP_LEVEL));
            let written = write_feed(renderer, &mut encoder)?;
            encoder.finish().map_err(CliError::WriteOutput)?;
            written
        } else {
            write_feed(renderer, out)?
        };
        info!(
            "served {} entries of {} (next index {}, time-boxed: {})",
            summary.emitted, feed.collection, summary.next_index, summary.timed_out
        );
        Ok(())
    })
}

fn output_started(err: &CliError) -> bool {
    matches!(err, CliError::Stream(_) | CliError::WriteOutput(_))
}

fn write_headers(out: &mut dyn Write, gzip: bool) -> io::Result<()> {
    writeln!(out, "Status: 200 OK")?;
    writeln!(out, "Content-Type: {FEED_CONTENT_TYPE}")?;
    if gzip {
        writeln!(out, "Content-Encoding: gzip")?;
    }
    writeln!(out)
}

fn write_error(out: &mut dyn Write, err: &CliError) -> io::Result<()> {
    writeln!(out, "Status: {}", err.status())?;
    writeln!(out, "Content-Type: {ERROR_CONTENT_TYPE}")?;
    writeln!(out)?;
    writeln!(out, "{err}")?;
    out.flush()
}
