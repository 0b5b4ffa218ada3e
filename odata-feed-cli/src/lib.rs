//! Command-line front end serving SQLite tables as OData Atom feeds.
//!
//! Two subcommands share one rendering path:
//!
//! - `render` writes one feed page for a table to stdout or a file;
//! - `cgi` answers a single request under the CGI/1.1 environment contract,
//!   writing the status and content headers before the feed body.
#![forbid(unsafe_code)]

use std::io::Write;

use clap::{Parser, Subcommand};

mod cgi;
mod error;
mod feed;
mod fs;
mod logging;
mod render;

pub use error::CliError;

use cgi::{CgiArgs, run_cgi};
use render::{RenderArgs, run_render};

pub(crate) const ARG_DATABASE: &str = "database";
pub(crate) const ARG_COLLECTION: &str = "collection";
pub(crate) const ARG_SERVER_HOST: &str = "server-host";
pub(crate) const ARG_BASE_PATH: &str = "base-path";
pub(crate) const ARG_OUTPUT: &str = "output";
pub(crate) const ARG_LOG_FILE: &str = "log-file";
pub(crate) const ENV_RENDER_DATABASE: &str = "ODATA_FEED_CMDS_RENDER_DATABASE";
pub(crate) const ENV_RENDER_COLLECTION: &str = "ODATA_FEED_CMDS_RENDER_COLLECTION";
pub(crate) const ENV_CGI_DATABASE: &str = "ODATA_FEED_CMDS_CGI_DATABASE";

/// Run the CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns [`CliError`] when arguments or configuration are invalid, or when
/// the feed cannot be produced.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Render(args) => {
            let mut stdout = std::io::stdout().lock();
            run_render(args, &mut stdout)
        }
        Command::Cgi(args) => {
            let mut stdout = std::io::stdout().lock();
            run_cgi(args, &cgi::process_env, &mut stdout)?;
            stdout.flush().map_err(CliError::WriteOutput)
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "odata-feed",
    about = "Serve SQLite tables as paged OData Atom feeds",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render one page of a collection.
    Render(RenderArgs),
    /// Answer one request as a CGI/1.1 program.
    Cgi(CgiArgs),
}

#[cfg(test)]
mod tests;
