//! File logger for CGI mode, where stdout carries the response.

use camino::Utf8Path;
use simplelog::{Config, LevelFilter, WriteLogger};

use crate::{CliError, fs};

/// Send `info` and above to `path`, appending to earlier runs.
pub(crate) fn init_file_logger(path: &Utf8Path) -> Result<(), CliError> {
    let file = fs::append_file(path).map_err(|source| CliError::OpenLog {
        path: path.to_path_buf(),
        source,
    })?;
    WriteLogger::init(LevelFilter::Info, Config::default(), file)?;
    Ok(())
}
