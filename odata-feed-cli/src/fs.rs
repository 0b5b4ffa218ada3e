//! Filesystem helpers built on `cap-std` and `camino`.

use std::io;

use camino::Utf8Path;
use cap_std::fs::OpenOptions;
use cap_std::{ambient_authority, fs_utf8};

/// Resolve an ambient directory for the given path and return it with the
/// file name.
fn open_dir_and_file(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, String)> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::other("target should include a file name"))?
        .to_owned();
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, file_name))
}

/// Return whether a path exists and is a regular file.
pub(crate) fn file_is_file(path: &Utf8Path) -> io::Result<bool> {
    let (dir, name) = open_dir_and_file(path)?;
    dir.metadata(name.as_str()).map(|meta| meta.is_file())
}

/// Create (or truncate) the file at `path`.
pub(crate) fn create_file(path: &Utf8Path) -> io::Result<fs_utf8::File> {
    let (dir, name) = open_dir_and_file(path)?;
    dir.create(name.as_str())
}

/// Open the file at `path` for appending, creating it when missing.
pub(crate) fn append_file(path: &Utf8Path) -> io::Result<fs_utf8::File> {
    let (dir, name) = open_dir_and_file(path)?;
    let mut options = OpenOptions::new();
    options.append(true).create(true);
    dir.open_with(name.as_str(), &options)
}
