//! Test helpers for building SQLite fixtures and fake CGI environments.

use std::collections::HashMap;
use std::io::Read;

use camino::{Utf8Path, Utf8PathBuf};
use flate2::read::GzDecoder;
use rusqlite::Connection;
use tempfile::TempDir;

/// Temporary database holding a `tweets` table with `count` rows.
pub(super) struct Database {
    _dir: TempDir,
    path: Utf8PathBuf,
}

impl Database {
    pub(super) fn with_tweets(count: i64) -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir");
        let path = root.join("scraperwiki.sqlite");
        let conn = Connection::open(path.as_std_path()).expect("open database");
        conn.execute_batch("CREATE TABLE tweets (\"screen name\" TEXT, text TEXT, posted DATETIME)")
            .expect("create tweets");
        for id in 1..=count {
            conn.execute(
                "INSERT INTO tweets VALUES (?1, ?2, '2024-01-19 12:00:00')",
                rusqlite::params![format!("user{id}"), format!("tweet <{id}> & more")],
            )
            .expect("insert tweet");
        }
        Self { _dir: dir, path }
    }

    pub(super) fn path(&self) -> &Utf8Path {
        &self.path
    }
}

/// Environment lookup backed by a map.
pub(super) fn env_from(
    vars: &[(&str, &str)],
) -> impl Fn(&str) -> Option<String> + use<> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
        .collect();
    move |name| vars.get(name).cloned()
}

/// Split a CGI response into its header block and body.
pub(super) fn split_response(response: &[u8]) -> (String, Vec<u8>) {
    let boundary = response
        .windows(2)
        .position(|window| window == b"\n\n")
        .expect("header block terminator");
    let (headers, body) = response.split_at(boundary + 2);
    (
        String::from_utf8(headers.to_vec()).expect("headers are UTF-8"),
        body.to_vec(),
    )
}

/// Decompress a gzip body.
pub(super) fn gunzip(body: &[u8]) -> String {
    let mut text = String::new();
    GzDecoder::new(body)
        .read_to_string(&mut text)
        .expect("valid gzip stream");
    text
}
