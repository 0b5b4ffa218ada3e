//! Shared fixtures for the integration tests.

use std::cell::Cell;
use std::path::Path;
use std::time::{Duration, Instant};

use odata_feed_core::Clock;
use rusqlite::Connection;

/// Clock advancing a fixed step on every read.
#[derive(Debug)]
pub struct StepClock {
    base: Instant,
    step: Duration,
    reads: Cell<u32>,
}

impl StepClock {
    /// Create a clock that starts now and advances `step` per read.
    pub fn new(step: Duration) -> Self {
        Self {
            base: Instant::now(),
            step,
            reads: Cell::new(0),
        }
    }
}

impl Clock for StepClock {
    fn now(&self) -> Instant {
        let reads = self.reads.get();
        self.reads.set(reads + 1);
        self.base + self.step * reads
    }
}

/// Create `scores(name TEXT, score INTEGER, passed BOOLEAN)` holding `count`
/// rows with rowids `1..=count`.
pub fn seed_scores(path: &Path, count: i64) {
    let mut conn = Connection::open(path).expect("open database");
    let tx = conn.transaction().expect("begin transaction");
    tx.execute(
        "CREATE TABLE scores (name TEXT, score INTEGER, passed BOOLEAN)",
        [],
    )
    .expect("create scores");
    for id in 1..=count {
        tx.execute(
            "INSERT INTO scores (rowid, name, score, passed) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![id, format!("player {id}"), id * 10, id % 2 == 0],
        )
        .expect("insert score");
    }
    tx.commit().expect("commit scores");
}

/// Create a `people` table whose column names need sanitising.
pub fn seed_people(path: &Path) {
    let conn = Connection::open(path).expect("open database");
    conn.execute_batch(
        "CREATE TABLE people (\"First name\" TEXT, \"e-mail\" TEXT, \"xml_id\" INTEGER, born DATE);
         INSERT INTO people VALUES ('Ada', 'ada@example.org', 7, '1815-12-10');",
    )
    .expect("seed people");
}
