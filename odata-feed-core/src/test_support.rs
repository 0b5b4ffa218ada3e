//! Deterministic clocks and row builders used by unit and behaviour tests.

use std::cell::Cell;
use std::time::{Duration, Instant};

use crate::{CellValue, Clock, Row};

/// Clock that advances by a fixed step on every read.
///
/// The first read returns the base instant, the `n`-th read returns
/// `base + step * (n - 1)`.
#[derive(Debug)]
pub struct SteppingClock {
    base: Instant,
    step: Duration,
    reads: Cell<u32>,
}

impl SteppingClock {
    /// Clock advancing `step` per read.
    #[must_use]
    pub fn new(step: Duration) -> Self {
        Self {
            base: Instant::now(),
            step,
            reads: Cell::new(0),
        }
    }

    /// Number of times [`Clock::now`] has been called.
    #[must_use]
    pub fn reads(&self) -> u32 {
        self.reads.get()
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> Instant {
        let reads = self.reads.get();
        self.reads.set(reads.saturating_add(1));
        self.base + self.step.saturating_mul(reads)
    }
}

impl Clock for &SteppingClock {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Rows `rowid, name, score` numbered from `first_rowid`.
#[must_use]
pub fn numbered_rows(first_rowid: i64, count: usize) -> Vec<Row> {
    (first_rowid..)
        .take(count)
        .map(|rowid| {
            Row::new(vec![
                CellValue::Int64(rowid),
                CellValue::String(format!("row {rowid}")),
                CellValue::Int64(rowid.saturating_mul(10)),
            ])
        })
        .collect()
}
