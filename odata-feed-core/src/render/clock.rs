//! Monotonic time source and the per-response time box.

use std::time::{Duration, Instant};

/// Rows emitted between two reads of the clock.
pub const DEFAULT_CHECKPOINT_ROWS: u64 = 1000;

/// Elapsed time after which the body ends at the next checkpoint.
pub const DEFAULT_BUDGET: Duration = Duration::from_secs(4);

/// Source of monotonic instants used to time-box rendering.
pub trait Clock {
    /// Current instant.
    fn now(&self) -> Instant;
}

/// [`Clock`] backed by [`Instant::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Soft bound on the time spent emitting entries.
///
/// The clock is consulted only after every `checkpoint_rows` entries, so a
/// response may overrun the budget by up to one checkpoint interval.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use odata_feed_core::TimeBox;
///
/// let time_box = TimeBox::default();
/// assert_eq!(time_box.checkpoint_rows(), 1000);
/// assert_eq!(time_box.budget(), Duration::from_secs(4));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBox {
    checkpoint_rows: u64,
    budget: Duration,
}

impl Default for TimeBox {
    fn default() -> Self {
        Self {
            checkpoint_rows: DEFAULT_CHECKPOINT_ROWS,
            budget: DEFAULT_BUDGET,
        }
    }
}

impl TimeBox {
    /// Check the clock every `checkpoint_rows` rows (at least one) and stop
    /// once more than `budget` has elapsed.
    #[must_use]
    pub const fn new(checkpoint_rows: u64, budget: Duration) -> Self {
        Self {
            checkpoint_rows: if checkpoint_rows == 0 {
                1
            } else {
                checkpoint_rows
            },
            budget,
        }
    }

    /// Rows between clock reads.
    #[must_use]
    pub const fn checkpoint_rows(&self) -> u64 {
        self.checkpoint_rows
    }

    /// Elapsed-time threshold.
    #[must_use]
    pub const fn budget(&self) -> Duration {
        self.budget
    }
}

/// Countdown to the next checkpoint plus the instant the body started.
#[derive(Debug)]
pub(super) struct Checkpoint {
    time_box: TimeBox,
    rows_until_check: u64,
    started: Option<Instant>,
}

impl Checkpoint {
    pub(super) const fn new(time_box: TimeBox) -> Self {
        Self {
            time_box,
            rows_until_check: time_box.checkpoint_rows,
            started: None,
        }
    }

    /// Record the body start; later calls keep the first instant.
    pub(super) fn start(&mut self, clock: &impl Clock) {
        if self.started.is_none() {
            self.started = Some(clock.now());
        }
    }

    /// Count one emitted row. Returns `true` when this row completes a
    /// checkpoint interval and the budget has been exceeded.
    pub(super) fn row_emitted(&mut self, clock: &impl Clock) -> bool {
        self.rows_until_check = self.rows_until_check.saturating_sub(1);
        if self.rows_until_check > 0 {
            return false;
        }
        self.rows_until_check = self.time_box.checkpoint_rows;
        let Some(started) = self.started else {
            return false;
        };
        clock.now().saturating_duration_since(started) > self.time_box.budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::SteppingClock;
    use rstest::rstest;

    #[rstest]
    fn zero_checkpoint_is_clamped() {
        assert_eq!(TimeBox::new(0, DEFAULT_BUDGET).checkpoint_rows(), 1);
    }

    #[rstest]
    fn clock_is_read_only_on_checkpoint_boundaries() {
        let clock = SteppingClock::new(Duration::from_secs(10));
        let mut checkpoint = Checkpoint::new(TimeBox::new(3, Duration::from_secs(4)));
        checkpoint.start(&clock);
        assert!(!checkpoint.row_emitted(&clock));
        assert!(!checkpoint.row_emitted(&clock));
        assert_eq!(clock.reads(), 1);
        assert!(checkpoint.row_emitted(&clock));
        assert_eq!(clock.reads(), 2);
    }

    #[rstest]
    fn within_budget_keeps_going() {
        let clock = SteppingClock::new(Duration::from_secs(1));
        let mut checkpoint = Checkpoint::new(TimeBox::new(1, Duration::from_secs(4)));
        checkpoint.start(&clock);
        for _ in 0..4 {
            assert!(!checkpoint.row_emitted(&clock));
        }
        // Fifth read is five seconds after the start.
        assert!(checkpoint.row_emitted(&clock));
    }

    #[rstest]
    fn exactly_on_budget_is_not_over() {
        let clock = SteppingClock::new(Duration::from_secs(4));
        let mut checkpoint = Checkpoint::new(TimeBox::new(1, Duration::from_secs(4)));
        checkpoint.start(&clock);
        assert!(!checkpoint.row_emitted(&clock));
    }
}
