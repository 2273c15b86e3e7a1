//! Clock and run-identifier sources.
//!
//! Stages never read the wall clock or the global RNG directly; they go
//! through these traits so tests can pin both.

use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Timestamp format used in run identifiers.
pub const RUN_ID_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Timestamp format used in part-file names (`part-<ts>.parquet`).
pub const PART_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%6fZ";

/// Source of "now" in UTC.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;
}

/// The real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Produces run identifiers.
pub trait RunIdGenerator: Send + Sync {
    fn next_run_id(&self, now: DateTime<Utc>) -> String;
}

/// `<UTC timestamp>-<8 random hex digits>`, e.g. `20260210T143000-1a2b3c4d`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomRunIds;

impl RunIdGenerator for RandomRunIds {
    fn next_run_id(&self, now: DateTime<Utc>) -> String {
        let suffix: u32 = rand::thread_rng().gen();
        format!("{}-{suffix:08x}", now.format(RUN_ID_TIMESTAMP_FORMAT))
    }
}

/// Hands out a fixed sequence of identifiers, then repeats the last one.
#[derive(Debug)]
pub struct FixedRunIds {
    ids: Vec<String>,
    next: AtomicUsize,
}

impl FixedRunIds {
    pub fn new(ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
            next: AtomicUsize::new(0),
        }
    }
}

impl RunIdGenerator for FixedRunIds {
    fn next_run_id(&self, now: DateTime<Utc>) -> String {
        let i = self.next.fetch_add(1, Ordering::Relaxed);
        match self.ids.get(i).or_else(|| self.ids.last()) {
            Some(id) => id.clone(),
            None => now.format(RUN_ID_TIMESTAMP_FORMAT).to_string(),
        }
    }
}

/// Part-file stamp for a write happening at `at`.
pub fn part_timestamp(at: DateTime<Utc>) -> String {
    at.format(PART_TIMESTAMP_FORMAT).to_string()
}
