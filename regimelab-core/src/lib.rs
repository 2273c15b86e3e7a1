//! RegimeLab Core: domain rows, partitioned cache, quality checks, indicators, signals.
//!
//! This crate holds everything that does not talk to a broker or write reports:
//! - Row types for each cache stage (raw → normalized → cleaned → feature → signal)
//! - Symbol/year/month partitioned Parquet store with append and upsert-latest writes
//! - Bar normalization with adjusted-close fallback
//! - Data-quality engine (dedupe, validate, outlier flags, calendar alignment)
//! - Indicator engine with warm-up and missing-bar masking
//! - Market regime and trend eligibility rules

pub mod data;
pub mod domain;
pub mod indicators;
pub mod signals;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: rows and the store can cross thread boundaries.
    ///
    /// The indicator engine fans symbols out over rayon and the runner hands
    /// stage environments to worker threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::RawRow>();
        require_sync::<domain::RawRow>();
        require_send::<domain::NormalizedRow>();
        require_sync::<domain::NormalizedRow>();
        require_send::<domain::CleanedRow>();
        require_sync::<domain::CleanedRow>();
        require_send::<domain::FeatureRow>();
        require_sync::<domain::FeatureRow>();
        require_send::<domain::SignalRow>();
        require_sync::<domain::SignalRow>();

        require_send::<data::PartitionedStore>();
        require_sync::<data::PartitionedStore>();
        require_send::<indicators::IndicatorConfig>();
        require_sync::<indicators::IndicatorConfig>();

        require_send::<domain::SystemClock>();
        require_sync::<domain::FixedRunIds>();
    }
}
