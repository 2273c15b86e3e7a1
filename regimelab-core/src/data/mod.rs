//! Cache store, bar normalization and data-quality checks

pub mod adjust;
pub mod align;
pub mod cache;
pub mod provider;
pub mod quality;
pub mod schema;

pub use adjust::{adjustment_factor, bars_to_rows, normalize, Normalization};
pub use align::{align_to_calendar, calendar};
pub use cache::{PartitionRecord, PartitionedStore, WriteMode};
pub use provider::{BarSource, BrokerError, DataError, HistoricalRequest};
pub use quality::{
    dedupe_by_input_order, dedupe_latest, drop_invalid, flag_outliers, is_valid, run_quality,
    QualitySummary, DEFAULT_OUTLIER_THRESHOLD, NO_SOURCE_ROWS_WARNING,
};
pub use schema::FrameCodec;
