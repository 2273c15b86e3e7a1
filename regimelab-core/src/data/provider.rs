//! Broker collaborator contract and structured error types.
//!
//! The `BarSource` trait abstracts over whatever actually serves historical
//! bars (a live broker session, CSV files, a test double) so the ingestion
//! stage never depends on a broker library's types.

use crate::domain::Bar;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by a bar source.
///
/// The collaborator has a single transport failure kind; callers treat every
/// variant as retryable.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BrokerError {
    #[error("broker connection error: {0}")]
    Connection(String),

    #[error("broker is not connected; call connect() before requesting data")]
    NotConnected,
}

/// Structured error types for cache and pipeline operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("at least one symbol is required")]
    EmptySymbolList,

    #[error("missing required columns: {}", columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    #[error("no {stage} rows found for requested symbols")]
    NoSourceRows { stage: String },

    #[error("benchmark symbol {symbol} not found in feature cache")]
    BenchmarkMissing { symbol: String },

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("parquet I/O error: {0}")]
    ParquetError(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Broker(#[from] BrokerError),
}

impl From<polars::prelude::PolarsError> for DataError {
    fn from(e: polars::prelude::PolarsError) -> Self {
        DataError::ParquetError(e.to_string())
    }
}

/// Parameters of one historical-data request, in broker vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRequest {
    pub symbol: String,
    pub exchange: String,
    pub currency: String,
    /// Empty string means "now".
    pub end_datetime: String,
    pub duration: String,
    pub bar_size: String,
    pub what_to_show: String,
    pub use_rth: bool,
    pub format_date: u8,
}

/// Trait for historical bar sources.
///
/// Implementations may be slow and may fail transiently; the ingestion stage
/// owns retrying. Sources do not know about the cache.
pub trait BarSource: Send {
    /// Human-readable name of this source (recorded as `source` provenance).
    fn name(&self) -> &str;

    fn connect(&mut self) -> Result<(), BrokerError>;

    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    /// Daily bars for `request.symbol`, in any order.
    fn request_historical_data(&mut self, request: &HistoricalRequest) -> Result<Vec<Bar>, BrokerError>;
}
