//! Stage and per-symbol error types.

use regimelab_core::data::{BrokerError, DataError};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that abort a whole stage run.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to connect bar source: {0}")]
    Connect(#[source] BrokerError),
    #[error("report error: {0:#}")]
    Report(#[from] anyhow::Error),
}

/// Why a single symbol failed during ingestion.
///
/// These never abort the run; they land in the run's `failures` map.
#[derive(Debug, Error)]
pub enum SymbolError {
    #[error("No raw bars returned for symbol {symbol}")]
    NoRawBars { symbol: String },
    #[error("{last} (after {attempts} attempts)")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: BrokerError,
    },
    #[error(transparent)]
    Store(#[from] DataError),
}
