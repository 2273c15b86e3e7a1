//! RegimeLab Runner: pipeline stages, run reports, bar sources.
//!
//! This crate builds on `regimelab-core` to provide:
//! - Pipeline configuration loaded from TOML
//! - Ingestion from any `BarSource` with retries, throttling and run metadata
//! - Normalization, indicator, regime and trend stages over the cache trees
//! - Flat JSON run reports under `<reports>/<run-id>/`
//! - A CSV-backed bar source for offline runs

pub mod config;
pub mod csv_source;
pub mod env;
pub mod error;
pub mod ingest;
pub mod report;
pub mod retry;
pub mod stages;

pub use config::{
    ConfigError, IndicatorsConfig, IngestionConfig, PipelineConfig, QualityConfig, RegimeConfig,
    TrendConfig,
};
pub use csv_source::CsvBarSource;
pub use env::StageEnv;
pub use error::{StageError, SymbolError};
pub use ingest::{ingest_daily_bars, IngestionRunResult, SymbolIngestionResult};
pub use retry::{with_retries, Exhausted, RetryPolicy};
pub use stages::{
    apply_market_regime_filter, apply_trend_eligibility_filter, compute_indicators,
    normalize_daily_cache, IndicatorRunResult, NormalizationRunResult, RegimeRunResult,
    TrendRunResult,
};
