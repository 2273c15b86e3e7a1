//! Serializable pipeline configuration.
//!
//! One TOML file carries a section per stage. Every section has defaults, so
//! an empty file (or no file) runs the whole pipeline against the standard
//! cache layout under the base directory.

use regimelab_core::data::{WriteMode, DEFAULT_OUTLIER_THRESHOLD};
use regimelab_core::indicators::IndicatorConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::retry::RetryPolicy;

pub const RAW_CACHE_DIR: &str = "data/cache/ibkr/raw/daily";
pub const NORMALIZED_CACHE_DIR: &str = "data/cache/ibkr/normalized/daily";
pub const CLEANED_CACHE_DIR: &str = "data/cache/ibkr/cleaned/daily";
pub const FEATURE_CACHE_DIR: &str = "data/cache/features/daily";
pub const REGIME_SIGNAL_DIR: &str = "data/cache/signals/regime/daily";
pub const TREND_SIGNAL_DIR: &str = "data/cache/signals/trend/daily";
pub const REPORTS_DIR: &str = "outputs/runs";

/// Errors loading or validating a pipeline config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Full pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Symbols used when none are given on the command line.
    pub symbols: Vec<String>,
    pub ingestion: IngestionConfig,
    pub quality: QualityConfig,
    pub indicators: IndicatorsConfig,
    pub regime: RegimeConfig,
    pub trend: TrendConfig,
}

impl PipelineConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ing = &self.ingestion;
        if ing.max_retries == 0 {
            return Err(ConfigError::Invalid("ingestion.max_retries must be at least 1".into()));
        }
        for (name, value) in [
            ("ingestion.throttle_seconds", ing.throttle_seconds),
            ("ingestion.retry_delay_seconds", ing.retry_delay_seconds),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }

        let threshold = self.quality.outlier_return_threshold;
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "quality.outlier_return_threshold must be positive, got {threshold}"
            )));
        }

        let p = &self.indicators.periods;
        for (name, period) in [
            ("sma200_period", p.sma200_period),
            ("sma50_period", p.sma50_period),
            ("ema20_period", p.ema20_period),
            ("rsi14_period", p.rsi14_period),
            ("atr14_period", p.atr14_period),
            ("rolling_high_period", p.rolling_high_period),
            ("volume_sma50_period", p.volume_sma50_period),
        ] {
            if period == 0 {
                return Err(ConfigError::Invalid(format!(
                    "indicators.{name} must be at least 1"
                )));
            }
        }

        if self.regime.benchmark_symbol.trim().is_empty() {
            return Err(ConfigError::Invalid("regime.benchmark_symbol must not be blank".into()));
        }
        Ok(())
    }
}

/// Broker request parameters and ingestion policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Empty string means "now".
    pub end_datetime: String,
    pub duration: String,
    pub bar_size: String,
    pub use_rth: bool,
    pub format_date: u8,
    pub exchange: String,
    pub currency: String,
    pub what_to_show_raw: String,
    pub what_to_show_adjusted: String,
    /// Pause between symbols.
    pub throttle_seconds: f64,
    /// Attempts per request, including the first.
    pub max_retries: u32,
    pub retry_delay_seconds: f64,
    /// Connect the source if it is not already connected, and disconnect at
    /// the end of the run only in that case.
    pub auto_connect: bool,
    pub raw_cache_dir: String,
    pub normalized_cache_dir: String,
    pub run_metadata_dir: String,
}

impl IngestionConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries,
            delay: seconds(self.retry_delay_seconds),
        }
    }

    pub fn throttle(&self) -> Duration {
        seconds(self.throttle_seconds)
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            end_datetime: String::new(),
            duration: "5 Y".into(),
            bar_size: "1 day".into(),
            use_rth: true,
            format_date: 1,
            exchange: "SMART".into(),
            currency: "USD".into(),
            what_to_show_raw: "TRADES".into(),
            what_to_show_adjusted: "ADJUSTED_LAST".into(),
            throttle_seconds: 0.2,
            max_retries: 3,
            retry_delay_seconds: 1.0,
            auto_connect: true,
            raw_cache_dir: RAW_CACHE_DIR.into(),
            normalized_cache_dir: NORMALIZED_CACHE_DIR.into(),
            run_metadata_dir: REPORTS_DIR.into(),
        }
    }
}

/// Normalization stage: normalized cache → cleaned cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub source_dir: String,
    pub cleaned_dir: String,
    pub report_dir: String,
    pub outlier_return_threshold: f64,
    pub write_mode: WriteMode,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            source_dir: NORMALIZED_CACHE_DIR.into(),
            cleaned_dir: CLEANED_CACHE_DIR.into(),
            report_dir: REPORTS_DIR.into(),
            outlier_return_threshold: DEFAULT_OUTLIER_THRESHOLD,
            write_mode: WriteMode::UpsertLatest,
        }
    }
}

/// Indicator stage: cleaned cache → feature cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorsConfig {
    pub source_dir: String,
    pub output_dir: String,
    pub report_dir: String,
    pub write_mode: WriteMode,
    /// Periods sit directly in the `[indicators]` table.
    #[serde(flatten)]
    pub periods: IndicatorConfig,
}

impl Default for IndicatorsConfig {
    fn default() -> Self {
        Self {
            source_dir: CLEANED_CACHE_DIR.into(),
            output_dir: FEATURE_CACHE_DIR.into(),
            report_dir: REPORTS_DIR.into(),
            write_mode: WriteMode::UpsertLatest,
            periods: IndicatorConfig::default(),
        }
    }
}

/// Regime stage: feature cache → regime signal cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeConfig {
    pub source_dir: String,
    pub output_dir: String,
    pub report_dir: String,
    pub benchmark_symbol: String,
    pub write_mode: WriteMode,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            source_dir: FEATURE_CACHE_DIR.into(),
            output_dir: REGIME_SIGNAL_DIR.into(),
            report_dir: REPORTS_DIR.into(),
            benchmark_symbol: "SPY".into(),
            write_mode: WriteMode::UpsertLatest,
        }
    }
}

/// Trend stage: regime signal cache (or features) → trend signal cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    pub source_dir: String,
    /// Read when `source_dir` holds no rows for the requested symbols.
    pub fallback_source_dir: String,
    pub output_dir: String,
    pub report_dir: String,
    pub write_mode: WriteMode,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            source_dir: REGIME_SIGNAL_DIR.into(),
            fallback_source_dir: FEATURE_CACHE_DIR.into(),
            output_dir: TREND_SIGNAL_DIR.into(),
            report_dir: REPORTS_DIR.into(),
            write_mode: WriteMode::UpsertLatest,
        }
    }
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}
