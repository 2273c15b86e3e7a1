//! Cache-to-cache pipeline stages.
//!
//! Each stage reads one cache tree, writes the next and records a flat JSON
//! report under the run directory. Stages share nothing but the filesystem.

pub mod indicators;
pub mod normalize;
pub mod regime;
pub mod trend;

pub use indicators::{compute_indicators, IndicatorRunResult};
pub use normalize::{normalize_daily_cache, NormalizationRunResult};
pub use regime::{apply_market_regime_filter, RegimeRunResult};
pub use trend::{apply_trend_eligibility_filter, TrendRunResult};
