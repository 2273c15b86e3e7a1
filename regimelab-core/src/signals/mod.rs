//! Signal rules over feature rows.
//!
//! Signals are advisory booleans derived only from indicator columns that
//! are already cached; nothing here touches the store.

pub mod regime;
pub mod trend;

pub use regime::{apply_regime, regime_state, regime_table};
pub use trend::{apply_trend, trend_state};
