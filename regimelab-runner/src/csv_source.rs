//! Offline bar source backed by CSV files.
//!
//! Each (symbol, what-to-show) stream lives in its own file,
//! `<dir>/<SYMBOL>_<WHAT_TO_SHOW>.csv`, with a `date,open,high,low,close,volume`
//! header. Any problem reading a stream surfaces as a broker connection error,
//! so retry and adjusted-close fallback behave exactly as with a live session.

use chrono::NaiveDate;
use regimelab_core::data::{BarSource, BrokerError, HistoricalRequest};
use regimelab_core::domain::{normalize_symbol, Bar};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct CsvBar {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: i64,
}

#[derive(Debug, Clone)]
pub struct CsvBarSource {
    dir: PathBuf,
    connected: bool,
}

impl CsvBarSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            connected: false,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File serving `symbol`'s `what_to_show` stream.
    pub fn stream_path(&self, symbol: &str, what_to_show: &str) -> PathBuf {
        self.dir
            .join(format!("{}_{}.csv", normalize_symbol(symbol), what_to_show.trim().to_uppercase()))
    }
}

impl BarSource for CsvBarSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn connect(&mut self) -> Result<(), BrokerError> {
        if !self.dir.is_dir() {
            return Err(BrokerError::Connection(format!(
                "bar directory {} does not exist",
                self.dir.display()
            )));
        }
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn request_historical_data(&mut self, request: &HistoricalRequest) -> Result<Vec<Bar>, BrokerError> {
        if !self.connected {
            return Err(BrokerError::NotConnected);
        }
        let path = self.stream_path(&request.symbol, &request.what_to_show);
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&path)
            .map_err(|e| BrokerError::Connection(format!("{}: {e}", path.display())))?;

        let symbol = normalize_symbol(&request.symbol);
        let mut bars = Vec::new();
        for record in reader.deserialize::<CsvBar>() {
            let r = record.map_err(|e| BrokerError::Connection(format!("{}: {e}", path.display())))?;
            bars.push(Bar {
                symbol: symbol.clone(),
                date: r.date,
                open: r.open,
                high: r.high,
                low: r.low,
                close: r.close,
                volume: r.volume,
            });
        }
        debug!(path = %path.display(), bars = bars.len(), "read csv bars");
        Ok(bars)
    }
}
