//! Shared fixtures for runner integration tests.

#![allow(dead_code)]

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use regimelab_core::data::{BarSource, BrokerError, HistoricalRequest};
use regimelab_core::domain::{
    AdjustmentMethod, Bar, CleanedRow, FeatureRow, FixedClock, FixedRunIds, IndicatorColumns,
};
use regimelab_runner::{IngestionConfig, StageEnv};
use std::collections::HashMap;
use std::path::Path;

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 27, 21, 0, 0).unwrap()
}

pub fn env(base: &Path) -> StageEnv {
    StageEnv::new(base)
        .with_clock(FixedClock(now()))
        .with_run_ids(FixedRunIds::new(["run-1", "run-2", "run-3", "run-4", "run-5"]))
}

/// Ingestion config that never sleeps.
pub fn fast_ingestion() -> IngestionConfig {
    IngestionConfig {
        throttle_seconds: 0.0,
        retry_delay_seconds: 0.0,
        max_retries: 2,
        ..IngestionConfig::default()
    }
}

pub fn day(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 5).unwrap() + Duration::days(offset)
}

pub fn bar(symbol: &str, offset: i64, close: f64) -> Bar {
    Bar {
        symbol: symbol.into(),
        date: day(offset),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1_000,
    }
}

pub fn bars(symbol: &str, closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, c)| bar(symbol, i as i64, *c))
        .collect()
}

/// What the mock answers for one (symbol, what_to_show) stream.
#[derive(Debug, Clone)]
pub enum Stream {
    Bars(Vec<Bar>),
    /// Fail this many times, then serve the bars.
    FlakyThen(u32, Vec<Bar>),
    AlwaysFail,
}

/// In-memory bar source recording every request.
#[derive(Debug, Default)]
pub struct MockBarSource {
    streams: HashMap<(String, String), Stream>,
    failures_seen: HashMap<(String, String), u32>,
    pub requests: Vec<(String, String)>,
    pub connected: bool,
    pub connects: u32,
    pub disconnects: u32,
}

impl MockBarSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, symbol: &str, what_to_show: &str, stream: Stream) -> Self {
        self.streams
            .insert((symbol.to_string(), what_to_show.to_string()), stream);
        self
    }

    pub fn requests_for(&self, symbol: &str, what_to_show: &str) -> usize {
        self.requests
            .iter()
            .filter(|(s, w)| s == symbol && w == what_to_show)
            .count()
    }
}

impl BarSource for MockBarSource {
    fn name(&self) -> &str {
        "mock"
    }

    fn connect(&mut self) -> Result<(), BrokerError> {
        self.connects += 1;
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.disconnects += 1;
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn request_historical_data(&mut self, request: &HistoricalRequest) -> Result<Vec<Bar>, BrokerError> {
        let key = (request.symbol.clone(), request.what_to_show.clone());
        self.requests.push(key.clone());
        if !self.connected {
            return Err(BrokerError::NotConnected);
        }
        match self.streams.get(&key) {
            None => Ok(Vec::new()),
            Some(Stream::Bars(bars)) => Ok(bars.clone()),
            Some(Stream::AlwaysFail) => Err(BrokerError::Connection("simulated timeout".into())),
            Some(Stream::FlakyThen(n, bars)) => {
                let seen = self.failures_seen.entry(key).or_insert(0);
                if *seen < *n {
                    *seen += 1;
                    Err(BrokerError::Connection("simulated reset".into()))
                } else {
                    Ok(bars.clone())
                }
            }
        }
    }
}

pub fn cleaned(symbol: &str, date: NaiveDate, price: f64, pulled_at: DateTime<Utc>) -> CleanedRow {
    CleanedRow {
        symbol: symbol.to_string(),
        date,
        open: Some(price),
        high: Some(price + 1.0),
        low: Some(price - 1.0),
        close: Some(price),
        adj_close: Some(price),
        volume: Some(1_000),
        adjustment_factor: Some(1.0),
        adjustment_method: Some(AdjustmentMethod::None),
        source: Some("mock".into()),
        exchange: Some("SMART".into()),
        currency: Some("USD".into()),
        what_to_show: Some("TRADES".into()),
        pulled_at_utc: Some(pulled_at),
        daily_return: None,
        is_outlier_jump: false,
        is_missing_bar: false,
    }
}

/// Feature row with only the columns the signal rules look at.
pub fn feature(
    symbol: &str,
    date: NaiveDate,
    adj_close: Option<f64>,
    sma200: Option<f64>,
    sma50: Option<f64>,
) -> FeatureRow {
    let mut base = cleaned(symbol, date, adj_close.unwrap_or(1.0), now());
    base.adj_close = adj_close;
    FeatureRow {
        base,
        indicators: IndicatorColumns {
            sma200,
            sma50,
            ..IndicatorColumns::default()
        },
        indicator_ready: false,
    }
}
