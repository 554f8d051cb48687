//! Candle builders shared by the integration tests.

#![allow(dead_code)]

use augur::types::{Candle, CandleSeries};
use chrono::{TimeZone, Utc};

pub const START: i64 = 1_700_000_000;

pub fn candle(i: usize, open: f64, high: f64, low: f64, close: f64) -> Candle {
    let timestamp = Utc
        .timestamp_opt(START + 3600 * i as i64, 0)
        .single()
        .unwrap();
    Candle::new(timestamp, open, high, low, close, 1000.0)
}

/// Steady linear rise from 100.
pub fn uptrend(count: usize) -> Vec<Candle> {
    (0..count)
        .map(|i| {
            let base = 100.0 + 1.5 * i as f64;
            candle(i, base, base + 2.0, base - 1.0, base + 1.0)
        })
        .collect()
}

/// Steady linear fall from 300.
pub fn downtrend(count: usize) -> Vec<Candle> {
    (0..count)
        .map(|i| {
            let base = 300.0 - 1.5 * i as f64;
            candle(i, base, base + 1.0, base - 2.0, base - 1.0)
        })
        .collect()
}

pub fn flat(count: usize) -> Vec<Candle> {
    (0..count)
        .map(|i| candle(i, 100.0, 100.0, 100.0, 100.0))
        .collect()
}

/// Each candle opens at the previous close.
pub fn from_closes(closes: &[f64]) -> Vec<Candle> {
    let mut previous = closes.first().copied().unwrap_or(100.0);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = previous;
            previous = close;
            candle(i, open, open.max(close) + 0.5, open.min(close) - 0.5, close)
        })
        .collect()
}

pub fn series(candles: Vec<Candle>) -> CandleSeries {
    CandleSeries::new(candles).unwrap()
}

/// Compounding rise of 1% per candle from 100.
pub fn geometric(count: usize) -> Vec<Candle> {
    let closes: Vec<f64> = (0..count).map(|i| 100.0 * 1.01f64.powi(i as i32)).collect();
    from_closes(&closes)
}

/// Every price zero.
pub fn zero(count: usize) -> Vec<Candle> {
    (0..count).map(|i| candle(i, 0.0, 0.0, 0.0, 0.0)).collect()
}
