//! Candle fixtures for indicator unit tests.

use crate::types::Candle;
use chrono::{TimeZone, Utc};

fn at(i: usize) -> chrono::DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + i as i64 * 60, 0).unwrap()
}

pub fn candle(i: usize, open: f64, high: f64, low: f64, close: f64) -> Candle {
    Candle::new(at(i), open, high, low, close, 1000.0)
}

/// Linear uptrend: each candle 1.5 higher, bullish bodies.
pub fn create_uptrend_candles(count: usize) -> Vec<Candle> {
    (0..count)
        .map(|i| {
            let base = 100.0 + i as f64 * 1.5;
            candle(i, base, base + 2.0, base - 1.0, base + 1.0)
        })
        .collect()
}

/// Linear downtrend mirroring [`create_uptrend_candles`].
pub fn create_downtrend_candles(count: usize) -> Vec<Candle> {
    (0..count)
        .map(|i| {
            let base = 300.0 - i as f64 * 1.5;
            candle(i, base, base + 1.0, base - 2.0, base - 1.0)
        })
        .collect()
}

/// Closes growing 1% per candle.
pub fn create_geometric_uptrend(count: usize) -> Vec<Candle> {
    (0..count)
        .map(|i| {
            let close = 100.0 * 1.01f64.powi(i as i32);
            let open = close / 1.01;
            candle(i, open, close * 1.002, open * 0.998, close)
        })
        .collect()
}

/// open == high == low == close for every candle.
pub fn create_flat_candles(count: usize) -> Vec<Candle> {
    (0..count).map(|i| candle(i, 100.0, 100.0, 100.0, 100.0)).collect()
}

/// Candles built from closes, each opening at the previous close.
pub fn from_closes(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            candle(i, open, open.max(close) + 0.5, open.min(close) - 0.5, close)
        })
        .collect()
}
