use crate::error::{AnalysisError, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ops::Deref;

/// Timestamps above this are treated as milliseconds.
const MILLIS_CUTOFF: i64 = 100_000_000_000;

/// One OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turnover: Option<f64>,
}

impl Candle {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            turnover: None,
        }
    }

    /// Check the OHLC envelope and that every field is finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(AnalysisError::InvalidSeries(format!(
                    "{} at {} is not a non-negative finite number: {}",
                    name, self.timestamp, value
                )));
            }
        }

        let body_top = self.open.max(self.close);
        let body_bottom = self.open.min(self.close);
        if self.high < body_top || body_bottom < self.low {
            return Err(AnalysisError::InvalidSeries(format!(
                "candle at {} violates high >= max(open, close) >= min(open, close) >= low",
                self.timestamp
            )));
        }
        Ok(())
    }

    /// Parse a raw `[timestamp, open, close, high, low, volume, turnover?]` row.
    ///
    /// Numbers may arrive as JSON numbers or strings. Timestamps may be in
    /// seconds or milliseconds.
    pub fn from_row(row: &[Value]) -> Result<Self> {
        if row.len() < 6 {
            return Err(AnalysisError::InvalidSeries(format!(
                "expected at least 6 fields per row, got {}",
                row.len()
            )));
        }

        let timestamp = parse_timestamp(&row[0])?;
        let candle = Self {
            timestamp,
            open: parse_number(&row[1], "open")?,
            close: parse_number(&row[2], "close")?,
            high: parse_number(&row[3], "high")?,
            low: parse_number(&row[4], "low")?,
            volume: parse_number(&row[5], "volume")?,
            turnover: row
                .get(6)
                .filter(|v| !v.is_null())
                .map(|v| parse_number(v, "turnover"))
                .transpose()?,
        };
        candle.validate()?;
        Ok(candle)
    }

    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn upper_shadow(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    pub fn lower_shadow(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

fn parse_number(value: &Value, field: &str) -> Result<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| AnalysisError::InvalidSeries(format!("malformed {}: {}", field, value)))
}

fn parse_timestamp(value: &Value) -> Result<DateTime<Utc>> {
    let raw = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| AnalysisError::InvalidSeries(format!("malformed timestamp: {}", value)))?;

    let millis = if raw.abs() >= MILLIS_CUTOFF {
        raw
    } else {
        raw.saturating_mul(1000)
    };
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| AnalysisError::InvalidSeries(format!("timestamp out of range: {}", raw)))
}

/// Validated, timestamp-ascending, deduplicated run of candles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Candle>", into = "Vec<Candle>")]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    /// Validate, sort and dedup. The first candle seen for a timestamp wins.
    pub fn new(mut candles: Vec<Candle>) -> Result<Self> {
        for candle in &candles {
            candle.validate()?;
        }
        candles.sort_by_key(|c| c.timestamp);
        candles.dedup_by_key(|c| c.timestamp);
        Ok(Self { candles })
    }

    /// Build a series from raw market-data rows.
    pub fn from_rows(rows: &[Vec<Value>]) -> Result<Self> {
        let candles = rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                Candle::from_row(row).map_err(|e| match e {
                    AnalysisError::InvalidSeries(msg) => {
                        AnalysisError::InvalidSeries(format!("row {}: {}", i, msg))
                    }
                    other => other,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(candles)
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn into_inner(self) -> Vec<Candle> {
        self.candles
    }
}

impl Deref for CandleSeries {
    type Target = [Candle];

    fn deref(&self) -> &Self::Target {
        &self.candles
    }
}

impl TryFrom<Vec<Candle>> for CandleSeries {
    type Error = AnalysisError;

    fn try_from(candles: Vec<Candle>) -> Result<Self> {
        Self::new(candles)
    }
}

impl From<CandleSeries> for Vec<Candle> {
    fn from(series: CandleSeries) -> Self {
        series.candles
    }
}
