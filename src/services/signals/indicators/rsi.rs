//! Relative Strength Index (RSI) indicator.

use crate::config::RsiSettings;
use crate::error::{AnalysisError, Result};
use crate::services::signals::{math, Signal};
use crate::types::{
    Candle, IndicatorFamily, IndicatorKey, IndicatorSignal, IndicatorValue, RsiValue,
    SignalDirection, Trend,
};

/// RSI (Relative Strength Index) indicator, read trend-following.
///
/// - At or above overbought (70): bullish, at or below oversold (30): bearish
/// - Between 50 and the thresholds: slightly bullish/bearish
/// - Strength grows with distance from 50
/// - A 50-line cross forces strength 0.7 in the crossing direction
/// - RSI and price trending opposite ways over 5 periods: slight reversal, 0.4
pub struct Rsi {
    period: usize,
    overbought: f64,
    oversold: f64,
    trend_lookback: usize,
    neutral_band: f64,
}

impl Default for Rsi {
    fn default() -> Self {
        Self::from_settings(&RsiSettings::default())
    }
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            ..Self::default()
        }
    }

    pub fn from_settings(settings: &RsiSettings) -> Self {
        Self {
            period: settings.window,
            overbought: settings.overbought,
            oversold: settings.oversold,
            trend_lookback: settings.trend_lookback.max(2),
            neutral_band: settings.neutral_band,
        }
    }
}

impl Signal for Rsi {
    fn key(&self) -> IndicatorKey {
        IndicatorKey::new(IndicatorFamily::Rsi, vec![self.period])
    }

    fn name(&self) -> String {
        format!("RSI ({})", self.period)
    }

    fn min_periods(&self) -> usize {
        self.period + self.trend_lookback
    }

    fn calculate(&self, candles: &[Candle]) -> Result<IndicatorSignal> {
        self.ensure_periods(candles)?;
        let closes = math::closes(candles);
        let series = math::rsi(&closes, self.period);
        if series.len() < self.trend_lookback {
            return Err(AnalysisError::computation(
                self.key().to_string(),
                "RSI series shorter than trend lookback",
            ));
        }

        let rsi = series[series.len() - 1];
        let previous = series[series.len() - 2];
        // "Over N periods" compares against the value N-1 steps back
        let rsi_trend = Trend::over(&series, self.trend_lookback - 1);
        let price_trend = Trend::over(&closes, self.trend_lookback - 1);

        let cross_up = previous <= 50.0 && rsi > 50.0;
        let cross_down = previous >= 50.0 && rsi < 50.0;
        let divergence = rsi_trend.opposes(price_trend);

        let distance = rsi - 50.0;
        let upper_span = (self.overbought - 50.0).max(f64::EPSILON);
        let lower_span = (50.0 - self.oversold).max(f64::EPSILON);

        let (direction, strength) = if cross_up {
            (SignalDirection::Bullish, 0.7)
        } else if cross_down {
            (SignalDirection::Bearish, 0.7)
        } else if divergence {
            (
                SignalDirection::oriented(rsi_trend == Trend::Up, SignalDirection::SlightlyBullish),
                0.4,
            )
        } else if distance.abs() < self.neutral_band {
            (SignalDirection::Neutral, 0.0)
        } else if rsi >= self.overbought {
            (SignalDirection::Bullish, (distance / upper_span).min(1.0))
        } else if rsi > 50.0 {
            (SignalDirection::SlightlyBullish, (distance / upper_span).min(1.0))
        } else if rsi <= self.oversold {
            (SignalDirection::Bearish, (-distance / lower_span).min(1.0))
        } else {
            (SignalDirection::SlightlyBearish, (-distance / lower_span).min(1.0))
        };

        Ok(IndicatorSignal::new(
            self.key(),
            IndicatorValue::Rsi(RsiValue {
                rsi,
                previous,
                rsi_trend,
                price_trend,
                overbought: self.overbought,
                oversold: self.oversold,
                centerline_cross: cross_up || cross_down,
                divergence,
            }),
            direction,
            strength,
        ))
    }
}
