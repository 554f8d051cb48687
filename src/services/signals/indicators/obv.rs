//! On-Balance Volume (OBV) indicator.

use crate::config::ObvSettings;
use crate::error::Result;
use crate::services::signals::{math, Signal};
use crate::types::{
    Candle, IndicatorFamily, IndicatorKey, IndicatorSignal, IndicatorValue, ObvValue,
    SignalDirection, Trend,
};

/// Minimum OBV move, relative to traded volume, that counts as directional.
const OBV_RATIO_THRESHOLD: f64 = 0.01;

/// OBV (On-Balance Volume) indicator.
///
/// Cumulative volume flow:
/// - Close up: add volume
/// - Close down: subtract volume
///
/// OBV crossing its SMA is the strongest read (0.8). Price and OBV moving
/// apart over the lookback is a divergence and reads as a reversal. Price and
/// OBV moving together confirms the move.
pub struct Obv {
    sma_period: usize,
    short_period: usize,
    medium_period: usize,
    lookback: usize,
    divergence_threshold_pct: f64,
}

impl Default for Obv {
    fn default() -> Self {
        Self::from_settings(&ObvSettings::default())
    }
}

impl Obv {
    pub fn from_settings(settings: &ObvSettings) -> Self {
        Self {
            sma_period: settings.sma_period.max(1),
            short_period: settings.short_period.max(1),
            medium_period: settings.medium_period.max(1),
            lookback: settings.lookback.max(2),
            divergence_threshold_pct: settings.divergence_threshold_pct,
        }
    }

    /// Cumulative OBV series starting at zero.
    pub fn series(candles: &[Candle]) -> Vec<f64> {
        let mut obv = Vec::with_capacity(candles.len());
        let mut current = 0.0;
        obv.push(current);
        for pair in candles.windows(2) {
            if pair[1].close > pair[0].close {
                current += pair[1].volume;
            } else if pair[1].close < pair[0].close {
                current -= pair[1].volume;
            }
            obv.push(current);
        }
        obv.truncate(candles.len());
        obv
    }
}

impl Signal for Obv {
    fn key(&self) -> IndicatorKey {
        IndicatorKey::bare(IndicatorFamily::Obv)
    }

    fn name(&self) -> String {
        "On-Balance Volume".to_string()
    }

    fn min_periods(&self) -> usize {
        self.sma_period
            .max(self.medium_period)
            .max(self.lookback)
            + 1
    }

    fn calculate(&self, candles: &[Candle]) -> Result<IndicatorSignal> {
        self.ensure_periods(candles)?;
        let obv = Self::series(candles);
        let obv_sma = math::sma(&obv, self.sma_period);
        let n = obv.len();

        let current = obv[n - 1];
        let previous = obv[n - 2];
        let current_sma = obv_sma[obv_sma.len() - 1];
        let previous_sma = obv_sma[obv_sma.len() - 2];

        let short_trend = Trend::over(&obv, self.short_period);
        let medium_trend = Trend::over(&obv, self.medium_period);

        // Lookback spans `lookback` candles, i.e. `lookback - 1` steps
        let start = n - self.lookback;
        let start_close = candles[start].close;
        let close = candles[n - 1].close;
        let price_change_pct = if start_close != 0.0 {
            (close / start_close - 1.0) * 100.0
        } else {
            0.0
        };
        let traded: f64 = candles[start + 1..].iter().map(|c| c.volume).sum();
        let obv_ratio = if traded > 0.0 {
            (current - obv[start]) / traded
        } else {
            0.0
        };

        let cross_up = math::crossed_above(previous, previous_sma, current, current_sma);
        let cross_down = math::crossed_below(previous, previous_sma, current, current_sma);

        let price_up = price_change_pct > self.divergence_threshold_pct;
        let price_down = price_change_pct < -self.divergence_threshold_pct;
        let obv_up = obv_ratio > OBV_RATIO_THRESHOLD;
        let obv_down = obv_ratio < -OBV_RATIO_THRESHOLD;
        let divergence = (price_up && obv_down) || (price_down && obv_up);

        let price_trend = Trend::between(start_close, close);
        let obv_trend = Trend::between(obv[start], current);

        let (direction, strength) = if cross_up {
            (SignalDirection::Bullish, 0.8)
        } else if cross_down {
            (SignalDirection::Bearish, 0.8)
        } else if divergence {
            let strength = ((obv_ratio - price_change_pct / 100.0).abs() * 5.0).min(1.0);
            (SignalDirection::oriented(obv_up, SignalDirection::Bullish), strength)
        } else if price_trend != Trend::Flat && price_trend == obv_trend {
            let up = price_trend == Trend::Up;
            let aligned = if up {
                current > current_sma && medium_trend == Trend::Up
            } else {
                current < current_sma && medium_trend == Trend::Down
            };
            if aligned {
                (
                    SignalDirection::oriented(up, SignalDirection::Bullish),
                    (0.5 + obv_ratio.abs() * 0.5).min(1.0),
                )
            } else {
                (
                    SignalDirection::oriented(up, SignalDirection::SlightlyBullish),
                    (obv_ratio.abs() * 0.5).min(0.5),
                )
            }
        } else {
            (SignalDirection::Neutral, 0.0)
        };

        Ok(IndicatorSignal::new(
            self.key(),
            IndicatorValue::Obv(ObvValue {
                obv: current,
                obv_sma: current_sma,
                short_trend,
                medium_trend,
                price_change_pct,
                obv_ratio,
                crossover: cross_up || cross_down,
                divergence,
            }),
            direction,
            strength,
        ))
    }
}
