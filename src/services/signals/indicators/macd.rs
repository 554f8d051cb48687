//! Moving Average Convergence Divergence (MACD) indicator.

use crate::config::MacdSettings;
use crate::error::{AnalysisError, Result};
use crate::services::signals::{math, Signal};
use crate::types::{
    Candle, IndicatorFamily, IndicatorKey, IndicatorSignal, IndicatorValue, MacdValue,
    SignalDirection,
};

/// MACD indicator, read trend-following.
///
/// Components:
/// - MACD Line: 12-period EMA - 26-period EMA
/// - Signal Line: 9-period EMA of MACD Line
/// - Histogram: MACD Line - Signal Line
///
/// MACD above signal and above zero is bullish; above signal but below zero
/// is only slightly bullish (mirrored for bearish). Histogram size, normalized
/// against its largest magnitude over the last 20 values, scales strength.
/// A MACD/signal crossover forces strength 1.0.
pub struct Macd {
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
    normalization_window: usize,
}

impl Default for Macd {
    fn default() -> Self {
        Self::from_settings(&MacdSettings::default())
    }
}

/// Aligned MACD, signal and histogram series.
pub struct MacdSeries {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        Self {
            fast_period: fast,
            slow_period: slow,
            signal_period: signal,
            normalization_window: 20,
        }
    }

    pub fn from_settings(settings: &MacdSettings) -> Self {
        Self {
            fast_period: settings.fast,
            slow_period: settings.slow,
            signal_period: settings.signal,
            normalization_window: settings.normalization_window.max(1),
        }
    }

    /// Compute the three MACD series, all ending at the last close.
    pub fn series(&self, closes: &[f64]) -> Option<MacdSeries> {
        let fast = math::ema(closes, self.fast_period);
        let slow = math::ema(closes, self.slow_period);
        if slow.is_empty() || fast.len() < slow.len() {
            return None;
        }

        let offset = fast.len() - slow.len();
        let macd_line: Vec<f64> = slow
            .iter()
            .enumerate()
            .map(|(i, s)| fast[i + offset] - s)
            .collect();

        let signal_line = math::ema(&macd_line, self.signal_period);
        if signal_line.is_empty() {
            return None;
        }
        let macd_line = macd_line[macd_line.len() - signal_line.len()..].to_vec();
        let histogram = macd_line
            .iter()
            .zip(&signal_line)
            .map(|(m, s)| m - s)
            .collect();

        Some(MacdSeries {
            macd: macd_line,
            signal: signal_line,
            histogram,
        })
    }
}

impl Signal for Macd {
    fn key(&self) -> IndicatorKey {
        IndicatorKey::new(
            IndicatorFamily::Macd,
            vec![self.fast_period, self.slow_period, self.signal_period],
        )
    }

    fn name(&self) -> String {
        format!(
            "MACD ({}, {}, {})",
            self.fast_period, self.slow_period, self.signal_period
        )
    }

    fn min_periods(&self) -> usize {
        self.slow_period + self.signal_period
    }

    fn calculate(&self, candles: &[Candle]) -> Result<IndicatorSignal> {
        self.ensure_periods(candles)?;
        if self.fast_period >= self.slow_period {
            return Err(AnalysisError::computation(
                self.key().to_string(),
                "fast period must be shorter than slow period",
            ));
        }

        let closes = math::closes(candles);
        let series = self
            .series(&closes)
            .filter(|s| s.histogram.len() >= 2)
            .ok_or_else(|| {
                AnalysisError::computation(self.key().to_string(), "MACD series too short")
            })?;

        let n = series.histogram.len();
        let macd = series.macd[n - 1];
        let signal = series.signal[n - 1];
        let histogram = series.histogram[n - 1];
        let prev_macd = series.macd[n - 2];
        let prev_signal = series.signal[n - 2];
        let prev_histogram = series.histogram[n - 2];

        let window_start = n.saturating_sub(self.normalization_window);
        let max_hist = math::max_abs(&series.histogram[window_start..]);
        let normalized = if max_hist > 0.0 {
            histogram / max_hist
        } else {
            0.0
        };
        let rising = histogram > prev_histogram;

        let price = closes.last().copied().unwrap_or_default();
        let flat = histogram.abs() <= price.abs().max(1.0) * 1e-9;

        let (mut direction, mut strength) = if flat {
            (SignalDirection::Neutral, 0.0)
        } else if macd > signal {
            if macd > 0.0 {
                let s = if rising {
                    (0.5 + normalized.abs() * 0.5).min(1.0)
                } else {
                    (0.4 + normalized.abs() * 0.4).min(0.8)
                };
                (SignalDirection::Bullish, s)
            } else {
                let s = if rising {
                    (normalized.abs() * 0.5).min(0.5)
                } else {
                    0.2
                };
                (SignalDirection::SlightlyBullish, s)
            }
        } else if macd < 0.0 {
            let s = if !rising {
                (0.5 + normalized.abs() * 0.5).min(1.0)
            } else {
                (0.4 + normalized.abs() * 0.4).min(0.8)
            };
            (SignalDirection::Bearish, s)
        } else {
            let s = if !rising {
                (normalized.abs() * 0.5).min(0.5)
            } else {
                0.2
            };
            (SignalDirection::SlightlyBearish, s)
        };

        let cross_up = prev_macd < prev_signal && macd > signal;
        let cross_down = prev_macd > prev_signal && macd < signal;
        if cross_up && !flat {
            direction = SignalDirection::Bullish;
            strength = 1.0;
        } else if cross_down && !flat {
            direction = SignalDirection::Bearish;
            strength = 1.0;
        }

        Ok(IndicatorSignal::new(
            self.key(),
            IndicatorValue::Macd(MacdValue {
                macd,
                signal,
                histogram,
                normalized_histogram: normalized,
                histogram_rising: rising,
                crossover: (cross_up || cross_down) && !flat,
            }),
            direction,
            strength,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::signals::testing::*;

    fn macd_value(signal: &IndicatorSignal) -> &MacdValue {
        match &signal.value {
            IndicatorValue::Macd(v) => v,
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn test_macd_key() {
        assert_eq!(Macd::default().key().to_string(), "MACD_12_26_9");
    }

    #[test]
    fn test_macd_min_periods() {
        assert_eq!(Macd::default().min_periods(), 35);
    }

    #[test]
    fn test_macd_insufficient_data() {
        let result = Macd::default().calculate(&create_uptrend_candles(34));
        assert!(matches!(result, Err(AnalysisError::InsufficientData { .. })));
    }

    #[test]
    fn test_macd_accelerating_uptrend_positive_histogram() {
        let signal = Macd::default()
            .calculate(&create_geometric_uptrend(120))
            .unwrap();
        let value = macd_value(&signal);
        assert!(value.macd > 0.0);
        assert!(value.histogram > 0.0, "histogram {}", value.histogram);
        assert!(signal.direction.is_bullish());
    }

    #[test]
    fn test_macd_flat_neutral() {
        let signal = Macd::default().calculate(&create_flat_candles(60)).unwrap();
        assert_eq!(signal.direction, SignalDirection::Neutral);
        assert!(macd_value(&signal).histogram.abs() < 1e-9);
    }

    #[test]
    fn test_macd_series_lengths() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let series = Macd::default().series(&closes).unwrap();
        // 60 - 26 + 1 = 35 MACD values, 35 - 9 + 1 = 27 signal values
        assert_eq!(series.signal.len(), 27);
        assert_eq!(series.macd.len(), 27);
        assert_eq!(series.histogram.len(), 27);
    }

    #[test]
    fn test_macd_reversal_turns_bearish() {
        let mut closes: Vec<f64> = (0..60).map(|i| 100.0 * 1.01f64.powi(i)).collect();
        let top = *closes.last().unwrap();
        closes.extend((1..=15).map(|i| top * 0.98f64.powi(i)));
        let signal = Macd::default().calculate(&from_closes(&closes)).unwrap();
        assert!(signal.direction.is_bearish());
    }

    #[test]
    fn test_macd_strength_bounded() {
        let signal = Macd::default()
            .calculate(&create_downtrend_candles(80))
            .unwrap();
        assert!(signal.strength >= 0.0 && signal.strength <= 1.0);
    }
}
