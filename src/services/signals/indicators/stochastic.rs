//! Stochastic Oscillator indicator.

use crate::config::StochasticSettings;
use crate::error::{AnalysisError, Result};
use crate::services::signals::{math, Signal};
use crate::types::{
    Candle, IndicatorFamily, IndicatorKey, IndicatorSignal, IndicatorValue, SignalDirection,
    StochasticValue, Trend,
};

/// Periods back used for %K/%D trend.
const OSCILLATOR_TREND_LOOKBACK: usize = 4;

/// Stochastic Oscillator, read in the context of the broader price trend.
///
/// Uptrend: readings above 50 confirm continuation, strongest when %K and %D
/// are both overbought and still rising; a %K/%D cross up in the upper range
/// is a continuation signal. Downtrend mirrors this. Without a clear trend
/// only crosses away from 50 and extreme rising/falling readings count.
pub struct Stochastic {
    k_period: usize,
    d_period: usize,
    smooth: usize,
    overbought: f64,
    oversold: f64,
    trend_lookback: usize,
}

impl Default for Stochastic {
    fn default() -> Self {
        Self::from_settings(&StochasticSettings::default())
    }
}

impl Stochastic {
    pub fn from_settings(settings: &StochasticSettings) -> Self {
        Self {
            k_period: settings.k.max(1),
            d_period: settings.d.max(1),
            smooth: settings.smooth.max(1),
            overbought: settings.overbought,
            oversold: settings.oversold,
            trend_lookback: settings.trend_lookback.max(2),
        }
    }

    /// Smoothed %K and %D, aligned to the last candle.
    pub fn k_and_d(&self, candles: &[Candle]) -> (Vec<f64>, Vec<f64>) {
        if candles.len() < self.k_period {
            return (Vec::new(), Vec::new());
        }
        let raw: Vec<f64> = candles
            .windows(self.k_period)
            .map(|window| {
                let highest = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
                let lowest = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);
                let close = window[window.len() - 1].close;
                let range = highest - lowest;
                if range > 0.0 {
                    (close - lowest) / range * 100.0
                } else {
                    50.0
                }
            })
            .collect();

        let k = math::sma(&raw, self.smooth);
        let d = math::sma(&k, self.d_period);
        let k = if d.is_empty() {
            Vec::new()
        } else {
            k[k.len() - d.len()..].to_vec()
        };
        (k, d)
    }
}

impl Signal for Stochastic {
    fn key(&self) -> IndicatorKey {
        IndicatorKey::new(
            IndicatorFamily::Stochastic,
            vec![self.k_period, self.d_period, self.smooth],
        )
    }

    fn name(&self) -> String {
        format!(
            "Stochastic ({}, {}, {})",
            self.k_period, self.d_period, self.smooth
        )
    }

    fn min_periods(&self) -> usize {
        (self.k_period + self.smooth + self.d_period + 2).max(self.trend_lookback)
    }

    fn calculate(&self, candles: &[Candle]) -> Result<IndicatorSignal> {
        self.ensure_periods(candles)?;
        let (k_series, d_series) = self.k_and_d(candles);
        if d_series.len() <= OSCILLATOR_TREND_LOOKBACK {
            return Err(AnalysisError::computation(
                self.key().to_string(),
                "oscillator series too short",
            ));
        }

        let n = d_series.len();
        let (k, d) = (k_series[n - 1], d_series[n - 1]);
        let (prev_k, prev_d) = (k_series[n - 2], d_series[n - 2]);
        let k_trend = Trend::over(&k_series, OSCILLATOR_TREND_LOOKBACK);
        let d_trend = Trend::over(&d_series, OSCILLATOR_TREND_LOOKBACK);
        let closes = math::closes(candles);
        let price_trend = Trend::over(&closes, self.trend_lookback - 1);

        let crossover = k > d && prev_k <= prev_d;
        let crossunder = k < d && prev_k >= prev_d;

        let (direction, strength) = match price_trend {
            Trend::Up => {
                if k > 50.0 && d > 50.0 {
                    if k > self.overbought && d > self.overbought {
                        if k_trend == Trend::Up && d_trend == Trend::Up {
                            let headroom = (100.0 - self.overbought).max(f64::EPSILON);
                            (
                                SignalDirection::Bullish,
                                (0.7 + (k - self.overbought) / headroom * 0.3).min(1.0),
                            )
                        } else {
                            (SignalDirection::SlightlyBullish, 0.5)
                        }
                    } else if crossover {
                        (SignalDirection::Bullish, 0.8)
                    } else {
                        (SignalDirection::Bullish, 0.6)
                    }
                } else if k < 50.0 && crossover {
                    (SignalDirection::SlightlyBullish, 0.4)
                } else {
                    (SignalDirection::Neutral, 0.0)
                }
            }
            Trend::Down => {
                if k < 50.0 && d < 50.0 {
                    if k < self.oversold && d < self.oversold {
                        if k_trend == Trend::Down && d_trend == Trend::Down {
                            let floor = self.oversold.max(f64::EPSILON);
                            (
                                SignalDirection::Bearish,
                                (0.7 + (self.oversold - k) / floor * 0.3).min(1.0),
                            )
                        } else {
                            (SignalDirection::SlightlyBearish, 0.5)
                        }
                    } else if crossunder {
                        (SignalDirection::Bearish, 0.8)
                    } else {
                        (SignalDirection::Bearish, 0.6)
                    }
                } else if k > 50.0 && crossunder {
                    (SignalDirection::SlightlyBearish, 0.4)
                } else {
                    (SignalDirection::Neutral, 0.0)
                }
            }
            Trend::Flat => {
                if k > 50.0 && d > 50.0 && crossover {
                    (SignalDirection::Bullish, 0.6)
                } else if k < 50.0 && d < 50.0 && crossunder {
                    (SignalDirection::Bearish, 0.6)
                } else if k > self.overbought && k_trend == Trend::Up {
                    (SignalDirection::SlightlyBullish, 0.3)
                } else if k < self.oversold && k_trend == Trend::Down {
                    (SignalDirection::SlightlyBearish, 0.3)
                } else {
                    (SignalDirection::Neutral, 0.0)
                }
            }
        };

        Ok(IndicatorSignal::new(
            self.key(),
            IndicatorValue::Stochastic(StochasticValue {
                k,
                d,
                price_trend,
                k_trend,
                d_trend,
                crossover,
                crossunder,
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

    fn stoch_value(signal: &IndicatorSignal) -> &StochasticValue {
        match &signal.value {
            IndicatorValue::Stochastic(v) => v,
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn test_stochastic_key_and_min_periods() {
        let stoch = Stochastic::default();
        assert_eq!(stoch.key().to_string(), "STOCH_14_3_3");
        assert_eq!(stoch.min_periods(), 22);
    }

    #[test]
    fn test_stochastic_insufficient_data() {
        let result = Stochastic::default().calculate(&create_uptrend_candles(21));
        assert!(matches!(result, Err(AnalysisError::InsufficientData { .. })));
    }

    #[test]
    fn test_stochastic_range() {
        let (k, d) = Stochastic::default().k_and_d(&create_uptrend_candles(60));
        assert_eq!(k.len(), d.len());
        assert!(k.iter().chain(d.iter()).all(|v| (0.0..=100.0).contains(v)));
    }

    #[test]
    fn test_stochastic_uptrend_confirms() {
        let signal = Stochastic::default()
            .calculate(&create_uptrend_candles(60))
            .unwrap();
        let value = stoch_value(&signal);
        assert_eq!(value.price_trend, Trend::Up);
        assert!(value.k > 50.0);
        assert!(signal.direction.is_bullish());
    }

    #[test]
    fn test_stochastic_downtrend_confirms() {
        let signal = Stochastic::default()
            .calculate(&create_downtrend_candles(60))
            .unwrap();
        assert_eq!(stoch_value(&signal).price_trend, Trend::Down);
        assert!(signal.direction.is_bearish());
    }

    #[test]
    fn test_stochastic_flat_neutral() {
        let signal = Stochastic::default()
            .calculate(&create_flat_candles(40))
            .unwrap();
        let value = stoch_value(&signal);
        assert_eq!(value.k, 50.0);
        assert_eq!(value.price_trend, Trend::Flat);
        assert_eq!(signal.direction, SignalDirection::Neutral);
    }
}
