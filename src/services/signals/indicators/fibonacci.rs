//! Fibonacci retracement indicator.

use crate::config::FibonacciSettings;
use crate::error::Result;
use crate::services::signals::{math, Signal};
use crate::types::{
    finite, Candle, FibonacciLevel, FibonacciValue, IndicatorFamily, IndicatorKey,
    IndicatorSignal, IndicatorValue, SignalDirection, Trend,
};

/// Retracement ratios followed by extensions.
pub const FIBONACCI_RATIOS: [f64; 12] = [
    0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0, 1.272, 1.618, 2.0, 2.618, 4.236,
];

/// Fibonacci retracement over the swing range preceding the current candle.
///
/// `period` counts the current candle. The swing high/low come from the
/// `period - 1` candles before it, so a close beyond them is a breakout (0.8). Otherwise, in an uptrend with
/// price rising over the last 20 candles, a close just above a shallow
/// retracement level (ratio 0.5 or less) is a bullish support bounce; deeper
/// levels only read slightly bullish. Downtrends mirror this at resistance.
/// A recent move against the swing trend through the 0.5 level reads as a
/// weak reversal (0.4).
pub struct FibonacciRetracement {
    period: usize,
    proximity: f64,
    recent_trend_lookback: usize,
}

impl Default for FibonacciRetracement {
    fn default() -> Self {
        Self::from_settings(&FibonacciSettings::default())
    }
}

impl FibonacciRetracement {
    pub fn from_settings(settings: &FibonacciSettings) -> Self {
        Self {
            period: settings.period.max(2),
            proximity: settings.proximity,
            recent_trend_lookback: settings.recent_trend_lookback.max(2),
        }
    }

    /// Level prices for a swing, in ratio order.
    pub fn levels(high: f64, low: f64) -> Vec<FibonacciLevel> {
        let diff = high - low;
        FIBONACCI_RATIOS
            .iter()
            .map(|&ratio| FibonacciLevel {
                ratio,
                price: if diff > 0.0 { high - diff * ratio } else { high },
            })
            .collect()
    }
}

impl Signal for FibonacciRetracement {
    fn key(&self) -> IndicatorKey {
        IndicatorKey::new(IndicatorFamily::Fibonacci, vec![self.period])
    }

    fn name(&self) -> String {
        format!("Fibonacci Retracement ({})", self.period)
    }

    fn min_periods(&self) -> usize {
        self.period.max(self.recent_trend_lookback)
    }

    fn calculate(&self, candles: &[Candle]) -> Result<IndicatorSignal> {
        self.ensure_periods(candles)?;
        let n = candles.len();
        let window = &candles[n - self.period..n - 1];

        let (mut high, mut high_idx) = (f64::MIN, 0);
        let (mut low, mut low_idx) = (f64::MAX, 0);
        for (i, c) in window.iter().enumerate() {
            if c.high > high {
                high = c.high;
                high_idx = i;
            }
            if c.low < low {
                low = c.low;
                low_idx = i;
            }
        }
        let trend = if high_idx > low_idx {
            Trend::Up
        } else if high_idx < low_idx {
            Trend::Down
        } else {
            Trend::Flat
        };

        let closes = math::closes(candles);
        let price = closes[n - 1];
        let price_direction = Trend::between(closes[n - 2], price);
        let recent_trend = Trend::over(&closes, self.recent_trend_lookback - 1);

        let levels = Self::levels(high, low);
        let mut sorted = levels.clone();
        sorted.sort_by(|a, b| a.price.total_cmp(&b.price));

        let below = sorted.iter().rev().find(|l| l.price <= price).cloned();
        let above = sorted.iter().find(|l| l.price > price).cloned();

        let distance = |level: &FibonacciLevel| {
            if price != 0.0 {
                (price - level.price).abs() / price
            } else {
                0.0
            }
        };
        let (nearest, nearest_is_below) = match (&below, &above) {
            (Some(b), Some(a)) if distance(b) < distance(a) => (b.clone(), true),
            (_, Some(a)) if below.is_some() => (a.clone(), false),
            (Some(b), None) => (b.clone(), true),
            (None, Some(a)) => (a.clone(), false),
            _ => (
                FibonacciLevel {
                    ratio: 0.0,
                    price: high,
                },
                true,
            ),
        };
        let nearest_distance = distance(&nearest);
        let near_level = nearest_distance < self.proximity;

        let potential_profit_pct = above
            .as_ref()
            .map(|a| (a.price - price) / price * 100.0)
            .unwrap_or(0.0);
        let potential_loss_pct = below
            .as_ref()
            .map(|b| (price - b.price) / price * 100.0)
            .unwrap_or(0.0);
        let risk_reward = if potential_loss_pct > 0.0 && above.is_some() {
            potential_profit_pct / potential_loss_pct
        } else {
            0.0
        };

        let diff = high - low;
        let midpoint = high - diff * 0.5;
        let breakout_up = trend == Trend::Up && price > high;
        let breakout_down = trend == Trend::Down && price < low;
        let momentum = |with_move: bool| if with_move { 1.0 } else { 0.5 };

        let (direction, strength) = if diff <= 0.0 {
            (SignalDirection::Neutral, 0.0)
        } else if breakout_up {
            (SignalDirection::Bullish, 0.8)
        } else if breakout_down {
            (SignalDirection::Bearish, 0.8)
        } else if trend == Trend::Up && recent_trend == Trend::Up {
            if nearest_is_below && near_level {
                let boost = momentum(price_direction == Trend::Up);
                if nearest.ratio <= 0.5 {
                    (
                        SignalDirection::Bullish,
                        0.5 + 0.5 * (1.0 - nearest.ratio) * boost,
                    )
                } else {
                    (SignalDirection::SlightlyBullish, 0.3 * boost)
                }
            } else {
                (SignalDirection::Neutral, 0.0)
            }
        } else if trend == Trend::Down && recent_trend == Trend::Down {
            if !nearest_is_below && near_level {
                let boost = momentum(price_direction == Trend::Down);
                if nearest.ratio >= 0.5 {
                    (
                        SignalDirection::Bearish,
                        0.5 + 0.5 * nearest.ratio.min(1.0) * boost,
                    )
                } else {
                    (SignalDirection::SlightlyBearish, 0.3 * boost)
                }
            } else {
                (SignalDirection::Neutral, 0.0)
            }
        } else if trend == Trend::Down && recent_trend == Trend::Up && price > midpoint {
            (SignalDirection::Bullish, 0.4)
        } else if trend == Trend::Up && recent_trend == Trend::Down && price < midpoint {
            (SignalDirection::Bearish, 0.4)
        } else {
            (SignalDirection::Neutral, 0.0)
        };

        Ok(IndicatorSignal::new(
            self.key(),
            IndicatorValue::Fibonacci(FibonacciValue {
                swing_high: high,
                swing_low: low,
                trend,
                recent_trend,
                levels,
                nearest_level: nearest.ratio,
                nearest_price: nearest.price,
                distance_pct: finite(nearest_distance * 100.0),
                next_level_above: above,
                next_level_below: below,
                potential_profit_pct: finite(potential_profit_pct),
                potential_loss_pct: finite(potential_loss_pct),
                risk_reward: finite(risk_reward),
                breakout: breakout_up || breakout_down,
            }),
            direction,
            strength,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use crate::services::signals::testing::*;

    fn fib_value(signal: &IndicatorSignal) -> &FibonacciValue {
        match &signal.value {
            IndicatorValue::Fibonacci(v) => v,
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn test_fibonacci_levels() {
        let levels = FibonacciRetracement::levels(200.0, 100.0);
        assert_eq!(levels.len(), 12);
        assert_eq!(levels[0].price, 200.0);
        assert!((levels[3].price - 150.0).abs() < 1e-9);
        assert!((levels[6].price - 100.0).abs() < 1e-9);
        // Extensions continue past the swing low
        assert!(levels[8].price < 100.0);
    }

    #[test]
    fn test_fibonacci_insufficient_data() {
        let fib = FibonacciRetracement::default();
        assert_eq!(fib.min_periods(), 100);
        assert!(matches!(
            fib.calculate(&create_uptrend_candles(99)),
            Err(AnalysisError::InsufficientData { need: 100, got: 99, .. })
        ));
        assert!(fib.calculate(&create_uptrend_candles(100)).is_ok());
    }

    #[test]
    fn test_fibonacci_uptrend_breakout() {
        let signal = FibonacciRetracement::default()
            .calculate(&create_uptrend_candles(150))
            .unwrap();
        let value = fib_value(&signal);
        assert_eq!(value.trend, Trend::Up);
        assert!(value.breakout);
        assert_eq!(signal.direction, SignalDirection::Bullish);
        assert_eq!(signal.strength, 0.8);
    }

    #[test]
    fn test_fibonacci_downtrend_breakout() {
        let signal = FibonacciRetracement::default()
            .calculate(&create_downtrend_candles(150))
            .unwrap();
        assert_eq!(fib_value(&signal).trend, Trend::Down);
        assert_eq!(signal.direction, SignalDirection::Bearish);
    }

    #[test]
    fn test_fibonacci_flat_neutral() {
        let signal = FibonacciRetracement::default()
            .calculate(&create_flat_candles(120))
            .unwrap();
        assert_eq!(signal.direction, SignalDirection::Neutral);
        assert_eq!(fib_value(&signal).risk_reward, 0.0);
    }

    #[test]
    fn test_fibonacci_support_bounce() {
        let mut closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64 * (100.0 / 59.0)).collect();
        closes.extend((0..20).map(|j| 200.0 - (j + 1) as f64 * 2.5));
        closes.extend((0..21).map(|j| 150.5 + j as f64 * 0.6));
        assert_eq!(closes.len(), 101);

        let signal = FibonacciRetracement::default()
            .calculate(&from_closes(&closes))
            .unwrap();
        let value = fib_value(&signal);
        assert_eq!(value.trend, Trend::Up);
        assert_eq!(value.recent_trend, Trend::Up);
        assert_eq!(value.nearest_level, 0.382);
        assert!(value.potential_profit_pct > 0.0);
        assert!(value.risk_reward > 0.0);
        assert_eq!(signal.direction, SignalDirection::Bullish);
        assert!((signal.strength - (0.5 + 0.5 * (1.0 - 0.382))).abs() < 1e-9);
    }
}
