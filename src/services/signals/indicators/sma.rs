//! Simple Moving Average (SMA) indicator.

use crate::error::{AnalysisError, Result};
use crate::services::signals::{math, Signal};
use crate::types::{
    Candle, IndicatorFamily, IndicatorKey, IndicatorSignal, IndicatorValue, MovingAverageValue,
    SignalDirection, Trend,
};

/// SMA (Simple Moving Average) indicator.
///
/// Signal based on price position relative to the average, confirmed by
/// the average's own slope:
/// - Price above a rising SMA = bullish, above a flat/falling one = slightly bullish
/// - Price below a falling SMA = bearish, below a flat/rising one = slightly bearish
/// - Price crossing the SMA on the last candle = full-strength bullish/bearish
pub struct Sma {
    period: usize,
    slope_lookback: usize,
}

impl Default for Sma {
    fn default() -> Self {
        Self::new(20)
    }
}

impl Sma {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            slope_lookback: 4,
        }
    }

    pub fn with_slope_lookback(mut self, lookback: usize) -> Self {
        self.slope_lookback = lookback.max(1);
        self
    }
}

impl Signal for Sma {
    fn key(&self) -> IndicatorKey {
        IndicatorKey::new(IndicatorFamily::Sma, vec![self.period])
    }

    fn name(&self) -> String {
        format!("SMA ({})", self.period)
    }

    fn min_periods(&self) -> usize {
        self.period + self.slope_lookback
    }

    fn calculate(&self, candles: &[Candle]) -> Result<IndicatorSignal> {
        self.ensure_periods(candles)?;
        let closes = math::closes(candles);
        let averages = math::sma(&closes, self.period);
        moving_average_signal(self.key(), &closes, &averages, self.slope_lookback)
    }
}

/// Shared SMA/EMA decision rule over aligned closes and averages.
pub(crate) fn moving_average_signal(
    key: IndicatorKey,
    closes: &[f64],
    averages: &[f64],
    slope_lookback: usize,
) -> Result<IndicatorSignal> {
    if averages.len() < 2 || closes.len() < 2 || averages.len() <= slope_lookback {
        return Err(AnalysisError::computation(
            key.to_string(),
            "moving average series too short",
        ));
    }

    let price = closes[closes.len() - 1];
    let prev_price = closes[closes.len() - 2];
    let average = snap(averages[averages.len() - 1], price);
    let prev_average = snap(averages[averages.len() - 2], prev_price);

    let deviation = if average != 0.0 {
        price / average - 1.0
    } else {
        0.0
    };
    let slope = Trend::over(averages, slope_lookback);
    let cross_up = math::crossed_above(prev_price, prev_average, price, average);
    let cross_down = math::crossed_below(prev_price, prev_average, price, average);
    let deviation_strength = (deviation.abs() * 10.0).min(1.0);

    // Crossovers take priority over deviation
    let (direction, strength) = if cross_up {
        (SignalDirection::Bullish, 1.0)
    } else if cross_down {
        (SignalDirection::Bearish, 1.0)
    } else if price > average {
        if slope == Trend::Up {
            (SignalDirection::Bullish, deviation_strength)
        } else {
            (SignalDirection::SlightlyBullish, deviation_strength)
        }
    } else if price < average {
        if slope == Trend::Down {
            (SignalDirection::Bearish, deviation_strength)
        } else {
            (SignalDirection::SlightlyBearish, deviation_strength)
        }
    } else {
        (SignalDirection::Neutral, 0.0)
    };

    Ok(IndicatorSignal::new(
        key,
        IndicatorValue::MovingAverage(MovingAverageValue {
            average,
            price,
            deviation,
            slope,
            crossover: cross_up || cross_down,
        }),
        direction,
        strength,
    ))
}

/// Treat an average within rounding noise of the price as equal to it.
fn snap(average: f64, price: f64) -> f64 {
    if (average - price).abs() <= price.abs().max(1.0) * 1e-9 {
        price
    } else {
        average
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::signals::testing::*;

    fn value(signal: &IndicatorSignal) -> &MovingAverageValue {
        match &signal.value {
            IndicatorValue::MovingAverage(v) => v,
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn test_sma_key_and_name() {
        let sma = Sma::new(50);
        assert_eq!(sma.key().to_string(), "SMA_50");
        assert_eq!(sma.name(), "SMA (50)");
    }

    #[test]
    fn test_sma_min_periods() {
        assert_eq!(Sma::new(20).min_periods(), 24);
    }

    #[test]
    fn test_sma_insufficient_data() {
        let result = Sma::new(20).calculate(&create_uptrend_candles(23));
        assert!(matches!(
            result,
            Err(AnalysisError::InsufficientData { need: 24, got: 23, .. })
        ));
    }

    #[test]
    fn test_sma_uptrend_bullish() {
        let signal = Sma::new(20).calculate(&create_uptrend_candles(100)).unwrap();
        assert_eq!(signal.direction, SignalDirection::Bullish);
        assert!(signal.strength > 0.0);
        assert_eq!(value(&signal).slope, Trend::Up);
        assert!(!value(&signal).crossover);
    }

    #[test]
    fn test_sma_downtrend_bearish() {
        let signal = Sma::new(20)
            .calculate(&create_downtrend_candles(100))
            .unwrap();
        assert_eq!(signal.direction, SignalDirection::Bearish);
    }

    #[test]
    fn test_sma_flat_neutral() {
        let signal = Sma::new(20).calculate(&create_flat_candles(60)).unwrap();
        assert_eq!(signal.direction, SignalDirection::Neutral);
        assert_eq!(signal.strength, 0.0);
        assert_eq!(value(&signal).deviation, 0.0);
    }

    #[test]
    fn test_sma_crossover_forces_full_strength() {
        // Flat at 100, then a jump above the average on the last candle
        let mut closes = vec![100.0; 30];
        closes.push(100.5);
        let signal = Sma::new(20).calculate(&from_closes(&closes)).unwrap();
        assert_eq!(signal.direction, SignalDirection::Bullish);
        assert_eq!(signal.strength, 1.0);
        assert!(value(&signal).crossover);
    }

    #[test]
    fn test_sma_price_above_flat_average_is_slight() {
        // Average dips then recovers: price above, but average lower than 4 bars ago
        let mut closes = vec![110.0; 24];
        closes.extend([100.0, 100.0, 100.0, 112.0, 112.0]);
        let signal = Sma::new(5).calculate(&from_closes(&closes)).unwrap();
        let v = value(&signal);
        assert!(v.price > v.average);
        assert_ne!(v.slope, Trend::Up);
        assert_eq!(signal.direction, SignalDirection::SlightlyBullish);
    }
}
