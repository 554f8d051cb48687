//! Exponential Moving Average (EMA) indicator.

use super::sma::moving_average_signal;
use crate::error::Result;
use crate::services::signals::{math, Signal};
use crate::types::{Candle, IndicatorFamily, IndicatorKey, IndicatorSignal};

/// EMA (Exponential Moving Average) indicator.
///
/// Like SMA but gives more weight to recent prices. Uses the same
/// slope-confirmed price/average rule, with crossovers taking priority.
pub struct Ema {
    period: usize,
    slope_lookback: usize,
}

impl Default for Ema {
    fn default() -> Self {
        Self::new(9)
    }
}

impl Ema {
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

impl Signal for Ema {
    fn key(&self) -> IndicatorKey {
        IndicatorKey::new(IndicatorFamily::Ema, vec![self.period])
    }

    fn name(&self) -> String {
        format!("EMA ({})", self.period)
    }

    fn min_periods(&self) -> usize {
        self.period + self.slope_lookback
    }

    fn calculate(&self, candles: &[Candle]) -> Result<IndicatorSignal> {
        self.ensure_periods(candles)?;
        let closes = math::closes(candles);
        let averages = math::ema(&closes, self.period);
        moving_average_signal(self.key(), &closes, &averages, self.slope_lookback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use crate::services::signals::testing::*;
    use crate::types::SignalDirection;

    #[test]
    fn test_ema_key() {
        assert_eq!(Ema::new(21).key().to_string(), "EMA_21");
        assert_eq!(Ema::new(21).name(), "EMA (21)");
    }

    #[test]
    fn test_ema_insufficient_data() {
        let ema = Ema::new(9);
        assert_eq!(ema.min_periods(), 13);
        assert!(matches!(
            ema.calculate(&create_uptrend_candles(12)),
            Err(AnalysisError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_ema_uptrend_bullish() {
        let signal = Ema::new(21).calculate(&create_uptrend_candles(100)).unwrap();
        assert_eq!(signal.direction, SignalDirection::Bullish);
        assert!(signal.strength > 0.0 && signal.strength <= 1.0);
    }

    #[test]
    fn test_ema_flat_neutral() {
        let signal = Ema::new(9).calculate(&create_flat_candles(50)).unwrap();
        assert_eq!(signal.direction, SignalDirection::Neutral);
        assert_eq!(signal.strength, 0.0);
    }

    #[test]
    fn test_ema_crossunder_forces_full_strength() {
        let mut closes = vec![100.0; 40];
        closes.push(99.0);
        let signal = Ema::new(9).calculate(&from_closes(&closes)).unwrap();
        assert_eq!(signal.direction, SignalDirection::Bearish);
        assert_eq!(signal.strength, 1.0);
    }
}
