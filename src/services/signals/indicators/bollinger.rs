//! Bollinger Bands indicator.

use crate::config::BollingerSettings;
use crate::error::Result;
use crate::services::signals::{math, Signal};
use crate::types::{
    BollingerValue, Candle, IndicatorFamily, IndicatorKey, IndicatorSignal, IndicatorValue,
    SignalDirection, Trend,
};

/// Bollinger Bands indicator, read momentum-following.
///
/// - Price above upper band: bullish, below lower band: bearish,
///   strength scaled by bandwidth
/// - %B above 0.8: slightly bullish, below 0.2: slightly bearish
/// - Zero-width band: %B = 0.5 (neutral)
pub struct BollingerBands {
    period: usize,
    std_dev_multiplier: f64,
}

impl Default for BollingerBands {
    fn default() -> Self {
        Self::from_settings(&BollingerSettings::default())
    }
}

impl BollingerBands {
    pub fn new(period: usize, std_dev_multiplier: f64) -> Self {
        Self {
            period,
            std_dev_multiplier,
        }
    }

    pub fn from_settings(settings: &BollingerSettings) -> Self {
        Self::new(settings.window, settings.std_dev)
    }

    /// Upper, middle and lower band over the last `period` closes.
    fn bands(&self, closes: &[f64]) -> (f64, f64, f64) {
        let window = &closes[closes.len() - self.period..];
        let middle = window.iter().sum::<f64>() / self.period as f64;
        let sd = math::std_dev(window);
        (
            middle + self.std_dev_multiplier * sd,
            middle,
            middle - self.std_dev_multiplier * sd,
        )
    }
}

impl Signal for BollingerBands {
    fn key(&self) -> IndicatorKey {
        // Multiplier is recorded in tenths to keep the key integral
        IndicatorKey::new(
            IndicatorFamily::Bollinger,
            vec![self.period, (self.std_dev_multiplier * 10.0).round() as usize],
        )
    }

    fn name(&self) -> String {
        format!("Bollinger Bands ({}, {})", self.period, self.std_dev_multiplier)
    }

    fn min_periods(&self) -> usize {
        self.period + 1
    }

    fn calculate(&self, candles: &[Candle]) -> Result<IndicatorSignal> {
        self.ensure_periods(candles)?;
        let closes = math::closes(candles);
        let price = closes[closes.len() - 1];

        let (upper, middle, lower) = self.bands(&closes);
        let prev_middle = {
            let prev = &closes[closes.len() - 1 - self.period..closes.len() - 1];
            prev.iter().sum::<f64>() / self.period as f64
        };

        let width = upper - lower;
        let degenerate = width <= middle.abs().max(1.0) * 1e-12;
        let percent_b = if degenerate {
            0.5
        } else {
            (price - lower) / width
        };
        let bandwidth = if middle != 0.0 { width / middle } else { 0.0 };

        let (direction, strength) = if degenerate {
            (SignalDirection::Neutral, 0.0)
        } else if price > upper {
            (SignalDirection::Bullish, (0.5 + bandwidth * 5.0).min(1.0))
        } else if price < lower {
            (SignalDirection::Bearish, (0.5 + bandwidth * 5.0).min(1.0))
        } else if percent_b > 0.8 {
            (SignalDirection::SlightlyBullish, (percent_b - 0.8) / 0.2 * 0.5)
        } else if percent_b < 0.2 {
            (SignalDirection::SlightlyBearish, (0.2 - percent_b) / 0.2 * 0.5)
        } else {
            (SignalDirection::Neutral, 0.0)
        };

        Ok(IndicatorSignal::new(
            self.key(),
            IndicatorValue::Bollinger(BollingerValue {
                upper,
                middle,
                lower,
                percent_b,
                bandwidth,
                middle_trend: Trend::between(prev_middle, middle),
            }),
            direction,
            strength,
        ))
    }
}
