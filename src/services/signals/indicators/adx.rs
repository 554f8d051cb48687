//! Average Directional Index (ADX) indicator.

use crate::config::AdxSettings;
use crate::error::{AnalysisError, Result};
use crate::services::signals::{math, Signal};
use crate::types::{
    AdxValue, Candle, IndicatorFamily, IndicatorKey, IndicatorSignal, IndicatorValue,
    SignalDirection, TrendStrength,
};

/// ADX (Average Directional Index) indicator.
///
/// Measures trend strength (not direction):
/// - Below 20: Weak trend / ranging market
/// - 20-40: Moderate trend
/// - 40 and above: Strong trend
///
/// Direction comes from +DI vs -DI. Below the trend threshold (25) the
/// signal is neutral; above it, strength scales with the DI spread and
/// the ADX magnitude.
pub struct Adx {
    period: usize,
    threshold: f64,
}

impl Default for Adx {
    fn default() -> Self {
        Self::from_settings(&AdxSettings::default())
    }
}

/// Last ADX reading with its directional indicators.
#[derive(Debug, Clone, Copy)]
pub struct AdxReading {
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            threshold: 25.0,
        }
    }

    pub fn from_settings(settings: &AdxSettings) -> Self {
        Self {
            period: settings.length.max(1),
            threshold: settings.threshold,
        }
    }

    /// Wilder ADX with +DI/-DI for the last candle.
    pub fn reading(&self, candles: &[Candle]) -> Option<AdxReading> {
        let mut plus_dm = Vec::with_capacity(candles.len());
        let mut minus_dm = Vec::with_capacity(candles.len());
        let mut tr = Vec::with_capacity(candles.len());

        for pair in candles.windows(2) {
            let (previous, current) = (&pair[0], &pair[1]);

            let up_move = current.high - previous.high;
            let down_move = previous.low - current.low;

            plus_dm.push(if up_move > down_move && up_move > 0.0 {
                up_move
            } else {
                0.0
            });
            minus_dm.push(if down_move > up_move && down_move > 0.0 {
                down_move
            } else {
                0.0
            });
            tr.push(math::true_range(current, previous));
        }

        let smoothed_plus_dm = math::wilder_smooth(&plus_dm, self.period);
        let smoothed_minus_dm = math::wilder_smooth(&minus_dm, self.period);
        let smoothed_tr = math::wilder_smooth(&tr, self.period);
        if smoothed_tr.is_empty() {
            return None;
        }

        let di = |dm: f64, atr: f64| if atr > 0.0 { dm / atr * 100.0 } else { 0.0 };

        let dx_values: Vec<f64> = smoothed_tr
            .iter()
            .zip(smoothed_plus_dm.iter().zip(&smoothed_minus_dm))
            .map(|(&atr, (&pdm, &mdm))| {
                let plus_di = di(pdm, atr);
                let minus_di = di(mdm, atr);
                let di_sum = plus_di + minus_di;
                if di_sum > 0.0 {
                    (plus_di - minus_di).abs() / di_sum * 100.0
                } else {
                    0.0
                }
            })
            .collect();

        let adx = *math::wilder_smooth(&dx_values, self.period).last()?;
        let last_atr = *smoothed_tr.last()?;
        Some(AdxReading {
            adx,
            plus_di: di(*smoothed_plus_dm.last()?, last_atr),
            minus_di: di(*smoothed_minus_dm.last()?, last_atr),
        })
    }
}

impl Signal for Adx {
    fn key(&self) -> IndicatorKey {
        IndicatorKey::new(IndicatorFamily::Adx, vec![self.period])
    }

    fn name(&self) -> String {
        format!("ADX ({})", self.period)
    }

    fn min_periods(&self) -> usize {
        self.period * 2 + 1
    }

    fn calculate(&self, candles: &[Candle]) -> Result<IndicatorSignal> {
        self.ensure_periods(candles)?;
        let reading = self.reading(candles).ok_or_else(|| {
            AnalysisError::computation(self.key().to_string(), "not enough directional movement data")
        })?;

        let trend_strength = TrendStrength::from_adx(reading.adx);
        let spread = (reading.plus_di - reading.minus_di).abs();

        let (direction, strength) = if reading.adx < self.threshold || spread == 0.0 {
            (SignalDirection::Neutral, 0.0)
        } else {
            let strength = (spread / 10.0).min(1.0) * (reading.adx / 50.0).min(1.0);
            (
                SignalDirection::oriented(reading.plus_di > reading.minus_di, SignalDirection::Bullish),
                strength,
            )
        };

        Ok(IndicatorSignal::new(
            self.key(),
            IndicatorValue::Adx(AdxValue {
                adx: reading.adx,
                plus_di: reading.plus_di,
                minus_di: reading.minus_di,
                trend_strength,
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

    fn adx_value(signal: &IndicatorSignal) -> &AdxValue {
        match &signal.value {
            IndicatorValue::Adx(v) => v,
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn test_adx_key_and_name() {
        let adx = Adx::default();
        assert_eq!(adx.key().to_string(), "ADX_14");
        assert_eq!(adx.name(), "ADX (14)");
    }

    #[test]
    fn test_adx_min_periods() {
        let adx = Adx::default();
        assert_eq!(adx.min_periods(), 29); // period * 2 + 1
    }

    #[test]
    fn test_adx_insufficient_data() {
        let adx = Adx::default();
        let candles = create_uptrend_candles(20);
        assert!(matches!(
            adx.calculate(&candles),
            Err(AnalysisError::InsufficientData { need: 29, got: 20, .. })
        ));
    }

    #[test]
    fn test_adx_uptrend_strong() {
        let signal = Adx::default()
            .calculate(&create_uptrend_candles(100))
            .unwrap();
        let value = adx_value(&signal);
        assert_eq!(value.trend_strength, TrendStrength::Strong);
        assert!(value.plus_di > value.minus_di);
        assert_eq!(signal.direction, SignalDirection::Bullish);
        assert!(signal.strength > 0.0 && signal.strength <= 1.0);
    }

    #[test]
    fn test_adx_downtrend_bearish() {
        let signal = Adx::default()
            .calculate(&create_downtrend_candles(100))
            .unwrap();
        let value = adx_value(&signal);
        assert!(value.minus_di > value.plus_di);
        assert_eq!(signal.direction, SignalDirection::Bearish);
    }

    #[test]
    fn test_adx_flat_neutral() {
        let signal = Adx::default().calculate(&create_flat_candles(60)).unwrap();
        let value = adx_value(&signal);
        assert_eq!(value.adx, 0.0);
        assert_eq!(value.trend_strength, TrendStrength::Weak);
        assert_eq!(signal.direction, SignalDirection::Neutral);
    }
}
