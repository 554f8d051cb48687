//! Indicator signal service module.
//!
//! Provides the technical indicator calculators and the series math they
//! share. Each calculator maps a candle window to one [`IndicatorSignal`].

pub mod indicators;
pub mod math;

#[cfg(test)]
pub(crate) mod testing;

use crate::error::{AnalysisError, Result};
use crate::types::{Candle, IndicatorFamily, IndicatorKey, IndicatorSignal};

/// Trait for implementing technical indicators.
pub trait Signal: Send + Sync {
    /// Family plus parameters, e.g. `RSI_14`.
    fn key(&self) -> IndicatorKey;

    /// Human-readable name.
    fn name(&self) -> String;

    /// Minimum number of candles required for calculation.
    fn min_periods(&self) -> usize;

    /// Calculate the signal from a timestamp-ascending candle window.
    fn calculate(&self, candles: &[Candle]) -> Result<IndicatorSignal>;

    fn family(&self) -> IndicatorFamily {
        self.key().family
    }

    /// Fail with `InsufficientData` when `candles` is shorter than `min_periods`.
    fn ensure_periods(&self, candles: &[Candle]) -> Result<()> {
        let need = self.min_periods();
        if candles.len() < need {
            return Err(AnalysisError::insufficient(
                self.key().to_string(),
                need,
                candles.len(),
            ));
        }
        Ok(())
    }
}
