//! Candlestick pattern recognition.

use crate::config::CandlestickSettings;
use crate::error::Result;
use crate::services::signals::Signal;
use crate::types::{
    Candle, CandlestickPattern, CandlestickValue, IndicatorFamily, IndicatorKey, IndicatorSignal,
    IndicatorValue,
};

/// Classifies the last candle (with the one before it) into a single pattern.
///
/// Two-candle formations take priority over single-candle shapes, which take
/// priority over indecision candles. A candle matching nothing specific falls
/// back to a plain bullish/bearish read.
#[derive(Default)]
pub struct Candlestick {
    settings: CandlestickSettings,
}

impl Candlestick {
    pub fn from_settings(settings: &CandlestickSettings) -> Self {
        Self {
            settings: settings.clone(),
        }
    }

    /// Pattern for `current`, using `previous` for two-candle formations.
    pub fn detect(&self, current: &Candle, previous: Option<&Candle>) -> CandlestickPattern {
        use CandlestickPattern::*;

        if let Some(previous) = previous {
            if self.bullish_engulfing(current, previous) {
                return BullishEngulfing;
            }
            if self.bearish_engulfing(current, previous) {
                return BearishEngulfing;
            }
            if self.piercing_line(current, previous) {
                return PiercingLine;
            }
            if self.dark_cloud_cover(current, previous) {
                return DarkCloudCover;
            }
            if self.bullish_harami(current, previous) {
                return if self.doji(current) {
                    BullishHaramiCross
                } else {
                    BullishHarami
                };
            }
            if self.bearish_harami(current, previous) {
                return if self.doji(current) {
                    BearishHaramiCross
                } else {
                    BearishHarami
                };
            }
        }

        if self.hammer_shape(current) {
            HammerOrHangingMan
        } else if self.inverted_hammer_shape(current) {
            InvertedHammerOrShootingStar
        } else if self.marubozu(current) && current.is_bullish() {
            BullishMarubozu
        } else if self.marubozu(current) && current.is_bearish() {
            BearishMarubozu
        } else if self.doji(current) {
            Doji
        } else if self.spinning_top(current) {
            SpinningTop
        } else if current.is_bullish() {
            SimpleBullish
        } else if current.is_bearish() {
            SimpleBearish
        } else {
            Neutral
        }
    }

    /// Pattern at every position of the series; the first candle is read alone.
    pub fn scan(&self, candles: &[Candle]) -> Vec<CandlestickPattern> {
        candles
            .iter()
            .enumerate()
            .map(|(i, c)| self.detect(c, i.checked_sub(1).map(|p| &candles[p])))
            .collect()
    }

    fn doji(&self, c: &Candle) -> bool {
        let range = c.range();
        range == 0.0 || c.body() <= range * self.settings.doji_body
    }

    fn hammer_shape(&self, c: &Candle) -> bool {
        let body = c.body();
        body > 0.0
            && c.lower_shadow() >= body * self.settings.hammer_shadow
            && c.upper_shadow() <= body * self.settings.shadow_limit
    }

    fn inverted_hammer_shape(&self, c: &Candle) -> bool {
        let body = c.body();
        body > 0.0
            && c.upper_shadow() >= body * self.settings.hammer_shadow
            && c.lower_shadow() <= body * self.settings.shadow_limit
    }

    fn marubozu(&self, c: &Candle) -> bool {
        let range = c.range();
        if range == 0.0 || c.body() == 0.0 {
            return false;
        }
        let max_shadow = range * self.settings.marubozu_shadow;
        c.upper_shadow() <= max_shadow && c.lower_shadow() <= max_shadow
    }

    fn spinning_top(&self, c: &Candle) -> bool {
        let (body, range) = (c.body(), c.range());
        if range == 0.0 || body == 0.0 {
            return false;
        }
        body <= range * self.settings.spinning_top_body
            && c.upper_shadow() >= body
            && c.lower_shadow() >= body
    }

    fn bullish_engulfing(&self, current: &Candle, previous: &Candle) -> bool {
        current.is_bullish()
            && previous.is_bearish()
            && current.open < previous.close
            && current.close > previous.open
    }

    fn bearish_engulfing(&self, current: &Candle, previous: &Candle) -> bool {
        current.is_bearish()
            && previous.is_bullish()
            && current.open > previous.close
            && current.close < previous.open
    }

    fn piercing_line(&self, current: &Candle, previous: &Candle) -> bool {
        let body = previous.body();
        if body == 0.0 {
            return false;
        }
        let midpoint = previous.open - body * self.settings.piercing_midpoint;
        previous.is_bearish()
            && current.is_bullish()
            && current.open < previous.close
            && current.close > midpoint
            && current.close < previous.open
    }

    fn dark_cloud_cover(&self, current: &Candle, previous: &Candle) -> bool {
        let body = previous.body();
        if body == 0.0 {
            return false;
        }
        let midpoint = previous.open + body * self.settings.piercing_midpoint;
        previous.is_bullish()
            && current.is_bearish()
            && current.open > previous.close
            && current.close < midpoint
            && current.close > previous.open
    }

    /// Current body strictly inside a bearish previous body.
    fn bullish_harami(&self, current: &Candle, previous: &Candle) -> bool {
        previous.is_bearish()
            && current.open.max(current.close) < previous.open
            && current.open.min(current.close) > previous.close
    }

    /// Current body strictly inside a bullish previous body.
    fn bearish_harami(&self, current: &Candle, previous: &Candle) -> bool {
        previous.is_bullish()
            && current.open.max(current.close) < previous.close
            && current.open.min(current.close) > previous.open
    }
}

impl Signal for Candlestick {
    fn key(&self) -> IndicatorKey {
        IndicatorKey::bare(IndicatorFamily::Candlestick)
    }

    fn name(&self) -> String {
        "Candlestick Patterns".to_string()
    }

    fn min_periods(&self) -> usize {
        2
    }

    fn calculate(&self, candles: &[Candle]) -> Result<IndicatorSignal> {
        self.ensure_periods(candles)?;
        let n = candles.len();
        let pattern = self.detect(&candles[n - 1], Some(&candles[n - 2]));

        Ok(IndicatorSignal::new(
            self.key(),
            IndicatorValue::Candlestick(CandlestickValue { pattern }),
            pattern.direction(),
            pattern.strength(),
        ))
    }
}
