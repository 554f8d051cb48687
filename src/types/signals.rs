use serde::{Deserialize, Serialize};
use std::fmt;

/// Categorical read of a single indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SignalDirection {
    StronglyBullish,
    Bullish,
    SlightlyBullish,
    #[default]
    Neutral,
    SlightlyBearish,
    Bearish,
    StronglyBearish,
}

impl SignalDirection {
    /// Numeric value used by the aggregator, in [-1, 1].
    pub fn value(&self) -> f64 {
        match self {
            Self::StronglyBullish => 1.0,
            Self::Bullish => 0.75,
            Self::SlightlyBullish => 0.25,
            Self::Neutral => 0.0,
            Self::SlightlyBearish => -0.25,
            Self::Bearish => -0.75,
            Self::StronglyBearish => -1.0,
        }
    }

    pub fn is_bullish(&self) -> bool {
        self.value() > 0.0
    }

    pub fn is_bearish(&self) -> bool {
        self.value() < 0.0
    }

    /// Mirror image across neutral.
    pub fn opposite(&self) -> Self {
        match self {
            Self::StronglyBullish => Self::StronglyBearish,
            Self::Bullish => Self::Bearish,
            Self::SlightlyBullish => Self::SlightlyBearish,
            Self::Neutral => Self::Neutral,
            Self::SlightlyBearish => Self::SlightlyBullish,
            Self::Bearish => Self::Bullish,
            Self::StronglyBearish => Self::StronglyBullish,
        }
    }

    /// Pick `bullish` when `up` is true, otherwise its bearish mirror.
    pub fn oriented(up: bool, bullish: Self) -> Self {
        if up {
            bullish
        } else {
            bullish.opposite()
        }
    }
}

impl fmt::Display for SignalDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::StronglyBullish => "strongly_bullish",
            Self::Bullish => "bullish",
            Self::SlightlyBullish => "slightly_bullish",
            Self::Neutral => "neutral",
            Self::SlightlyBearish => "slightly_bearish",
            Self::Bearish => "bearish",
            Self::StronglyBearish => "strongly_bearish",
        };
        write!(f, "{}", s)
    }
}

/// Indicator family used for grouping and weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndicatorFamily {
    Sma,
    Ema,
    Rsi,
    Macd,
    Bollinger,
    Stochastic,
    Adx,
    Obv,
    Fibonacci,
    Candlestick,
}

impl IndicatorFamily {
    pub const ALL: [IndicatorFamily; 10] = [
        Self::Sma,
        Self::Ema,
        Self::Rsi,
        Self::Macd,
        Self::Bollinger,
        Self::Stochastic,
        Self::Adx,
        Self::Obv,
        Self::Fibonacci,
        Self::Candlestick,
    ];

    /// Short upper-case label, as used in report keys.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Sma => "SMA",
            Self::Ema => "EMA",
            Self::Rsi => "RSI",
            Self::Macd => "MACD",
            Self::Bollinger => "BBANDS",
            Self::Stochastic => "STOCH",
            Self::Adx => "ADX",
            Self::Obv => "OBV",
            Self::Fibonacci => "FIBONACCI",
            Self::Candlestick => "CANDLESTICK",
        }
    }
}

impl fmt::Display for IndicatorFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Identity of one configured indicator instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndicatorKey {
    pub family: IndicatorFamily,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<usize>,
}

impl IndicatorKey {
    pub fn new(family: IndicatorFamily, params: Vec<usize>) -> Self {
        Self { family, params }
    }

    pub fn bare(family: IndicatorFamily) -> Self {
        Self {
            family,
            params: Vec::new(),
        }
    }
}

impl fmt::Display for IndicatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.family.label())?;
        for p in &self.params {
            write!(f, "_{}", p)?;
        }
        Ok(())
    }
}

/// Direction of a series between two points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    pub fn between(from: f64, to: f64) -> Self {
        if to > from {
            Self::Up
        } else if to < from {
            Self::Down
        } else {
            Self::Flat
        }
    }

    /// Trend of `values` from `lookback` steps back to the last element.
    pub fn over(values: &[f64], lookback: usize) -> Self {
        let n = values.len();
        if n <= lookback || lookback == 0 {
            return Self::Flat;
        }
        Self::between(values[n - 1 - lookback], values[n - 1])
    }

    pub fn opposes(&self, other: Trend) -> bool {
        matches!(
            (self, other),
            (Self::Up, Self::Down) | (Self::Down, Self::Up)
        )
    }
}

/// ADX trend-strength bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendStrength {
    Weak,
    Moderate,
    Strong,
}

impl TrendStrength {
    pub fn from_adx(adx: f64) -> Self {
        if adx < 20.0 {
            Self::Weak
        } else if adx < 40.0 {
            Self::Moderate
        } else {
            Self::Strong
        }
    }
}

/// Recognized candlestick formations, in detection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandlestickPattern {
    BullishEngulfing,
    BearishEngulfing,
    PiercingLine,
    DarkCloudCover,
    BullishHaramiCross,
    BullishHarami,
    BearishHaramiCross,
    BearishHarami,
    HammerOrHangingMan,
    InvertedHammerOrShootingStar,
    BullishMarubozu,
    BearishMarubozu,
    Doji,
    SpinningTop,
    SimpleBullish,
    SimpleBearish,
    Neutral,
}

impl CandlestickPattern {
    /// Base strength of the formation.
    pub fn strength(&self) -> f64 {
        match self {
            Self::BullishEngulfing | Self::BearishEngulfing => 0.8,
            Self::PiercingLine | Self::DarkCloudCover => 0.7,
            Self::BullishHaramiCross | Self::BearishHaramiCross => 0.6,
            Self::BullishHarami | Self::BearishHarami => 0.5,
            Self::HammerOrHangingMan | Self::InvertedHammerOrShootingStar => 0.6,
            Self::BullishMarubozu | Self::BearishMarubozu => 0.7,
            Self::Doji => 0.3,
            Self::SpinningTop => 0.2,
            Self::SimpleBullish | Self::SimpleBearish => 0.1,
            Self::Neutral => 0.0,
        }
    }

    /// Directional read of the formation.
    ///
    /// Reversal formations confirmed by two candles and marubozu map to
    /// bullish/bearish; harami, shape-only and plain candles are slight.
    /// Indecision maps to neutral.
    pub fn direction(&self) -> SignalDirection {
        use SignalDirection::*;
        match self {
            Self::BullishEngulfing | Self::PiercingLine | Self::BullishMarubozu => Bullish,
            Self::BearishEngulfing | Self::DarkCloudCover | Self::BearishMarubozu => Bearish,
            Self::BullishHaramiCross
            | Self::BullishHarami
            | Self::HammerOrHangingMan
            | Self::SimpleBullish => SlightlyBullish,
            Self::BearishHaramiCross
            | Self::BearishHarami
            | Self::InvertedHammerOrShootingStar
            | Self::SimpleBearish => SlightlyBearish,
            Self::Doji | Self::SpinningTop | Self::Neutral => Neutral,
        }
    }
}

/// Moving-average reading (SMA or EMA).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovingAverageValue {
    pub average: f64,
    pub price: f64,
    /// Fractional deviation of price from the average.
    pub deviation: f64,
    pub slope: Trend,
    pub crossover: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RsiValue {
    pub rsi: f64,
    pub previous: f64,
    pub rsi_trend: Trend,
    pub price_trend: Trend,
    pub overbought: f64,
    pub oversold: f64,
    pub centerline_cross: bool,
    pub divergence: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacdValue {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
    pub normalized_histogram: f64,
    pub histogram_rising: bool,
    pub crossover: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BollingerValue {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    pub percent_b: f64,
    pub bandwidth: f64,
    pub middle_trend: Trend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StochasticValue {
    pub k: f64,
    pub d: f64,
    pub price_trend: Trend,
    pub k_trend: Trend,
    pub d_trend: Trend,
    pub crossover: bool,
    pub crossunder: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdxValue {
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
    pub trend_strength: TrendStrength,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObvValue {
    pub obv: f64,
    pub obv_sma: f64,
    pub short_trend: Trend,
    pub medium_trend: Trend,
    pub price_change_pct: f64,
    /// OBV change over the lookback relative to traded volume.
    pub obv_ratio: f64,
    pub crossover: bool,
    pub divergence: bool,
}

/// One retracement or extension level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FibonacciLevel {
    pub ratio: f64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FibonacciValue {
    pub swing_high: f64,
    pub swing_low: f64,
    pub trend: Trend,
    pub recent_trend: Trend,
    pub levels: Vec<FibonacciLevel>,
    pub nearest_level: f64,
    pub nearest_price: f64,
    pub distance_pct: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_level_above: Option<FibonacciLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_level_below: Option<FibonacciLevel>,
    pub potential_profit_pct: f64,
    pub potential_loss_pct: f64,
    pub risk_reward: f64,
    pub breakout: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandlestickValue {
    pub pattern: CandlestickPattern,
}

/// Family-specific raw reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndicatorValue {
    MovingAverage(MovingAverageValue),
    Rsi(RsiValue),
    Macd(MacdValue),
    Bollinger(BollingerValue),
    Stochastic(StochasticValue),
    Adx(AdxValue),
    Obv(ObvValue),
    Fibonacci(FibonacciValue),
    Candlestick(CandlestickValue),
}

impl IndicatorValue {
    /// Coerce every non-finite number to 0.
    pub fn sanitize(&mut self) {
        use crate::types::finite;
        fn fix(values: &mut [&mut f64]) {
            for v in values.iter_mut() {
                **v = crate::types::finite(**v);
            }
        }
        match self {
            Self::MovingAverage(v) => fix(&mut [&mut v.average, &mut v.price, &mut v.deviation]),
            Self::Rsi(v) => fix(&mut [
                &mut v.rsi,
                &mut v.previous,
                &mut v.overbought,
                &mut v.oversold,
            ]),
            Self::Macd(v) => fix(&mut [
                &mut v.macd,
                &mut v.signal,
                &mut v.histogram,
                &mut v.normalized_histogram,
            ]),
            Self::Bollinger(v) => fix(&mut [
                &mut v.upper,
                &mut v.middle,
                &mut v.lower,
                &mut v.percent_b,
                &mut v.bandwidth,
            ]),
            Self::Stochastic(v) => fix(&mut [&mut v.k, &mut v.d]),
            Self::Adx(v) => fix(&mut [&mut v.adx, &mut v.plus_di, &mut v.minus_di]),
            Self::Obv(v) => fix(&mut [
                &mut v.obv,
                &mut v.obv_sma,
                &mut v.price_change_pct,
                &mut v.obv_ratio,
            ]),
            Self::Fibonacci(v) => {
                fix(&mut [
                    &mut v.swing_high,
                    &mut v.swing_low,
                    &mut v.nearest_level,
                    &mut v.nearest_price,
                    &mut v.distance_pct,
                    &mut v.potential_profit_pct,
                    &mut v.potential_loss_pct,
                    &mut v.risk_reward,
                ]);
                let extra = v.next_level_above.iter_mut().chain(v.next_level_below.iter_mut());
                for level in v.levels.iter_mut().chain(extra) {
                    level.ratio = finite(level.ratio);
                    level.price = finite(level.price);
                }
            }
            Self::Candlestick(_) => {}
        }
    }
}

/// Output of one indicator calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSignal {
    pub key: IndicatorKey,
    pub value: IndicatorValue,
    pub direction: SignalDirection,
    pub strength: f64,
}

impl IndicatorSignal {
    /// Build a signal, clamping strength into [0, 1] and zeroing non-finite readings.
    pub fn new(
        key: IndicatorKey,
        mut value: IndicatorValue,
        direction: SignalDirection,
        strength: f64,
    ) -> Self {
        value.sanitize();
        Self {
            key,
            value,
            direction,
            strength: crate::types::finite(strength).clamp(0.0, 1.0),
        }
    }

    pub fn family(&self) -> IndicatorFamily {
        self.key.family
    }

    /// Direction value multiplied by strength.
    pub fn weighted_value(&self) -> f64 {
        self.direction.value() * self.strength
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_values_mirror() {
        for dir in [
            SignalDirection::StronglyBullish,
            SignalDirection::Bullish,
            SignalDirection::SlightlyBullish,
            SignalDirection::Neutral,
        ] {
            assert_eq!(dir.value(), -dir.opposite().value());
        }
        assert_eq!(SignalDirection::Bullish.value(), 0.75);
    }

    #[test]
    fn test_signal_zeroes_non_finite_readings() {
        let signal = IndicatorSignal::new(
            IndicatorKey::new(IndicatorFamily::Sma, vec![20]),
            IndicatorValue::MovingAverage(MovingAverageValue {
                average: 0.0,
                price: 0.0,
                deviation: f64::NAN,
                slope: Trend::Flat,
                crossover: false,
            }),
            SignalDirection::Neutral,
            f64::INFINITY,
        );
        match &signal.value {
            IndicatorValue::MovingAverage(v) => assert_eq!(v.deviation, 0.0),
            other => panic!("unexpected value {:?}", other),
        }
        assert_eq!(signal.strength, 0.0);
    }

    #[test]
    fn test_key_display() {
        assert_eq!(
            IndicatorKey::new(IndicatorFamily::Sma, vec![20]).to_string(),
            "SMA_20"
        );
        assert_eq!(
            IndicatorKey::new(IndicatorFamily::Macd, vec![12, 26, 9]).to_string(),
            "MACD_12_26_9"
        );
        assert_eq!(IndicatorKey::bare(IndicatorFamily::Obv).to_string(), "OBV");
    }

    #[test]
    fn test_trend_over() {
        let values = [1.0, 2.0, 3.0, 3.0];
        assert_eq!(Trend::over(&values, 3), Trend::Up);
        assert_eq!(Trend::over(&values, 1), Trend::Flat);
        assert_eq!(Trend::over(&values, 10), Trend::Flat);
        assert!(Trend::Up.opposes(Trend::Down));
        assert!(!Trend::Up.opposes(Trend::Flat));
    }

    #[test]
    fn test_trend_strength_buckets() {
        assert_eq!(TrendStrength::from_adx(10.0), TrendStrength::Weak);
        assert_eq!(TrendStrength::from_adx(25.0), TrendStrength::Moderate);
        assert_eq!(TrendStrength::from_adx(40.0), TrendStrength::Strong);
    }

    #[test]
    fn test_neutral_signal_weighs_nothing() {
        let signal = IndicatorSignal::new(
            IndicatorKey::bare(IndicatorFamily::Candlestick),
            IndicatorValue::Candlestick(CandlestickValue {
                pattern: CandlestickPattern::Doji,
            }),
            SignalDirection::Neutral,
            0.3,
        );
        assert_eq!(signal.strength, 0.3);
        assert_eq!(signal.weighted_value(), 0.0);

        let clamped = IndicatorSignal::new(
            signal.key.clone(),
            signal.value.clone(),
            SignalDirection::Bullish,
            f64::NAN,
        );
        assert_eq!(clamped.strength, 0.0);
    }
}
