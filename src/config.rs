use crate::types::{IndicatorFamily, Sentiment, SentimentStrength, Strategy, Timeframe};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid engine config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Process configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Optional JSON file holding an [`EngineConfig`].
    pub engine_config_path: Option<PathBuf>,
    /// Directory of `<SYMBOL>_<timeframe>.json` candle files.
    pub candles_dir: PathBuf,
    /// Maximum symbols analyzed at once.
    pub max_concurrency: usize,
    /// Run a backtest for every symbol after analysis.
    pub run_backtest: bool,
    /// Write reports here instead of stdout.
    pub output_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            engine_config_path: env::var("AUGUR_ENGINE_CONFIG").ok().map(PathBuf::from),
            candles_dir: env::var("AUGUR_CANDLES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/candles")),
            max_concurrency: env::var("AUGUR_MAX_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &usize| *v > 0)
                .unwrap_or(10),
            run_backtest: env::var("AUGUR_RUN_BACKTEST")
                .ok()
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            output_path: env::var("AUGUR_OUTPUT").ok().map(PathBuf::from),
        }
    }

    /// Load the engine config file, or defaults when none is set.
    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        match &self.engine_config_path {
            Some(path) => EngineConfig::load(path),
            None => Ok(EngineConfig::default()),
        }
    }
}

/// Everything the analysis pipeline is parameterized by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub indicators: IndicatorSettings,
    pub weights: StrategyWeights,
    pub thresholds: SentimentThresholds,
    pub timeframe_weights: TimeframeWeights,
    pub backtest: BacktestSettings,
    /// Candles required before a full analysis runs.
    pub min_candles: usize,
    /// Candles required for a timeframe to join a multi-timeframe analysis.
    pub min_timeframe_candles: usize,
    /// Timeframe whose report carries the combined result.
    pub primary_timeframe: Timeframe,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            indicators: IndicatorSettings::default(),
            weights: StrategyWeights::default(),
            thresholds: SentimentThresholds::default(),
            timeframe_weights: TimeframeWeights::default(),
            backtest: BacktestSettings::default(),
            min_candles: 100,
            min_timeframe_candles: 50,
            primary_timeframe: Timeframe::OneHour,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }
}

/// Per-indicator parameters and enable flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorSettings {
    pub sma: MovingAverageSettings,
    pub ema: MovingAverageSettings,
    pub rsi: RsiSettings,
    pub macd: MacdSettings,
    pub bollinger: BollingerSettings,
    pub stochastic: StochasticSettings,
    pub adx: AdxSettings,
    pub obv: ObvSettings,
    pub fibonacci: FibonacciSettings,
    pub candlestick: CandlestickSettings,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            sma: MovingAverageSettings::default(),
            ema: MovingAverageSettings::ema(),
            rsi: RsiSettings::default(),
            macd: MacdSettings::default(),
            bollinger: BollingerSettings::default(),
            stochastic: StochasticSettings::default(),
            adx: AdxSettings::default(),
            obv: ObvSettings::default(),
            fibonacci: FibonacciSettings::default(),
            candlestick: CandlestickSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovingAverageSettings {
    pub enabled: bool,
    pub windows: Vec<usize>,
    /// Periods back used to judge whether the average is rising.
    pub slope_lookback: usize,
}

impl Default for MovingAverageSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            windows: vec![20, 50],
            slope_lookback: 4,
        }
    }
}

impl MovingAverageSettings {
    /// Default EMA windows.
    pub fn ema() -> Self {
        Self {
            windows: vec![9, 21],
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RsiSettings {
    pub enabled: bool,
    pub window: usize,
    pub overbought: f64,
    pub oversold: f64,
    pub trend_lookback: usize,
    /// Distance from 50 treated as neutral.
    pub neutral_band: f64,
}

impl Default for RsiSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            window: 14,
            overbought: 70.0,
            oversold: 30.0,
            trend_lookback: 5,
            neutral_band: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacdSettings {
    pub enabled: bool,
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
    pub normalization_window: usize,
}

impl Default for MacdSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            fast: 12,
            slow: 26,
            signal: 9,
            normalization_window: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BollingerSettings {
    pub enabled: bool,
    pub window: usize,
    pub std_dev: f64,
}

impl Default for BollingerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            window: 20,
            std_dev: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StochasticSettings {
    pub enabled: bool,
    pub k: usize,
    pub d: usize,
    pub smooth: usize,
    pub overbought: f64,
    pub oversold: f64,
    pub trend_lookback: usize,
}

impl Default for StochasticSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            k: 14,
            d: 3,
            smooth: 3,
            overbought: 80.0,
            oversold: 20.0,
            trend_lookback: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdxSettings {
    pub enabled: bool,
    pub length: usize,
    pub threshold: f64,
}

impl Default for AdxSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            length: 14,
            threshold: 25.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObvSettings {
    pub enabled: bool,
    pub sma_period: usize,
    pub short_period: usize,
    pub medium_period: usize,
    /// Candles spanned by the confirmation/divergence check.
    pub lookback: usize,
    /// Minimum price move, in percent, for a divergence.
    pub divergence_threshold_pct: f64,
}

impl Default for ObvSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            sma_period: 20,
            short_period: 5,
            medium_period: 20,
            lookback: 6,
            divergence_threshold_pct: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FibonacciSettings {
    pub enabled: bool,
    pub period: usize,
    /// Fractional distance to a level counted as "near".
    pub proximity: f64,
    pub recent_trend_lookback: usize,
}

impl Default for FibonacciSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            period: 100,
            proximity: 0.02,
            recent_trend_lookback: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandlestickSettings {
    pub enabled: bool,
    /// Max body / range for a doji.
    pub doji_body: f64,
    /// Min long shadow / body for hammer shapes.
    pub hammer_shadow: f64,
    /// Max short shadow / body for hammer shapes.
    pub shadow_limit: f64,
    /// Max shadow / range for a marubozu.
    pub marubozu_shadow: f64,
    /// Max body / range for a spinning top.
    pub spinning_top_body: f64,
    /// Penetration into the previous body for piercing line / dark cloud.
    pub piercing_midpoint: f64,
}

impl Default for CandlestickSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            doji_body: 0.10,
            hammer_shadow: 2.0,
            shadow_limit: 1.0,
            marubozu_shadow: 0.05,
            spinning_top_body: 0.3,
            piercing_midpoint: 0.5,
        }
    }
}

/// Importance weight per indicator family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightTable {
    pub weights: BTreeMap<IndicatorFamily, f64>,
    /// Weight for families absent from `weights`.
    pub default_weight: f64,
}

impl Default for WeightTable {
    fn default() -> Self {
        Self::from_pairs(&[
            (IndicatorFamily::Rsi, 1.0),
            (IndicatorFamily::Macd, 1.0),
            (IndicatorFamily::Bollinger, 0.8),
            (IndicatorFamily::Sma, 0.7),
            (IndicatorFamily::Ema, 0.8),
            (IndicatorFamily::Obv, 0.6),
            (IndicatorFamily::Stochastic, 0.7),
            (IndicatorFamily::Adx, 0.6),
            (IndicatorFamily::Fibonacci, 0.5),
        ])
    }
}

impl WeightTable {
    pub fn from_pairs(pairs: &[(IndicatorFamily, f64)]) -> Self {
        Self {
            weights: pairs.iter().copied().collect(),
            default_weight: 0.5,
        }
    }

    pub fn weight(&self, family: IndicatorFamily) -> f64 {
        self.weights
            .get(&family)
            .copied()
            .unwrap_or(self.default_weight)
    }

    /// Momentum favors MACD, RSI and Stochastic.
    pub fn momentum() -> Self {
        use IndicatorFamily::*;
        Self::from_pairs(&[
            (Macd, 1.0),
            (Rsi, 0.9),
            (Stochastic, 0.8),
            (Ema, 0.6),
            (Sma, 0.5),
            (Adx, 0.5),
            (Obv, 0.4),
            (Bollinger, 0.3),
            (Candlestick, 0.3),
            (Fibonacci, 0.2),
        ])
    }

    /// Mean reversion favors Bollinger, RSI and Stochastic extremes.
    pub fn mean_reversion() -> Self {
        use IndicatorFamily::*;
        Self::from_pairs(&[
            (Bollinger, 1.0),
            (Rsi, 0.9),
            (Stochastic, 0.9),
            (Fibonacci, 0.6),
            (Candlestick, 0.5),
            (Sma, 0.4),
            (Ema, 0.3),
            (Macd, 0.3),
            (Obv, 0.3),
            (Adx, 0.2),
        ])
    }

    /// Breakout favors OBV, ADX and Bollinger.
    pub fn breakout() -> Self {
        use IndicatorFamily::*;
        Self::from_pairs(&[
            (Obv, 1.0),
            (Adx, 1.0),
            (Bollinger, 0.9),
            (Fibonacci, 0.7),
            (Macd, 0.6),
            (Candlestick, 0.4),
            (Sma, 0.4),
            (Ema, 0.4),
            (Rsi, 0.3),
            (Stochastic, 0.3),
        ])
    }
}

/// Weight tables for the overall sentiment and each strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyWeights {
    pub overall: WeightTable,
    pub momentum: WeightTable,
    pub mean_reversion: WeightTable,
    pub breakout: WeightTable,
}

impl Default for StrategyWeights {
    fn default() -> Self {
        Self {
            overall: WeightTable::default(),
            momentum: WeightTable::momentum(),
            mean_reversion: WeightTable::mean_reversion(),
            breakout: WeightTable::breakout(),
        }
    }
}

impl StrategyWeights {
    pub fn for_strategy(&self, strategy: Strategy) -> &WeightTable {
        match strategy {
            Strategy::Momentum => &self.momentum,
            Strategy::MeanReversion => &self.mean_reversion,
            Strategy::Breakout => &self.breakout,
        }
    }
}

/// Score cut-offs for strength buckets, mirrored for sells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentThresholds {
    pub strong: f64,
    pub moderate: f64,
    pub weak: f64,
}

impl Default for SentimentThresholds {
    fn default() -> Self {
        Self {
            strong: 0.5,
            moderate: 0.2,
            weak: 0.05,
        }
    }
}

impl SentimentThresholds {
    /// Map a score to a sentiment and strength.
    pub fn classify(&self, score: f64) -> (Sentiment, SentimentStrength) {
        let magnitude = score.abs();
        let strength = if magnitude >= self.strong {
            SentimentStrength::Strong
        } else if magnitude >= self.moderate {
            SentimentStrength::Moderate
        } else if magnitude >= self.weak {
            SentimentStrength::Weak
        } else {
            return (Sentiment::Neutral, SentimentStrength::None);
        };

        if score > 0.0 {
            (Sentiment::Buy, strength)
        } else {
            (Sentiment::Sell, strength)
        }
    }
}

/// Importance weight per timeframe; longer timeframes weigh more.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeframeWeights {
    pub weights: BTreeMap<Timeframe, f64>,
    pub default_weight: f64,
}

impl Default for TimeframeWeights {
    fn default() -> Self {
        Self {
            weights: [
                (Timeframe::OneMinute, 0.2),
                (Timeframe::FiveMinutes, 0.4),
                (Timeframe::FifteenMinutes, 0.6),
                (Timeframe::ThirtyMinutes, 0.8),
                (Timeframe::OneHour, 1.0),
                (Timeframe::FourHours, 1.5),
                (Timeframe::OneDay, 2.0),
                (Timeframe::OneWeek, 2.5),
            ]
            .into_iter()
            .collect(),
            default_weight: 1.0,
        }
    }
}

impl TimeframeWeights {
    pub fn weight(&self, timeframe: Timeframe) -> f64 {
        self.weights
            .get(&timeframe)
            .copied()
            .unwrap_or(self.default_weight)
    }
}

/// Walk-forward validation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSettings {
    pub lookback: usize,
    pub forward: usize,
    /// Largest absolute move, in percent, that still counts as neutral.
    pub neutral_threshold_pct: f64,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            lookback: 100,
            forward: 5,
            neutral_threshold_pct: 1.0,
        }
    }
}
