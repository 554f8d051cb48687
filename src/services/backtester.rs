//! Backtest Validator
//!
//! Replays sentiment predictions over historical candles.
//! Features:
//! - Sliding lookback window with a fixed forward horizon
//! - Accuracy per sentiment and per strength bucket
//! - Pluggable predictor through [`SentimentSource`]

use crate::config::BacktestSettings;
use crate::types::{
    finite, BacktestRecord, BacktestReport, Candle, Sentiment, SentimentResult,
};
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Backtesting errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BacktestError {
    #[error("Insufficient data for backtest: need {need} candles, got {got}")]
    InsufficientData { need: usize, got: usize },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Anything that can turn a candle window into a sentiment.
pub trait SentimentSource: Send + Sync {
    fn predict(&self, window: &[Candle]) -> SentimentResult;
}

impl<F> SentimentSource for F
where
    F: Fn(&[Candle]) -> SentimentResult + Send + Sync,
{
    fn predict(&self, window: &[Candle]) -> SentimentResult {
        self(window)
    }
}

/// Walk-forward accuracy runner.
#[derive(Debug, Clone, Default)]
pub struct Backtester {
    settings: BacktestSettings,
}

impl Backtester {
    pub fn new(settings: BacktestSettings) -> Self {
        Self { settings }
    }

    pub fn with_windows(lookback: usize, forward: usize) -> Self {
        Self::new(BacktestSettings {
            lookback,
            forward,
            ..BacktestSettings::default()
        })
    }

    pub fn settings(&self) -> &BacktestSettings {
        &self.settings
    }

    /// Run the backtest, folding any error into the report.
    pub fn run<S: SentimentSource + ?Sized>(
        &self,
        source: &S,
        symbol: &str,
        candles: &[Candle],
    ) -> BacktestReport {
        match self.try_run(source, symbol, candles) {
            Ok(report) => report,
            Err(e) => {
                warn!("Backtest for {} failed: {}", symbol, e);
                let mut report = BacktestReport::new(
                    symbol,
                    self.settings.lookback,
                    self.settings.forward,
                    self.settings.neutral_threshold_pct,
                );
                report.error = Some(e.to_string());
                report
            }
        }
    }

    /// Slide a `lookback` window over `candles` and score each prediction
    /// against the close `forward` candles after the window.
    pub fn try_run<S: SentimentSource + ?Sized>(
        &self,
        source: &S,
        symbol: &str,
        candles: &[Candle],
    ) -> Result<BacktestReport, BacktestError> {
        let lookback = self.settings.lookback;
        let forward = self.settings.forward;
        let neutral_threshold_pct = self.settings.neutral_threshold_pct;

        if lookback == 0 || forward == 0 {
            return Err(BacktestError::InvalidConfig(
                "lookback and forward must be positive".to_string(),
            ));
        }
        let need = lookback + forward;
        if candles.len() < need {
            return Err(BacktestError::InsufficientData {
                need,
                got: candles.len(),
            });
        }

        let mut report = BacktestReport::new(symbol, lookback, forward, neutral_threshold_pct);
        let windows = candles.len() - need + 1;
        debug!(
            "Backtesting {} over {} windows (lookback {}, forward {})",
            symbol, windows, lookback, forward
        );

        for start in 0..windows {
            let end = start + lookback;
            let prediction = source.predict(&candles[start..end]);

            let reference = &candles[end - 1];
            let forward_price = candles[end - 1 + forward].close;
            let change = if reference.close != 0.0 {
                (forward_price - reference.close) / reference.close * 100.0
            } else {
                0.0
            };

            report.push(BacktestRecord {
                window_end: reference.timestamp,
                predicted: prediction.overall,
                strength: prediction.strength,
                confidence: prediction.confidence,
                reference_price: reference.close,
                forward_price,
                price_change_pct: finite(change),
                correct: is_correct(prediction.overall, change, neutral_threshold_pct),
            });
        }

        report.completed_at = Utc::now();
        info!(
            "Backtest {} for {} completed: {}/{} correct ({:.2}%)",
            report.id,
            symbol,
            report.overall.correct,
            report.overall.total,
            report.accuracy() * 100.0
        );
        Ok(report)
    }
}

/// Buy needs a rise, sell a fall, neutral a move inside the threshold.
pub fn is_correct(predicted: Sentiment, change_pct: f64, neutral_threshold_pct: f64) -> bool {
    match predicted {
        Sentiment::Buy => change_pct > 0.0,
        Sentiment::Sell => change_pct < 0.0,
        Sentiment::Neutral => change_pct.abs() < neutral_threshold_pct,
    }
}
