//! Analysis Engine
//!
//! Coordinates the indicator calculators, the sentiment aggregator and the
//! multi-timeframe combiner into one report per symbol.

use crate::config::EngineConfig;
use crate::error::{AnalysisError, Result};
use crate::services::backtester::{Backtester, SentimentSource};
use crate::services::multi_timeframe::MultiTimeframeCombiner;
use crate::services::sentiment::SentimentAggregator;
use crate::services::signals::{indicators, Signal};
use crate::types::{
    finite, AnalysisReport, BacktestReport, Candle, CandleSeries, FailedIndicator,
    IndicatorFamily, IndicatorSignal, IndicatorValue, SentimentResult, SentimentStrength,
    Timeframe, TimeframeSentiment,
};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

const INSUFFICIENT_DATA: &str = "Insufficient data for analysis";

pub struct AnalysisEngine {
    config: EngineConfig,
    indicators: Vec<Box<dyn Signal>>,
    aggregator: SentimentAggregator,
    combiner: MultiTimeframeCombiner,
}

impl Default for AnalysisEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl AnalysisEngine {
    pub fn new(config: EngineConfig) -> Self {
        let indicators = indicators::from_settings(&config.indicators);
        let aggregator = SentimentAggregator::new(config.weights.clone(), config.thresholds.clone());
        let combiner =
            MultiTimeframeCombiner::new(config.timeframe_weights.clone(), config.thresholds.clone());
        debug!("Analysis engine built with {} indicators", indicators.len());
        Self {
            config,
            indicators,
            aggregator,
            combiner,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn indicators(&self) -> &[Box<dyn Signal>] {
        &self.indicators
    }

    pub fn aggregator(&self) -> &SentimentAggregator {
        &self.aggregator
    }

    /// Run every indicator; failures are logged and returned separately.
    pub fn compute_signals(&self, candles: &[Candle]) -> (Vec<IndicatorSignal>, Vec<FailedIndicator>) {
        let mut signals = Vec::with_capacity(self.indicators.len());
        let mut failed = Vec::new();
        for indicator in &self.indicators {
            match indicator.calculate(candles) {
                Ok(signal) => signals.push(signal),
                Err(e) => {
                    warn!("Error calculating {}: {}", indicator.name(), e);
                    failed.push(FailedIndicator {
                        indicator: indicator.key().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }
        (signals, failed)
    }

    /// Full single-timeframe analysis.
    pub fn analyze(&self, symbol: &str, candles: &[Candle]) -> AnalysisReport {
        self.analyze_with_minimum(symbol, None, candles, self.config.min_candles)
    }

    /// Parse raw market-data rows, then analyze.
    pub fn analyze_rows(&self, symbol: &str, rows: &[Vec<Value>]) -> AnalysisReport {
        match CandleSeries::from_rows(rows) {
            Ok(series) => self.analyze(symbol, &series),
            Err(e) => {
                warn!("Rejected candle data for {}: {}", symbol, e);
                AnalysisReport::failed(symbol, None, e.to_string())
            }
        }
    }

    /// Analyze each timeframe with enough candles and combine them.
    ///
    /// The primary timeframe's report (or the first analyzed one) carries
    /// the combined sentiment and the per-timeframe breakdown.
    pub fn analyze_multi_timeframe(
        &self,
        symbol: &str,
        series: &[(Timeframe, CandleSeries)],
    ) -> AnalysisReport {
        let mut reports: Vec<AnalysisReport> = Vec::new();
        let mut skipped = Vec::new();

        for (timeframe, candles) in series {
            if candles.len() < self.config.min_timeframe_candles {
                debug!(
                    "Skipping {} {}: {} candles",
                    symbol,
                    timeframe,
                    candles.len()
                );
                skipped.push(*timeframe);
                continue;
            }
            let report = self.analyze_with_minimum(
                symbol,
                Some(*timeframe),
                candles,
                self.config.min_timeframe_candles,
            );
            if report.is_error() {
                skipped.push(*timeframe);
            } else {
                reports.push(report);
            }
        }

        if reports.is_empty() {
            warn!("No timeframe of {} had enough data", symbol);
            return AnalysisReport::failed(symbol, None, "No valid analysis available");
        }
        let primary_index = reports
            .iter()
            .position(|r| r.timeframe == Some(self.config.primary_timeframe))
            .unwrap_or(0);

        let sentiments: Vec<(Timeframe, SentimentResult)> = reports
            .iter()
            .filter_map(|r| r.timeframe.map(|tf| (tf, r.sentiment.clone())))
            .collect();
        let breakdown = self.combiner.breakdown(&sentiments, skipped);

        let mut primary = reports.swap_remove(primary_index);
        let snapshot = primary.sentiment.snapshot;
        primary.sentiment = SentimentResult {
            snapshot,
            ..breakdown.combined.clone()
        };
        primary.summary = multi_timeframe_summary(symbol, &primary, &breakdown.timeframes);
        primary.multi_timeframe = Some(breakdown);

        info!(
            "{} multi-timeframe sentiment: {} {} over {} timeframes",
            symbol,
            primary.sentiment.strength,
            primary.sentiment.overall,
            sentiments.len()
        );
        primary
    }

    /// Walk-forward accuracy of this engine's predictions.
    pub fn backtest(&self, symbol: &str, candles: &[Candle]) -> BacktestReport {
        Backtester::new(self.config.backtest.clone()).run(self, symbol, candles)
    }

    fn analyze_with_minimum(
        &self,
        symbol: &str,
        timeframe: Option<Timeframe>,
        candles: &[Candle],
        minimum: usize,
    ) -> AnalysisReport {
        if let Err(e) = check_series(candles) {
            warn!("Invalid candle series for {}: {}", symbol, e);
            return AnalysisReport::failed(symbol, timeframe, e.to_string());
        }
        if candles.is_empty() || candles.len() < minimum {
            warn!(
                "Not enough data for {} analysis: {} candles, need {}",
                symbol,
                candles.len(),
                minimum
            );
            return AnalysisReport::failed(symbol, timeframe, INSUFFICIENT_DATA);
        }
        info!("Analyzing {} with {} data points", symbol, candles.len());

        let (signals, failed_indicators) = self.compute_signals(candles);
        let last = &candles[candles.len() - 1];
        let sentiment = self
            .aggregator
            .aggregate(&signals)
            .with_snapshot(last.close, last.volume);
        let strategies = self.aggregator.aggregate_strategies(&signals);

        let indicators: BTreeMap<String, IndicatorSignal> = signals
            .into_iter()
            .map(|s| (s.key.to_string(), s))
            .collect();
        let summary = analysis_summary(symbol, candles, &indicators, &sentiment);

        AnalysisReport {
            symbol: symbol.to_string(),
            timestamp: last.timestamp,
            timeframe,
            price: finite(last.close),
            volume: finite(last.volume),
            indicators,
            sentiment,
            strategies,
            summary,
            multi_timeframe: None,
            failed_indicators,
            error: None,
        }
    }
}

impl SentimentSource for AnalysisEngine {
    fn predict(&self, window: &[Candle]) -> SentimentResult {
        let (signals, _) = self.compute_signals(window);
        self.aggregator.aggregate(&signals)
    }
}

/// Every candle valid and timestamps strictly ascending.
fn check_series(candles: &[Candle]) -> Result<()> {
    for candle in candles {
        candle.validate()?;
    }
    if let Some(pair) = candles
        .windows(2)
        .find(|pair| pair[1].timestamp <= pair[0].timestamp)
    {
        return Err(AnalysisError::InvalidSeries(format!(
            "timestamps not strictly ascending at {}",
            pair[1].timestamp
        )));
    }
    Ok(())
}

fn sentiment_label(sentiment: &SentimentResult) -> String {
    if sentiment.strength == SentimentStrength::None {
        "neutral".to_string()
    } else {
        format!("{} {}", sentiment.strength, sentiment.overall)
    }
}

fn first_of(
    indicators: &BTreeMap<String, IndicatorSignal>,
    family: IndicatorFamily,
) -> Option<&IndicatorSignal> {
    indicators.values().find(|s| s.family() == family)
}

/// RSI zone, MACD momentum and Bollinger band position.
fn indicator_insights(indicators: &BTreeMap<String, IndicatorSignal>) -> Vec<String> {
    let mut parts = Vec::new();

    if let Some(IndicatorValue::Rsi(rsi)) = first_of(indicators, IndicatorFamily::Rsi).map(|s| &s.value) {
        if rsi.rsi > rsi.overbought {
            parts.push(format!("RSI is overbought at {:.2}", rsi.rsi));
        } else if rsi.rsi < rsi.oversold {
            parts.push(format!("RSI is oversold at {:.2}", rsi.rsi));
        }
    }

    if let Some(macd) = first_of(indicators, IndicatorFamily::Macd) {
        if macd.direction.is_bullish() && macd.direction.value() >= 0.75 {
            parts.push("MACD shows bullish momentum".to_string());
        } else if macd.direction.is_bearish() && macd.direction.value() <= -0.75 {
            parts.push("MACD shows bearish momentum".to_string());
        }
    }

    if let Some(IndicatorValue::Bollinger(bb)) =
        first_of(indicators, IndicatorFamily::Bollinger).map(|s| &s.value)
    {
        if bb.percent_b > 1.0 {
            parts.push("Price is above the upper Bollinger Band".to_string());
        } else if bb.percent_b < 0.0 {
            parts.push("Price is below the lower Bollinger Band".to_string());
        } else if bb.percent_b > 0.8 {
            parts.push("Price is near the upper Bollinger Band".to_string());
        } else if bb.percent_b < 0.2 {
            parts.push("Price is near the lower Bollinger Band".to_string());
        }
    }

    parts
}

fn analysis_summary(
    symbol: &str,
    candles: &[Candle],
    indicators: &BTreeMap<String, IndicatorSignal>,
    sentiment: &SentimentResult,
) -> String {
    let price = candles[candles.len() - 1].close;
    let change = match candles.len() {
        n if n >= 2 && candles[n - 2].close != 0.0 => {
            (price - candles[n - 2].close) / candles[n - 2].close * 100.0
        }
        _ => 0.0,
    };

    let mut parts = vec![
        format!("{} is trading at {} ({:.2}% change)", symbol, price, finite(change)),
        format!(
            "Overall sentiment: {} (confidence: {:.2})",
            sentiment_label(sentiment),
            sentiment.confidence
        ),
    ];
    parts.extend(indicator_insights(indicators));
    parts.join(" ")
}

fn multi_timeframe_summary(
    symbol: &str,
    primary: &AnalysisReport,
    timeframes: &[TimeframeSentiment],
) -> String {
    let mut parts = vec![
        format!("{} is trading at {:.2}", symbol, primary.price),
        format!(
            "Multi-timeframe analysis shows {} sentiment (confidence: {:.2})",
            sentiment_label(&primary.sentiment),
            primary.sentiment.confidence
        ),
    ];
    if !timeframes.is_empty() {
        let breakdown: Vec<String> = timeframes
            .iter()
            .map(|tf| format!("{}: {}", tf.timeframe, sentiment_label(&tf.sentiment)))
            .collect();
        parts.push(format!("Timeframe breakdown: {}", breakdown.join(", ")));
    }
    parts.extend(indicator_insights(&primary.indicators));
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::signals::testing::*;
    use crate::types::{Sentiment, Strategy};
    use serde_json::json;

    #[test]
    fn test_engine_builds_default_indicators() {
        let engine = AnalysisEngine::default();
        assert_eq!(engine.indicators().len(), 12);
    }

    #[test]
    fn test_insufficient_data_report() {
        let report = AnalysisEngine::default().analyze("BTC-USDT", &create_uptrend_candles(99));
        assert_eq!(report.error.as_deref(), Some(INSUFFICIENT_DATA));
        assert_eq!(report.sentiment, SentimentResult::neutral());
        assert!(report.indicators.is_empty());
    }

    #[test]
    fn test_uptrend_analysis() {
        let candles = create_uptrend_candles(150);
        let report = AnalysisEngine::default().analyze("BTC-USDT", &candles);
        assert!(!report.is_error());
        assert_eq!(report.price, candles[149].close);
        assert_eq!(report.timestamp, candles[149].timestamp);
        assert!(report.failed_indicators.is_empty());
        assert_eq!(report.indicators.len(), 12);
        assert!(report.indicators.contains_key("RSI_14"));
        assert_eq!(report.sentiment.overall, Sentiment::Buy);
        assert!(report.sentiment.snapshot.is_some());
        assert_eq!(report.strategies.len(), Strategy::ALL.len());
        assert!(report.summary.starts_with("BTC-USDT is trading at"));
        assert!(report.summary.contains("RSI is overbought"));
    }

    #[test]
    fn test_flat_analysis_neutral() {
        let report = AnalysisEngine::default().analyze("FLAT", &create_flat_candles(120));
        assert!(!report.is_error());
        assert_eq!(report.sentiment.overall, Sentiment::Neutral);
        assert_eq!(report.sentiment.score, 0.0);
    }

    #[test]
    fn test_unsorted_candles_rejected() {
        let mut candles = create_uptrend_candles(120);
        candles.swap(10, 11);
        let report = AnalysisEngine::default().analyze("BAD", &candles);
        assert!(report.error.unwrap().contains("Invalid candle series"));
    }

    #[test]
    fn test_analyze_rows_invalid() {
        let rows = vec![vec![json!("1700000000"), json!("abc")]];
        let report = AnalysisEngine::default().analyze_rows("BAD", &rows);
        assert!(report.is_error());
        assert_eq!(report.sentiment.overall, Sentiment::Neutral);
    }

    #[test]
    fn test_disabled_indicator_not_reported() {
        let mut config = EngineConfig::default();
        config.indicators.fibonacci.enabled = false;
        let report = AnalysisEngine::new(config).analyze("X", &create_uptrend_candles(120));
        assert!(!report.indicators.keys().any(|k| k.starts_with("FIBONACCI")));
    }

    #[test]
    fn test_multi_timeframe_primary_and_skips() {
        let engine = AnalysisEngine::default();
        let series = vec![
            (
                Timeframe::FifteenMinutes,
                CandleSeries::new(create_uptrend_candles(120)).unwrap(),
            ),
            (
                Timeframe::OneHour,
                CandleSeries::new(create_uptrend_candles(110)).unwrap(),
            ),
            (
                Timeframe::OneDay,
                CandleSeries::new(create_uptrend_candles(20)).unwrap(),
            ),
        ];
        let report = engine.analyze_multi_timeframe("BTC-USDT", &series);
        assert_eq!(report.timeframe, Some(Timeframe::OneHour));
        let breakdown = report.multi_timeframe.as_ref().unwrap();
        assert_eq!(breakdown.timeframes.len(), 2);
        assert_eq!(breakdown.skipped, vec![Timeframe::OneDay]);
        assert_eq!(report.sentiment.overall, breakdown.combined.overall);
        assert!(report.summary.contains("Multi-timeframe analysis shows"));
        assert!(report.summary.contains("Timeframe breakdown: 15min"));
    }

    #[test]
    fn test_multi_timeframe_nothing_usable() {
        let series = vec![(
            Timeframe::OneHour,
            CandleSeries::new(create_uptrend_candles(10)).unwrap(),
        )];
        let report = AnalysisEngine::default().analyze_multi_timeframe("X", &series);
        assert!(report.is_error());
    }

    #[test]
    fn test_engine_as_sentiment_source() {
        let engine = AnalysisEngine::default();
        let prediction = engine.predict(&create_uptrend_candles(120));
        assert_eq!(prediction.overall, Sentiment::Buy);
        assert!(prediction.snapshot.is_none());
    }
}
