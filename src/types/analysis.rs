use super::{IndicatorSignal, SentimentResult, StrategyScore, Timeframe};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Indicator that failed during an analysis and was left out of aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedIndicator {
    pub indicator: String,
    pub error: String,
}

/// Sentiment of one timeframe inside a multi-timeframe analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeframeSentiment {
    pub timeframe: Timeframe,
    pub weight: f64,
    pub sentiment: SentimentResult,
}

/// Per-timeframe detail attached to the primary report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiTimeframeBreakdown {
    pub combined: SentimentResult,
    pub timeframes: Vec<TimeframeSentiment>,
    /// Timeframes left out for lack of candles.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<Timeframe>,
}

/// Full analysis document for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<Timeframe>,
    pub price: f64,
    pub volume: f64,
    /// Signals keyed by indicator key, e.g. `RSI_14`.
    pub indicators: BTreeMap<String, IndicatorSignal>,
    pub sentiment: SentimentResult,
    #[serde(default)]
    pub strategies: Vec<StrategyScore>,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_timeframe: Option<MultiTimeframeBreakdown>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_indicators: Vec<FailedIndicator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisReport {
    /// Neutral report carrying an error message.
    pub fn failed(symbol: &str, timeframe: Option<Timeframe>, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            symbol: symbol.to_string(),
            timestamp: Utc::now(),
            timeframe,
            price: 0.0,
            volume: 0.0,
            indicators: BTreeMap::new(),
            sentiment: SentimentResult::neutral(),
            strategies: Vec::new(),
            summary: format!("Analysis unavailable: {}", error),
            multi_timeframe: None,
            failed_indicators: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
