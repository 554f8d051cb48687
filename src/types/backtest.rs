use super::{Sentiment, SentimentStrength};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// One prediction replayed against the realized forward move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestRecord {
    /// Timestamp of the last candle in the window.
    pub window_end: DateTime<Utc>,
    pub predicted: Sentiment,
    pub strength: SentimentStrength,
    pub confidence: f64,
    pub reference_price: f64,
    pub forward_price: f64,
    pub price_change_pct: f64,
    pub correct: bool,
}

/// Hit rate over a group of backtest records.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AccuracyStats {
    pub total: u32,
    pub correct: u32,
    /// correct / total, 0 when empty.
    pub accuracy: f64,
}

impl AccuracyStats {
    /// Record a prediction outcome.
    pub fn record(&mut self, correct: bool) {
        self.total += 1;
        if correct {
            self.correct += 1;
        }
        self.recalculate_accuracy();
    }

    fn recalculate_accuracy(&mut self) {
        self.accuracy = if self.total > 0 {
            self.correct as f64 / self.total as f64
        } else {
            0.0
        };
    }
}

/// Walk-forward accuracy report for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestReport {
    pub id: Uuid,
    pub symbol: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub lookback: usize,
    pub forward: usize,
    pub neutral_threshold_pct: f64,
    pub overall: AccuracyStats,
    pub by_sentiment: BTreeMap<Sentiment, AccuracyStats>,
    pub by_strength: BTreeMap<SentimentStrength, AccuracyStats>,
    pub average_forward_change_pct: f64,
    #[serde(default)]
    pub records: Vec<BacktestRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BacktestReport {
    pub fn new(symbol: &str, lookback: usize, forward: usize, neutral_threshold_pct: f64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            started_at: now,
            completed_at: now,
            lookback,
            forward,
            neutral_threshold_pct,
            overall: AccuracyStats::default(),
            by_sentiment: BTreeMap::new(),
            by_strength: BTreeMap::new(),
            average_forward_change_pct: 0.0,
            records: Vec::new(),
            error: None,
        }
    }

    /// Fold a record into every breakdown.
    pub fn push(&mut self, record: BacktestRecord) {
        self.overall.record(record.correct);
        self.by_sentiment
            .entry(record.predicted)
            .or_default()
            .record(record.correct);
        self.by_strength
            .entry(record.strength)
            .or_default()
            .record(record.correct);

        let n = self.records.len() as f64;
        self.average_forward_change_pct =
            (self.average_forward_change_pct * n + record.price_change_pct) / (n + 1.0);
        self.records.push(record);
    }

    pub fn accuracy(&self) -> f64 {
        self.overall.accuracy
    }

    /// Plain-text report.
    pub fn summary(&self) -> String {
        let mut out = format!("Backtest Results for {}\n", self.symbol);
        out.push_str(&format!(
            "Window: {} candles, forward: {} candles\n",
            self.lookback, self.forward
        ));
        if let Some(err) = &self.error {
            out.push_str(&format!("Error: {}\n", err));
            return out;
        }
        out.push_str(&format!("Total Predictions: {}\n", self.overall.total));
        out.push_str(&format!("Correct Predictions: {}\n", self.overall.correct));
        out.push_str(&format!(
            "Accuracy: {:.2}%\n",
            self.overall.accuracy * 100.0
        ));
        out.push_str(&format!(
            "Average Forward Change: {:.2}%\n",
            self.average_forward_change_pct
        ));

        if !self.by_sentiment.is_empty() {
            out.push_str("\nBy Sentiment:\n");
            for (sentiment, stats) in &self.by_sentiment {
                out.push_str(&format!(
                    "  {}: {}/{} ({:.2}%)\n",
                    sentiment,
                    stats.correct,
                    stats.total,
                    stats.accuracy * 100.0
                ));
            }
        }
        if !self.by_strength.is_empty() {
            out.push_str("\nBy Strength:\n");
            for (strength, stats) in &self.by_strength {
                out.push_str(&format!(
                    "  {}: {}/{} ({:.2}%)\n",
                    strength,
                    stats.correct,
                    stats.total,
                    stats.accuracy * 100.0
                ));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(predicted: Sentiment, change: f64, correct: bool) -> BacktestRecord {
        BacktestRecord {
            window_end: Utc::now(),
            predicted,
            strength: SentimentStrength::Weak,
            confidence: 0.5,
            reference_price: 100.0,
            forward_price: 100.0 + change,
            price_change_pct: change,
            correct,
        }
    }

    #[test]
    fn test_accuracy_stats_record() {
        let mut stats = AccuracyStats::default();
        assert_eq!(stats.accuracy, 0.0);
        stats.record(true);
        stats.record(false);
        stats.record(true);
        stats.record(true);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.correct, 3);
        assert!((stats.accuracy - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_report_push_breakdowns() {
        let mut report = BacktestReport::new("BTC-USDT", 100, 5, 1.0);
        report.push(record(Sentiment::Buy, 2.0, true));
        report.push(record(Sentiment::Sell, 2.0, false));
        report.push(record(Sentiment::Buy, -1.0, false));

        assert_eq!(report.overall.total, 3);
        assert_eq!(report.by_sentiment[&Sentiment::Buy].total, 2);
        assert_eq!(report.by_sentiment[&Sentiment::Sell].correct, 0);
        assert_eq!(report.by_strength[&SentimentStrength::Weak].total, 3);
        assert!((report.average_forward_change_pct - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_summary_text() {
        let mut report = BacktestReport::new("ETH-USDT", 100, 5, 1.0);
        report.push(record(Sentiment::Buy, 2.0, true));
        let text = report.summary();
        assert!(text.contains("Backtest Results for ETH-USDT"));
        assert!(text.contains("Total Predictions: 1"));
        assert!(text.contains("Accuracy: 100.00%"));
    }
}
