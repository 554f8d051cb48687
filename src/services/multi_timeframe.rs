//! Multi-Timeframe Combiner
//!
//! Merges per-timeframe sentiments into one, weighting longer timeframes
//! heavier.

use crate::config::{SentimentThresholds, TimeframeWeights};
use crate::types::{
    finite, MultiTimeframeBreakdown, SentimentResult, Timeframe, TimeframeSentiment,
};

#[derive(Debug, Clone, Default)]
pub struct MultiTimeframeCombiner {
    weights: TimeframeWeights,
    thresholds: SentimentThresholds,
}

impl MultiTimeframeCombiner {
    pub fn new(weights: TimeframeWeights, thresholds: SentimentThresholds) -> Self {
        Self {
            weights,
            thresholds,
        }
    }

    /// Weight-normalized score average, re-classified.
    ///
    /// Confidence averages per-timeframe confidence over all timeframes,
    /// counting zero for those that disagree with the combined sentiment.
    pub fn combine(&self, sentiments: &[(Timeframe, SentimentResult)]) -> SentimentResult {
        if sentiments.is_empty() {
            return SentimentResult::neutral();
        }

        let (sum, total) = sentiments
            .iter()
            .fold((0.0, 0.0), |(sum, total), (timeframe, sentiment)| {
                let weight = self.weights.weight(*timeframe);
                (sum + sentiment.score * weight, total + weight)
            });
        let score = if total > 0.0 { sum / total } else { 0.0 };
        let (overall, strength) = self.thresholds.classify(score);

        let confidence = sentiments
            .iter()
            .map(|(_, s)| if s.overall == overall { s.confidence } else { 0.0 })
            .sum::<f64>()
            / sentiments.len() as f64;

        SentimentResult {
            overall,
            strength,
            confidence: finite(confidence),
            score: finite(score),
            snapshot: None,
        }
    }

    /// Combined sentiment plus the weighted per-timeframe detail.
    pub fn breakdown(
        &self,
        sentiments: &[(Timeframe, SentimentResult)],
        skipped: Vec<Timeframe>,
    ) -> MultiTimeframeBreakdown {
        MultiTimeframeBreakdown {
            combined: self.combine(sentiments),
            timeframes: sentiments
                .iter()
                .map(|(timeframe, sentiment)| TimeframeSentiment {
                    timeframe: *timeframe,
                    weight: self.weights.weight(*timeframe),
                    sentiment: sentiment.clone(),
                })
                .collect(),
            skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Sentiment, SentimentStrength};

    fn sentiment(score: f64, confidence: f64) -> SentimentResult {
        let (overall, strength) = SentimentThresholds::default().classify(score);
        SentimentResult {
            overall,
            strength,
            confidence,
            score,
            snapshot: None,
        }
    }

    #[test]
    fn test_combine_empty() {
        assert_eq!(
            MultiTimeframeCombiner::default().combine(&[]),
            SentimentResult::neutral()
        );
    }

    #[test]
    fn test_combine_agreement_averages_confidence() {
        let combined = MultiTimeframeCombiner::default().combine(&[
            (Timeframe::OneHour, sentiment(0.6, 0.8)),
            (Timeframe::FourHours, sentiment(0.6, 0.6)),
        ]);
        assert_eq!(combined.overall, Sentiment::Buy);
        assert_eq!(combined.strength, SentimentStrength::Strong);
        assert!((combined.confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_combine_disagreement_drops_confidence() {
        let combined = MultiTimeframeCombiner::default().combine(&[
            (Timeframe::OneHour, sentiment(0.3, 0.9)),
            (Timeframe::FourHours, sentiment(-0.2, 0.9)),
        ]);
        assert_eq!(combined.overall, Sentiment::Neutral);
        assert_eq!(combined.confidence, 0.0);
    }

    #[test]
    fn test_longer_timeframe_dominates() {
        let combined = MultiTimeframeCombiner::default().combine(&[
            (Timeframe::FiveMinutes, sentiment(-0.6, 0.9)),
            (Timeframe::OneDay, sentiment(0.6, 0.9)),
        ]);
        // (-0.6 * 0.4 + 0.6 * 2.0) / 2.4
        assert!((combined.score - 0.4).abs() < 1e-9);
        assert_eq!(combined.overall, Sentiment::Buy);
        assert!((combined.confidence - 0.45).abs() < 1e-9);
    }

    #[test]
    fn test_breakdown_records_weights() {
        let breakdown = MultiTimeframeCombiner::default().breakdown(
            &[(Timeframe::OneDay, sentiment(0.1, 0.5))],
            vec![Timeframe::OneWeek],
        );
        assert_eq!(breakdown.timeframes.len(), 1);
        assert_eq!(breakdown.timeframes[0].weight, 2.0);
        assert_eq!(breakdown.skipped, vec![Timeframe::OneWeek]);
        assert_eq!(breakdown.combined.overall, Sentiment::Buy);
    }
}
