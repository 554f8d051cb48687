//! Sentiment Aggregator
//!
//! Folds indicator signals into one weighted sentiment and one score per
//! strategy. Signals are grouped by indicator family first so that several
//! windows of the same indicator count once.

use crate::config::{SentimentThresholds, StrategyWeights, WeightTable};
use crate::types::{
    finite, IndicatorFamily, IndicatorSignal, SentimentResult, Strategy, StrategyScore,
};
use std::collections::BTreeMap;

/// Weighted cross-indicator aggregation.
#[derive(Debug, Clone, Default)]
pub struct SentimentAggregator {
    weights: StrategyWeights,
    thresholds: SentimentThresholds,
}

impl SentimentAggregator {
    pub fn new(weights: StrategyWeights, thresholds: SentimentThresholds) -> Self {
        Self {
            weights,
            thresholds,
        }
    }

    pub fn thresholds(&self) -> &SentimentThresholds {
        &self.thresholds
    }

    /// Overall sentiment using the overall weight table.
    ///
    /// Confidence is one minus the population standard deviation of the
    /// signals' direction values, so agreement in either direction is
    /// confident. An empty list is neutral with zero confidence.
    pub fn aggregate(&self, signals: &[IndicatorSignal]) -> SentimentResult {
        if signals.is_empty() {
            return SentimentResult::neutral();
        }

        let families = family_values(signals);
        let score = weighted_score(&self.weights.overall, &families);
        let (overall, strength) = self.thresholds.classify(score);

        let directions: Vec<f64> = signals.iter().map(|s| s.direction.value()).collect();
        let confidence = (1.0 - std_dev(&directions)).clamp(0.0, 1.0);

        SentimentResult {
            overall,
            strength,
            confidence: finite(confidence),
            score: finite(score),
            snapshot: None,
        }
    }

    /// One score per strategy, each with its own weight table.
    pub fn aggregate_strategies(&self, signals: &[IndicatorSignal]) -> Vec<StrategyScore> {
        let families = family_values(signals);
        Strategy::ALL
            .iter()
            .map(|&strategy| {
                self.strategy_score(strategy, self.weights.for_strategy(strategy), &families)
            })
            .collect()
    }

    fn strategy_score(
        &self,
        strategy: Strategy,
        table: &WeightTable,
        families: &BTreeMap<IndicatorFamily, f64>,
    ) -> StrategyScore {
        let breakdown: BTreeMap<IndicatorFamily, f64> = families
            .iter()
            .filter(|(family, _)| table.weight(**family) > 0.0)
            .map(|(family, value)| (*family, finite(*value)))
            .collect();

        let score = weighted_score(table, &breakdown);
        let confidence = if breakdown.is_empty() {
            0.0
        } else {
            (1.0 - weighted_std_dev(table, &breakdown, score)).clamp(0.0, 1.0)
        };
        let (sentiment, strength) = self.thresholds.classify(score);

        StrategyScore {
            strategy,
            score: finite(score),
            confidence: finite(confidence),
            sentiment,
            strength,
            breakdown,
        }
    }
}

/// Average of `direction value * strength` within each family.
pub fn family_values(signals: &[IndicatorSignal]) -> BTreeMap<IndicatorFamily, f64> {
    let mut groups: BTreeMap<IndicatorFamily, (f64, usize)> = BTreeMap::new();
    for signal in signals {
        let entry = groups.entry(signal.family()).or_insert((0.0, 0));
        entry.0 += signal.weighted_value();
        entry.1 += 1;
    }
    groups
        .into_iter()
        .map(|(family, (sum, count))| (family, sum / count as f64))
        .collect()
}

fn weighted_score(table: &WeightTable, families: &BTreeMap<IndicatorFamily, f64>) -> f64 {
    let (sum, total) = families
        .iter()
        .fold((0.0, 0.0), |(sum, total), (family, value)| {
            let weight = table.weight(*family);
            (sum + value * weight, total + weight)
        });
    if total > 0.0 {
        sum / total
    } else {
        0.0
    }
}

fn weighted_std_dev(
    table: &WeightTable,
    families: &BTreeMap<IndicatorFamily, f64>,
    mean: f64,
) -> f64 {
    let (sum, total) = families
        .iter()
        .fold((0.0, 0.0), |(sum, total), (family, value)| {
            let weight = table.weight(*family);
            (sum + weight * (value - mean).powi(2), total + weight)
        });
    if total > 0.0 {
        (sum / total).sqrt()
    } else {
        0.0
    }
}

fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}
