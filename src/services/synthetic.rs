//! Synthetic market conditions.
//!
//! Seeded candle generators for known regimes and a sliding-window
//! evaluation of how the engine reads them.

use crate::services::engine::AnalysisEngine;
use crate::types::{Candle, Sentiment, SentimentStrength, Timeframe};
use chrono::{Duration, TimeZone, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

const START_PRICE: f64 = 100.0;
const START_TIMESTAMP: i64 = 1_700_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketCondition {
    Bull,
    Bear,
    Sideways,
    Volatile,
}

impl MarketCondition {
    pub const ALL: [MarketCondition; 4] = [Self::Bull, Self::Bear, Self::Sideways, Self::Volatile];

    /// Per-candle drift and half-width of the uniform noise, as fractions.
    fn drift_and_noise(&self) -> (f64, f64) {
        match self {
            Self::Bull => (0.004, 0.01),
            Self::Bear => (-0.004, 0.01),
            Self::Sideways => (0.0, 0.008),
            Self::Volatile => (0.0, 0.04),
        }
    }

    /// Sentiment mix a well-behaved engine should produce.
    pub fn expected_distribution(&self) -> [(Sentiment, f64); 3] {
        let (buy, neutral, sell) = match self {
            Self::Bull => (0.7, 0.2, 0.1),
            Self::Bear => (0.1, 0.2, 0.7),
            Self::Sideways => (0.3, 0.4, 0.3),
            Self::Volatile => (0.4, 0.2, 0.4),
        };
        [
            (Sentiment::Buy, buy),
            (Sentiment::Neutral, neutral),
            (Sentiment::Sell, sell),
        ]
    }
}

/// `count` hourly candles for `condition`, reproducible from `seed`.
pub fn generate(condition: MarketCondition, count: usize, seed: u64) -> Vec<Candle> {
    let mut rng = StdRng::seed_from_u64(seed);
    let (drift, noise) = condition.drift_and_noise();
    let start = Utc
        .timestamp_opt(START_TIMESTAMP, 0)
        .single()
        .unwrap_or_else(Utc::now);
    let step = Duration::seconds(Timeframe::OneHour.seconds());

    let mut candles = Vec::with_capacity(count);
    let mut close = START_PRICE;
    for i in 0..count {
        let open = close;
        // Sideways markets pull back toward the starting price
        let pull = if condition == MarketCondition::Sideways {
            (START_PRICE - close) / START_PRICE * 0.1
        } else {
            0.0
        };
        close = (open * (1.0 + drift + pull + rng.gen_range(-noise..noise))).max(0.01);

        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.005));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.005));
        let volume = rng.gen_range(1_000.0..100_000.0);
        candles.push(Candle::new(
            start + step * i as i32,
            open,
            high,
            low,
            close,
            volume,
        ));
    }
    candles
}

/// How the engine's sentiments over a regime compare to the expected mix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionEvaluation {
    pub condition: MarketCondition,
    pub total_analyses: usize,
    pub sentiment_distribution: BTreeMap<Sentiment, f64>,
    pub strength_distribution: BTreeMap<SentimentStrength, f64>,
    pub average_confidence: f64,
    /// 1 minus the total variation distance to the expected mix.
    pub appropriateness: f64,
}

/// Analyze every `step`-th window of `window` candles and tally the sentiments.
pub fn evaluate(
    engine: &AnalysisEngine,
    symbol: &str,
    condition: MarketCondition,
    candles: &[Candle],
    window: usize,
    step: usize,
) -> ConditionEvaluation {
    let mut sentiments: BTreeMap<Sentiment, f64> = BTreeMap::new();
    let mut strengths: BTreeMap<SentimentStrength, f64> = BTreeMap::new();
    let mut confidence = 0.0;
    let mut total = 0usize;

    if window > 0 && candles.len() >= window {
        for start in (0..=candles.len() - window).step_by(step.max(1)) {
            let report = engine.analyze(symbol, &candles[start..start + window]);
            if report.is_error() {
                continue;
            }
            *sentiments.entry(report.sentiment.overall).or_default() += 1.0;
            *strengths.entry(report.sentiment.strength).or_default() += 1.0;
            confidence += report.sentiment.confidence;
            total += 1;
        }
    }

    let n = total.max(1) as f64;
    sentiments.values_mut().for_each(|v| *v /= n);
    strengths.values_mut().for_each(|v| *v /= n);

    let distance = condition
        .expected_distribution()
        .iter()
        .map(|(sentiment, expected)| {
            (sentiments.get(sentiment).copied().unwrap_or(0.0) - expected).abs()
        })
        .sum::<f64>()
        / 2.0;
    debug!(
        "{} {:?}: {} windows, distance {:.3}",
        symbol, condition, total, distance
    );

    ConditionEvaluation {
        condition,
        total_analyses: total,
        sentiment_distribution: sentiments,
        strength_distribution: strengths,
        average_confidence: confidence / n,
        appropriateness: if total > 0 { 1.0 - distance } else { 0.0 },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_seeded() {
        let a = generate(MarketCondition::Volatile, 50, 7);
        let b = generate(MarketCondition::Volatile, 50, 7);
        let c = generate(MarketCondition::Volatile, 50, 8);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_generated_candles_are_valid() {
        for condition in MarketCondition::ALL {
            let candles = generate(condition, 200, 42);
            assert_eq!(candles.len(), 200);
            assert!(candles.iter().all(|c| c.validate().is_ok()));
            assert!(candles.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        }
    }

    #[test]
    fn test_trend_direction() {
        let bull = generate(MarketCondition::Bull, 200, 1);
        let bear = generate(MarketCondition::Bear, 200, 1);
        assert!(bull[199].close > bull[0].close * 1.5);
        assert!(bear[199].close < bear[0].close * 0.75);
    }

    #[test]
    fn test_volatile_ranges_wider() {
        let avg_range = |c: &[Candle]| c.iter().map(|c| c.range() / c.close).sum::<f64>() / c.len() as f64;
        let volatile = generate(MarketCondition::Volatile, 200, 3);
        let sideways = generate(MarketCondition::Sideways, 200, 3);
        assert!(avg_range(&volatile) > avg_range(&sideways));
    }

    #[test]
    fn test_evaluate_bull_market() {
        let engine = AnalysisEngine::default();
        let candles = generate(MarketCondition::Bull, 200, 11);
        let eval = evaluate(&engine, "SYN", MarketCondition::Bull, &candles, 120, 10);
        assert_eq!(eval.total_analyses, 9);
        let share = |s: Sentiment| eval.sentiment_distribution.get(&s).copied().unwrap_or(0.0);
        assert!(share(Sentiment::Buy) > share(Sentiment::Sell));
        assert!((0.0..=1.0).contains(&eval.appropriateness));
        assert!((share(Sentiment::Buy) + share(Sentiment::Sell) + share(Sentiment::Neutral) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_evaluate_too_short() {
        let engine = AnalysisEngine::default();
        let candles = generate(MarketCondition::Sideways, 50, 2);
        let eval = evaluate(&engine, "SYN", MarketCondition::Sideways, &candles, 120, 1);
        assert_eq!(eval.total_analyses, 0);
        assert_eq!(eval.appropriateness, 0.0);
    }
}
