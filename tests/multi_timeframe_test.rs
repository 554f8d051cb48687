//! Multi-timeframe combination through the public engine API.

mod common;

use augur::config::{EngineConfig, TimeframeWeights};
use augur::services::{AnalysisEngine, MultiTimeframeCombiner};
use augur::types::{Sentiment, SentimentResult, SentimentStrength, Timeframe};
use common::*;

fn sentiment(overall: Sentiment, score: f64, confidence: f64) -> SentimentResult {
    SentimentResult {
        overall,
        strength: SentimentStrength::Moderate,
        confidence,
        score,
        snapshot: None,
    }
}

#[test]
fn test_combined_score_is_weighted_average() {
    let engine = AnalysisEngine::default();
    let report = engine.analyze_multi_timeframe(
        "ETH-USDT",
        &[
            (Timeframe::OneHour, series(uptrend(120))),
            (Timeframe::OneDay, series(downtrend(120))),
        ],
    );
    assert!(!report.is_error());

    let breakdown = report.multi_timeframe.as_ref().unwrap();
    assert_eq!(breakdown.timeframes.len(), 2);
    assert!(breakdown.skipped.is_empty());

    let hourly = &breakdown.timeframes[0];
    let daily = &breakdown.timeframes[1];
    assert_eq!(hourly.timeframe, Timeframe::OneHour);
    assert_eq!(hourly.weight, 1.0);
    assert_eq!(daily.weight, 2.0);
    assert!(hourly.sentiment.score > daily.sentiment.score);

    let expected = (hourly.sentiment.score + 2.0 * daily.sentiment.score) / 3.0;
    assert!((breakdown.combined.score - expected).abs() < 1e-9);
    assert_eq!(report.sentiment.score, breakdown.combined.score);
    // Snapshot of the primary timeframe survives the merge
    assert!(report.sentiment.snapshot.is_some());
}

#[test]
fn test_primary_timeframe_from_config() {
    let config = EngineConfig {
        primary_timeframe: Timeframe::FourHours,
        ..EngineConfig::default()
    };
    let report = AnalysisEngine::new(config).analyze_multi_timeframe(
        "SOL-USDT",
        &[
            (Timeframe::OneHour, series(uptrend(120))),
            (Timeframe::FourHours, series(uptrend(80))),
        ],
    );
    assert_eq!(report.timeframe, Some(Timeframe::FourHours));
    assert_eq!(report.price, uptrend(80)[79].close);
}

#[test]
fn test_short_timeframes_skipped() {
    let report = AnalysisEngine::default().analyze_multi_timeframe(
        "SOL-USDT",
        &[
            (Timeframe::FiveMinutes, series(uptrend(30))),
            (Timeframe::OneHour, series(uptrend(120))),
        ],
    );
    let breakdown = report.multi_timeframe.unwrap();
    assert_eq!(breakdown.skipped, vec![Timeframe::FiveMinutes]);
    assert_eq!(breakdown.timeframes.len(), 1);
}

#[test]
fn test_all_timeframes_too_short() {
    let report = AnalysisEngine::default().analyze_multi_timeframe(
        "SOL-USDT",
        &[(Timeframe::OneHour, series(uptrend(10)))],
    );
    assert_eq!(report.error.as_deref(), Some("No valid analysis available"));
    assert_eq!(report.sentiment.overall, Sentiment::Neutral);
}

#[test]
fn test_custom_timeframe_weights() {
    let mut weights = TimeframeWeights::default();
    weights.weights.insert(Timeframe::OneHour, 3.0);
    let combiner = MultiTimeframeCombiner::new(weights, Default::default());
    let combined = combiner.combine(&[
        (Timeframe::OneHour, sentiment(Sentiment::Buy, 0.4, 0.9)),
        (Timeframe::OneDay, sentiment(Sentiment::Sell, -0.4, 0.9)),
    ]);
    // (0.4 * 3 - 0.4 * 2) / 5
    assert!((combined.score - 0.08).abs() < 1e-9);
    assert_eq!(combined.overall, Sentiment::Buy);
    assert_eq!(combined.strength, SentimentStrength::Weak);
    assert!((combined.confidence - 0.45).abs() < 1e-9);
}
