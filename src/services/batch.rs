//! Batch runner for many symbols.
//!
//! Analyses run on the blocking pool, capped by a semaphore. The latest
//! report per symbol is kept for lookup.

use crate::services::engine::AnalysisEngine;
use crate::types::{AnalysisReport, BacktestReport, CandleSeries, Timeframe};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// Candle series for one symbol, one entry per timeframe.
#[derive(Debug, Clone)]
pub struct SymbolData {
    pub symbol: String,
    pub timeframes: Vec<(Timeframe, CandleSeries)>,
}

impl SymbolData {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            timeframes: Vec::new(),
        }
    }

    pub fn with_timeframe(mut self, timeframe: Timeframe, series: CandleSeries) -> Self {
        self.timeframes.push((timeframe, series));
        self
    }

    /// Single-timeframe analysis when only one series exists, combined otherwise.
    fn analyze(&self, engine: &AnalysisEngine) -> AnalysisReport {
        match self.timeframes.as_slice() {
            [] => AnalysisReport::failed(&self.symbol, None, "No candle data"),
            [(timeframe, series)] => {
                let mut report = engine.analyze(&self.symbol, series);
                report.timeframe = Some(*timeframe);
                report
            }
            all => engine.analyze_multi_timeframe(&self.symbol, all),
        }
    }

    /// Series used for backtesting: the primary timeframe, else the longest.
    pub fn backtest_series(&self, primary: Timeframe) -> Option<&CandleSeries> {
        self.timeframes
            .iter()
            .find(|(tf, _)| *tf == primary)
            .or_else(|| self.timeframes.iter().max_by_key(|(_, s)| s.len()))
            .map(|(_, s)| s)
    }
}

pub struct BatchAnalyzer {
    engine: Arc<AnalysisEngine>,
    limit: Arc<Semaphore>,
    /// Latest analysis per symbol.
    reports: DashMap<String, AnalysisReport>,
    /// Latest backtest per symbol.
    backtests: DashMap<String, BacktestReport>,
}

impl BatchAnalyzer {
    pub fn new(engine: AnalysisEngine, max_concurrency: usize) -> Arc<Self> {
        Arc::new(Self {
            engine: Arc::new(engine),
            limit: Arc::new(Semaphore::new(max_concurrency.max(1))),
            reports: DashMap::new(),
            backtests: DashMap::new(),
        })
    }

    pub fn engine(&self) -> &AnalysisEngine {
        &self.engine
    }

    /// Analyze every symbol; reports come back in input order.
    pub async fn analyze_all(&self, jobs: Vec<SymbolData>) -> Vec<AnalysisReport> {
        info!("Starting batch analysis for {} symbols", jobs.len());

        let mut handles = Vec::with_capacity(jobs.len());
        for job in jobs {
            let permit = match self.limit.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    warn!("Batch limiter closed: {}", e);
                    break;
                }
            };
            let engine = Arc::clone(&self.engine);
            let symbol = job.symbol.clone();
            let handle = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                job.analyze(&engine)
            });
            handles.push((symbol, handle));
        }

        let mut reports = Vec::with_capacity(handles.len());
        for (symbol, handle) in handles {
            let report = match handle.await {
                Ok(report) => report,
                Err(e) => {
                    warn!("Analysis task for {} failed: {}", symbol, e);
                    AnalysisReport::failed(&symbol, None, e.to_string())
                }
            };
            self.reports.insert(symbol, report.clone());
            reports.push(report);
        }
        reports
    }

    /// Backtest every symbol on its primary timeframe; reports come back in
    /// input order, with `error` set where no backtest could run.
    pub async fn backtest_all(&self, jobs: Vec<SymbolData>) -> Vec<BacktestReport> {
        let primary = self.engine.config().primary_timeframe;
        let mut handles = Vec::with_capacity(jobs.len());
        for job in jobs {
            let symbol = job.symbol.clone();
            let Some(series) = job.backtest_series(primary).cloned() else {
                warn!("No candle data to backtest {}", symbol);
                handles.push((symbol, None));
                continue;
            };
            let permit = match self.limit.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    warn!("Batch limiter closed: {}", e);
                    break;
                }
            };
            let engine = Arc::clone(&self.engine);
            let handle = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                engine.backtest(&job.symbol, &series)
            });
            handles.push((symbol, Some(handle)));
        }

        let mut reports = Vec::with_capacity(handles.len());
        for (symbol, handle) in handles {
            let report = match handle {
                Some(handle) => match handle.await {
                    Ok(report) => report,
                    Err(e) => {
                        warn!("Backtest task for {} failed: {}", symbol, e);
                        self.failed_backtest(&symbol, e.to_string())
                    }
                },
                None => self.failed_backtest(&symbol, "No candle data"),
            };
            self.backtests.insert(symbol, report.clone());
            reports.push(report);
        }
        reports
    }

    fn failed_backtest(&self, symbol: &str, error: impl Into<String>) -> BacktestReport {
        let settings = &self.engine.config().backtest;
        let mut report = BacktestReport::new(
            symbol,
            settings.lookback,
            settings.forward,
            settings.neutral_threshold_pct,
        );
        report.error = Some(error.into());
        report
    }

    pub fn report(&self, symbol: &str) -> Option<AnalysisReport> {
        self.reports.get(symbol).map(|r| r.clone())
    }

    pub fn backtest(&self, symbol: &str) -> Option<BacktestReport> {
        self.backtests.get(symbol).map(|r| r.clone())
    }

    /// Symbols with a stored analysis, sorted.
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.reports.iter().map(|e| e.key().clone()).collect();
        symbols.sort();
        symbols
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BacktestSettings, EngineConfig};
    use crate::services::signals::testing::*;

    fn series(count: usize) -> CandleSeries {
        CandleSeries::new(create_uptrend_candles(count)).unwrap()
    }

    #[tokio::test]
    async fn test_analyze_all_keeps_order_and_board() {
        let batch = BatchAnalyzer::new(AnalysisEngine::default(), 2);
        let jobs = vec![
            SymbolData::new("AAA").with_timeframe(Timeframe::OneHour, series(120)),
            SymbolData::new("BBB").with_timeframe(Timeframe::OneHour, series(50)),
            SymbolData::new("CCC")
                .with_timeframe(Timeframe::OneHour, series(120))
                .with_timeframe(Timeframe::OneDay, series(110)),
        ];

        let reports = batch.analyze_all(jobs).await;
        assert_eq!(
            reports.iter().map(|r| r.symbol.as_str()).collect::<Vec<_>>(),
            vec!["AAA", "BBB", "CCC"]
        );
        assert_eq!(reports[0].timeframe, Some(Timeframe::OneHour));
        assert!(reports[1].is_error());
        assert!(reports[2].multi_timeframe.is_some());
        assert_eq!(batch.symbols(), vec!["AAA", "BBB", "CCC"]);
        assert!(batch.report("AAA").is_some());
        assert!(batch.report("ZZZ").is_none());
    }

    #[tokio::test]
    async fn test_empty_job_reports_error() {
        let batch = BatchAnalyzer::new(AnalysisEngine::default(), 1);
        let reports = batch.analyze_all(vec![SymbolData::new("NONE")]).await;
        assert_eq!(reports[0].error.as_deref(), Some("No candle data"));
    }

    #[tokio::test]
    async fn test_backtest_all() {
        let config = EngineConfig {
            backtest: BacktestSettings {
                lookback: 60,
                forward: 5,
                neutral_threshold_pct: 1.0,
            },
            ..EngineConfig::default()
        };
        let batch = BatchAnalyzer::new(AnalysisEngine::new(config), 4);
        let reports = batch
            .backtest_all(vec![
                SymbolData::new("UP").with_timeframe(Timeframe::OneHour, series(80)),
                SymbolData::new("EMPTY"),
            ])
            .await;
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].overall.total, 16);
        assert!(batch.backtest("UP").is_some());
        assert_eq!(reports[1].symbol, "EMPTY");
        assert_eq!(reports[1].error.as_deref(), Some("No candle data"));
        assert_eq!(reports[1].overall.total, 0);
    }
}
