use anyhow::Context;
use augur::config::Config;
use augur::services::{AnalysisEngine, BatchAnalyzer, SymbolData};
use augur::types::{CandleSeries, Timeframe};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "augur=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config = Config::from_env();
    let engine_config = config
        .engine_config()
        .context("Failed to load engine config")?;
    info!(
        "Starting Augur on {} (max concurrency {})",
        config.candles_dir.display(),
        config.max_concurrency
    );

    let jobs = load_symbols(&config.candles_dir).await?;
    if jobs.is_empty() {
        warn!("No candle files found in {}", config.candles_dir.display());
    }

    let batch = BatchAnalyzer::new(AnalysisEngine::new(engine_config), config.max_concurrency);
    let reports = batch.analyze_all(jobs.clone()).await;
    let failed = reports.iter().filter(|r| r.is_error()).count();
    info!(
        "Analyzed {} symbols ({} failed)",
        reports.len(),
        failed
    );

    let mut output = json!({ "reports": reports });
    if config.run_backtest {
        let backtests = batch.backtest_all(jobs).await;
        for report in &backtests {
            info!("{}", report.summary());
        }
        output["backtests"] = serde_json::to_value(&backtests)?;
    }

    let rendered = serde_json::to_string_pretty(&output)?;
    match &config.output_path {
        Some(path) => {
            tokio::fs::write(path, rendered)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Reports written to {}", path.display());
        }
        None => println!("{}", rendered),
    }

    Ok(())
}

/// Group `<SYMBOL>_<timeframe>.json` files into one job per symbol.
async fn load_symbols(dir: &Path) -> anyhow::Result<Vec<SymbolData>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to read candle directory {}", dir.display()))?;

    let mut symbols: BTreeMap<String, SymbolData> = BTreeMap::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let Some((symbol, timeframe)) = stem
            .rsplit_once('_')
            .and_then(|(symbol, tf)| Timeframe::from_str(tf).map(|tf| (symbol, tf)))
        else {
            warn!("Skipping {}: expected <SYMBOL>_<timeframe>.json", path.display());
            continue;
        };

        let raw = tokio::fs::read_to_string(&path).await?;
        let series = match serde_json::from_str::<Vec<Vec<Value>>>(&raw)
            .map_err(anyhow::Error::from)
            .and_then(|rows| CandleSeries::from_rows(&rows).map_err(anyhow::Error::from))
        {
            Ok(series) => series,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };

        let symbol = symbol.to_uppercase();
        let data = symbols
            .remove(&symbol)
            .unwrap_or_else(|| SymbolData::new(symbol.clone()));
        symbols.insert(symbol, data.with_timeframe(timeframe, series));
    }

    Ok(symbols.into_values().collect())
}
