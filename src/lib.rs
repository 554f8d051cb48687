//! Augur - technical indicator signals and sentiment aggregation over OHLCV candles

pub mod config;
pub mod error;
pub mod services;
pub mod types;

// Re-export commonly used types
pub use config::{Config, EngineConfig};
pub use error::{AnalysisError, Result};
pub use services::{AnalysisEngine, BatchAnalyzer, Backtester, SymbolData};
pub use types::*;
