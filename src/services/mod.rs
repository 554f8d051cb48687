pub mod backtester;
pub mod batch;
pub mod engine;
pub mod multi_timeframe;
pub mod sentiment;
pub mod signals;
pub mod synthetic;

pub use backtester::{BacktestError, Backtester, SentimentSource};
pub use batch::{BatchAnalyzer, SymbolData};
pub use engine::AnalysisEngine;
pub use multi_timeframe::MultiTimeframeCombiner;
pub use sentiment::SentimentAggregator;
pub use signals::Signal;
pub use synthetic::{ConditionEvaluation, MarketCondition};
