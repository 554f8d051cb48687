use thiserror::Error;

/// Analysis error types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Insufficient data for {indicator}: need {need} candles, got {got}")]
    InsufficientData {
        indicator: String,
        need: usize,
        got: usize,
    },

    #[error("{indicator} computation failed: {reason}")]
    IndicatorComputation { indicator: String, reason: String },

    #[error("Invalid candle series: {0}")]
    InvalidSeries(String),
}

impl AnalysisError {
    pub fn insufficient(indicator: impl Into<String>, need: usize, got: usize) -> Self {
        Self::InsufficientData {
            indicator: indicator.into(),
            need,
            got,
        }
    }

    pub fn computation(indicator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::IndicatorComputation {
            indicator: indicator.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
