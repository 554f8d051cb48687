use super::IndicatorFamily;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Overall market read.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Buy,
    Sell,
    #[default]
    Neutral,
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
            Self::Neutral => write!(f, "neutral"),
        }
    }
}

/// Conviction bucket attached to a sentiment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum SentimentStrength {
    Strong,
    Moderate,
    Weak,
    #[default]
    None,
}

impl fmt::Display for SentimentStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strong => write!(f, "strong"),
            Self::Moderate => write!(f, "moderate"),
            Self::Weak => write!(f, "weak"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Last price and volume at analysis time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub price: f64,
    pub volume: f64,
}

/// Aggregated sentiment over a set of indicator signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SentimentResult {
    pub overall: Sentiment,
    pub strength: SentimentStrength,
    pub confidence: f64,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<MarketSnapshot>,
}

impl SentimentResult {
    /// Neutral, no strength, zero confidence and score.
    pub fn neutral() -> Self {
        Self::default()
    }

    pub fn with_snapshot(mut self, price: f64, volume: f64) -> Self {
        self.snapshot = Some(MarketSnapshot {
            price: super::finite(price),
            volume: super::finite(volume),
        });
        self
    }
}

/// Named weighting policy over indicator families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Momentum,
    MeanReversion,
    Breakout,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Self::Momentum, Self::MeanReversion, Self::Breakout];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Momentum => "Momentum",
            Self::MeanReversion => "Mean Reversion",
            Self::Breakout => "Breakout",
        }
    }
}

/// Score of one strategy over the same signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyScore {
    pub strategy: Strategy,
    pub score: f64,
    pub confidence: f64,
    pub sentiment: Sentiment,
    pub strength: SentimentStrength,
    /// Average signed value per contributing family.
    #[serde(default)]
    pub breakdown: BTreeMap<IndicatorFamily, f64>,
}

/// Candle bucket size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1min")]
    OneMinute,
    #[serde(rename = "5min")]
    FiveMinutes,
    #[serde(rename = "15min")]
    FifteenMinutes,
    #[serde(rename = "30min")]
    ThirtyMinutes,
    #[serde(rename = "1hour")]
    OneHour,
    #[serde(rename = "4hour")]
    FourHours,
    #[serde(rename = "1day")]
    OneDay,
    #[serde(rename = "1week")]
    OneWeek,
}

impl Timeframe {
    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "1min" | "1m" => Some(Self::OneMinute),
            "5min" | "5m" => Some(Self::FiveMinutes),
            "15min" | "15m" => Some(Self::FifteenMinutes),
            "30min" | "30m" => Some(Self::ThirtyMinutes),
            "1hour" | "1h" => Some(Self::OneHour),
            "4hour" | "4h" => Some(Self::FourHours),
            "1day" | "1d" => Some(Self::OneDay),
            "1week" | "1w" => Some(Self::OneWeek),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneMinute => "1min",
            Self::FiveMinutes => "5min",
            Self::FifteenMinutes => "15min",
            Self::ThirtyMinutes => "30min",
            Self::OneHour => "1hour",
            Self::FourHours => "4hour",
            Self::OneDay => "1day",
            Self::OneWeek => "1week",
        }
    }

    /// Bucket length in seconds.
    pub fn seconds(&self) -> i64 {
        match self {
            Self::OneMinute => 60,
            Self::FiveMinutes => 300,
            Self::FifteenMinutes => 900,
            Self::ThirtyMinutes => 1800,
            Self::OneHour => 3600,
            Self::FourHours => 14_400,
            Self::OneDay => 86_400,
            Self::OneWeek => 604_800,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
