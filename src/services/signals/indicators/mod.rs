//! Technical indicator implementations.

pub mod adx;
pub mod bollinger;
pub mod candlestick;
pub mod ema;
pub mod fibonacci;
pub mod macd;
pub mod obv;
pub mod rsi;
pub mod sma;
pub mod stochastic;

pub use adx::Adx;
pub use bollinger::BollingerBands;
pub use candlestick::Candlestick;
pub use ema::Ema;
pub use fibonacci::FibonacciRetracement;
pub use macd::Macd;
pub use obv::Obv;
pub use rsi::Rsi;
pub use sma::Sma;
pub use stochastic::Stochastic;

use super::Signal;
use crate::config::IndicatorSettings;

/// Get all available indicators with default settings.
pub fn all_indicators() -> Vec<Box<dyn Signal>> {
    from_settings(&IndicatorSettings::default())
}

/// Build the enabled indicators, one per configured moving-average window.
pub fn from_settings(settings: &IndicatorSettings) -> Vec<Box<dyn Signal>> {
    let mut indicators: Vec<Box<dyn Signal>> = Vec::new();

    // Trend indicators
    if settings.sma.enabled {
        for &window in &settings.sma.windows {
            indicators.push(Box::new(
                Sma::new(window.max(1)).with_slope_lookback(settings.sma.slope_lookback),
            ));
        }
    }
    if settings.ema.enabled {
        for &window in &settings.ema.windows {
            indicators.push(Box::new(
                Ema::new(window.max(1)).with_slope_lookback(settings.ema.slope_lookback),
            ));
        }
    }
    if settings.macd.enabled {
        indicators.push(Box::new(Macd::from_settings(&settings.macd)));
    }
    if settings.adx.enabled {
        indicators.push(Box::new(Adx::from_settings(&settings.adx)));
    }

    // Momentum indicators
    if settings.rsi.enabled {
        indicators.push(Box::new(Rsi::from_settings(&settings.rsi)));
    }
    if settings.stochastic.enabled {
        indicators.push(Box::new(Stochastic::from_settings(&settings.stochastic)));
    }

    // Volatility indicators
    if settings.bollinger.enabled {
        indicators.push(Box::new(BollingerBands::from_settings(&settings.bollinger)));
    }

    // Volume indicators
    if settings.obv.enabled {
        indicators.push(Box::new(Obv::from_settings(&settings.obv)));
    }

    // Price structure
    if settings.fibonacci.enabled {
        indicators.push(Box::new(FibonacciRetracement::from_settings(
            &settings.fibonacci,
        )));
    }
    if settings.candlestick.enabled {
        indicators.push(Box::new(Candlestick::from_settings(&settings.candlestick)));
    }

    indicators
}
