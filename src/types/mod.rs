pub mod analysis;
pub mod backtest;
pub mod candle;
pub mod sentiment;
pub mod signals;

pub use analysis::*;
pub use backtest::*;
pub use candle::*;
pub use sentiment::*;
pub use signals::*;

/// Replace NaN and infinities with 0 so values always serialize as numbers.
pub fn finite(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
