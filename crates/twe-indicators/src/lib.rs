//! twe-indicators
//!
//! Stateless numeric primitives shared by the strategy population
//!. Every function here is a pure computation over
//! a slice of already-known bars/prices — no internal state, no I/O, no
//! clock access. Strategies own the rolling window of recent bars
//! themselves and call back into this crate each time a new bar arrives;
//! that keeps warm-up behaviour and determinism trivially easy to test in
//! isolation from any particular strategy.
//!
//! All functions return `None` when the input slice is shorter than the
//! window they need — callers treat that as "still warming up" per
//!.

mod moving_average;
mod oscillators;
mod pivot;
mod trend;
mod volatility;

pub use moving_average::{ema, ema_series, sma};
pub use oscillators::{aroon, balance_of_power, macd, rsi, stochastic, Aroon, Macd, Stochastic};
pub use pivot::{pivot_points, PivotPoints};
pub use trend::{adx, Adx};
pub use volatility::{atr, bollinger_bands, keltner_channel, BollingerBands, KeltnerChannel};

use twe_schemas::Bar;

/// Simple % change over `lookback` bars: `(close[-1] - close[-1-lookback]) / close[-1-lookback]`.
pub fn momentum_pct(closes: &[f64], lookback: usize) -> Option<f64> {
    if lookback == 0 || closes.len() <= lookback {
        return None;
    }
    let last = *closes.last()?;
    let prior = closes[closes.len() - 1 - lookback];
    if prior == 0.0 {
        return None;
    }
    Some((last - prior) / prior)
}

/// Extract closing prices from a bar window, oldest first.
pub fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}
