//! twe-regime — RegimeClassifier.
//!
//! Classifies a symbol's recent behaviour from its bar history into one of
//! five regimes, and maps that regime to a per-strategy-family fitness score
//! and a position-size scale factor. Pure function over a bar slice: no
//! state, no I/O. Callers (TradingEngine's veto chain) supply the last
//! `MIN_BARS` bars of the symbol on every tick.

mod mapper;

pub use mapper::{position_scale_factor, StrategyFamily};

use twe_indicators::{adx, closes, sma};
use twe_schemas::Bar;

/// Minimum bar history RegimeClassifier needs ("last ≥200 bars").
pub const MIN_BARS: usize = 200;

const ADX_PERIOD: usize = 14;
const VOL_LOOKBACK_DAYS: usize = 20;
const DRAWDOWN_LOOKBACK: usize = 60;
const ADX_TREND_THRESHOLD: f64 = 25.0;
const ADX_RANGE_THRESHOLD: f64 = 20.0;
const CRISIS_VOL: f64 = 0.50;
const CRISIS_DRAWDOWN: f64 = 0.15;
const HIGH_VOL: f64 = 0.30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Regime {
    TrendingUp,
    TrendingDown,
    Ranging,
    HighVolatility,
    Crisis,
}

impl Regime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Regime::TrendingUp => "TRENDING_UP",
            Regime::TrendingDown => "TRENDING_DOWN",
            Regime::Ranging => "RANGING",
            Regime::HighVolatility => "HIGH_VOLATILITY",
            Regime::Crisis => "CRISIS",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegimeAssessment {
    pub regime: Regime,
    pub adx: f64,
    pub annualized_volatility: f64,
    pub sma_50: f64,
    pub sma_200: f64,
    pub drawdown_from_peak: f64,
}

/// Annualized volatility of 20-day log returns: `stdev(log returns) * sqrt(252)`.
fn annualized_volatility(prices: &[f64], lookback: usize) -> Option<f64> {
    if prices.len() < lookback + 1 {
        return None;
    }
    let tail = &prices[prices.len() - lookback - 1..];
    let log_returns: Vec<f64> = tail
        .windows(2)
        .map(|w| (w[1] / w[0]).ln())
        .collect();
    let mean = log_returns.iter().sum::<f64>() / log_returns.len() as f64;
    let variance = log_returns
        .iter()
        .map(|r| (r - mean).powi(2))
        .sum::<f64>()
        / log_returns.len() as f64;
    Some(variance.sqrt() * (252.0_f64).sqrt())
}

/// Drawdown from the peak close over the last `lookback` bars, as a
/// positive fraction (0.15 == -15%).
fn drawdown_from_peak(prices: &[f64], lookback: usize) -> f64 {
    let n = prices.len();
    let start = n.saturating_sub(lookback);
    let window = &prices[start..];
    let peak = window.iter().cloned().fold(f64::MIN, f64::max);
    let last = *prices.last().unwrap_or(&peak);
    if peak <= 0.0 {
        return 0.0;
    }
    ((peak - last) / peak).max(0.0)
}

/// Classify the most recent regime from a symbol's bar history, in strict
/// ascending timestamp order. `None` while warming up (fewer than
/// [`MIN_BARS`] bars).
pub fn classify(bars: &[Bar]) -> Option<RegimeAssessment> {
    if bars.len() < MIN_BARS {
        return None;
    }
    let price_series = closes(bars);
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();

    let adx_result = adx(&highs, &lows, &price_series, ADX_PERIOD)?;
    let vol = annualized_volatility(&price_series, VOL_LOOKBACK_DAYS)?;
    let sma_50 = sma(&price_series, 50)?;
    let sma_200 = sma(&price_series, 200)?;
    let dd = drawdown_from_peak(&price_series, DRAWDOWN_LOOKBACK);

 // Classification priority: CRISIS > HIGH_VOLATILITY >
    // TRENDING_UP/DOWN > RANGING.
    let regime = if vol > CRISIS_VOL || dd > CRISIS_DRAWDOWN {
        Regime::Crisis
    } else if vol > HIGH_VOL {
        Regime::HighVolatility
    } else if adx_result.adx >= ADX_TREND_THRESHOLD {
        if adx_result.di_plus >= adx_result.di_minus && sma_50 >= sma_200 {
            Regime::TrendingUp
        } else if adx_result.di_minus > adx_result.di_plus && sma_50 < sma_200 {
            Regime::TrendingDown
        } else {
            // DI/MA disagree on direction — treat as ranging rather than guess.
            Regime::Ranging
        }
    } else if adx_result.adx < ADX_RANGE_THRESHOLD {
        Regime::Ranging
    } else {
        Regime::Ranging
    };

    Some(RegimeAssessment {
        regime,
        adx: adx_result.adx,
        annualized_volatility: vol,
        sma_50,
        sma_200,
        drawdown_from_peak: dd,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use twe_schemas::Timeframe;

    fn make_bars(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                Bar::new(
                    "2330",
                    Timeframe::D1,
                    Utc.timestamp_opt(1_600_000_000 + i as i64 * 86_400, 0).unwrap(),
                    c,
                    c * 1.01,
                    c * 0.99,
                    c,
                    1_000,
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn warms_up_below_min_bars() {
        let bars = make_bars(&vec![100.0; 50]);
        assert_eq!(classify(&bars), None);
    }

    #[test]
    fn steady_uptrend_classifies_trending_up() {
        let closes: Vec<f64> = (0..220).map(|i| 100.0 + i as f64 * 0.3).collect();
        let bars = make_bars(&closes);
        let result = classify(&bars).unwrap();
        assert_eq!(result.regime, Regime::TrendingUp);
    }

    #[test]
    fn crashing_series_classifies_crisis() {
        let mut closes: Vec<f64> = vec![100.0; 150];
        // Sharp crash in the last 60 bars.
        for i in 0..70 {
            closes.push(100.0 - i as f64 * 1.0);
        }
        let bars = make_bars(&closes);
        let result = classify(&bars).unwrap();
        assert_eq!(result.regime, Regime::Crisis);
    }
}
