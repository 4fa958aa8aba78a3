use crate::moving_average::ema_series;

/// Wilder's RSI(period) over a closing-price series. `None` until `period + 1`
/// closes are available (the first delta needs two prices).
pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }
    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let tail = &deltas[deltas.len() - period..];
    let gain = tail.iter().filter(|d| **d > 0.0).sum::<f64>() / period as f64;
    let loss = tail.iter().filter(|d| **d < 0.0).map(|d| -d).sum::<f64>() / period as f64;
    if loss == 0.0 {
        return Some(100.0);
    }
    let rs = gain / loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Macd {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// MACD(fast, slow, signal) on closing prices. Default (12, 26, 9).
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Option<Macd> {
    if slow <= fast {
        return None;
    }
    let fast_series = ema_series(closes, fast)?;
    let slow_series = ema_series(closes, slow)?;
    // Align both series to the tail shared by both (slow warms up later).
    let offset = fast_series.len().checked_sub(slow_series.len())?;
    let macd_line: Vec<f64> = slow_series
        .iter()
        .enumerate()
        .map(|(i, s)| fast_series[i + offset] - s)
        .collect();
    let signal_series = ema_series(&macd_line, signal)?;
    let macd_last = *macd_line.last()?;
    let signal_last = *signal_series.last()?;
    Some(Macd {
        macd: macd_last,
        signal: signal_last,
        histogram: macd_last - signal_last,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stochastic {
    pub k: f64,
    pub d: f64,
}

/// Stochastic oscillator %K(period)/%D(d_period, SMA of %K).
pub fn stochastic(highs: &[f64], lows: &[f64], closes: &[f64], period: usize, d_period: usize) -> Option<Stochastic> {
    if highs.len() != lows.len() || lows.len() != closes.len() {
        return None;
    }
    let n = closes.len();
    if n < period + d_period - 1 {
        return None;
    }
    let mut k_values = Vec::with_capacity(d_period);
    for end in (n - d_period + 1)..=n {
        let window_highs = &highs[end - period..end];
        let window_lows = &lows[end - period..end];
        let hh = window_highs.iter().cloned().fold(f64::MIN, f64::max);
        let ll = window_lows.iter().cloned().fold(f64::MAX, f64::min);
        let c = closes[end - 1];
        let k = if hh > ll { (c - ll) / (hh - ll) * 100.0 } else { 50.0 };
        k_values.push(k);
    }
    let d = k_values.iter().sum::<f64>() / k_values.len() as f64;
    Some(Stochastic { k: *k_values.last()?, d })
}

/// Balance of power: `(close - open) / (high - low)`, a per-bar momentum
/// ratio; the strategy smooths it over a window with `sma`/`ema` as needed.
pub fn balance_of_power(open: f64, high: f64, low: f64, close: f64) -> Option<f64> {
    let range = high - low;
    if range <= 0.0 {
        return None;
    }
    Some((close - open) / range)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aroon {
    pub up: f64,
    pub down: f64,
}

/// Aroon(period): measures bars since the highest high / lowest low in the
/// lookback window, scaled to `[0, 100]`.
pub fn aroon(highs: &[f64], lows: &[f64], period: usize) -> Option<Aroon> {
    if highs.len() != lows.len() || highs.len() < period + 1 {
        return None;
    }
    let window_h = &highs[highs.len() - period - 1..];
    let window_l = &lows[lows.len() - period - 1..];
    let (idx_hh, _) = window_h
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())?;
    let (idx_ll, _) = window_l
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.partial_cmp(b.1).unwrap())?;
    let bars_since_high = period - idx_hh;
    let bars_since_low = period - idx_ll;
    Some(Aroon {
        up: 100.0 * (period as f64 - bars_since_high as f64) / period as f64,
        down: 100.0 * (period as f64 - bars_since_low as f64) / period as f64,
    })
}
