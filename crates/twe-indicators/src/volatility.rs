use crate::moving_average::sma;

/// Average True Range(period), Wilder-style simple average of true range.
pub fn atr(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Option<f64> {
    if highs.len() != lows.len() || lows.len() != closes.len() || closes.len() < period + 1 {
        return None;
    }
    let mut trs = Vec::with_capacity(closes.len() - 1);
    for i in 1..closes.len() {
        let hl = highs[i] - lows[i];
        let hc = (highs[i] - closes[i - 1]).abs();
        let lc = (lows[i] - closes[i - 1]).abs();
        trs.push(hl.max(hc).max(lc));
    }
    sma(&trs, period)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Bollinger Bands: SMA(period) +/- `num_std` standard deviations.
pub fn bollinger_bands(closes: &[f64], period: usize, num_std: f64) -> Option<BollingerBands> {
    let middle = sma(closes, period)?;
    let window = &closes[closes.len() - period..];
    let variance = window.iter().map(|c| (c - middle).powi(2)).sum::<f64>() / period as f64;
    let std = variance.sqrt();
    Some(BollingerBands {
        upper: middle + num_std * std,
        middle,
        lower: middle - num_std * std,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeltnerChannel {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Keltner Channel: EMA(period) +/- `atr_multiplier` * ATR(period).
pub fn keltner_channel(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    period: usize,
    atr_multiplier: f64,
) -> Option<KeltnerChannel> {
    let middle = crate::moving_average::ema(closes, period)?;
    let a = atr(highs, lows, closes, period)?;
    Some(KeltnerChannel {
        upper: middle + atr_multiplier * a,
        middle,
        lower: middle - atr_multiplier * a,
    })
}
