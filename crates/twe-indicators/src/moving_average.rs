/// Simple moving average of the last `period` values. `None` until warmed up.
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[values.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

/// Exponential moving average recomputed over the whole slice, seeded by the
/// SMA of the first `period` values. Deterministic and side-effect free —
/// recomputing from the same slice twice always yields the same number.
pub fn ema(values: &[f64], period: usize) -> Option<f64> {
    ema_series(values, period)?.last().copied()
}

/// Full EMA series (same length as the warmed-up tail, i.e. `values.len() -
/// period + 1` points), for callers that need successive values (e.g. MACD).
pub fn ema_series(values: &[f64], period: usize) -> Option<Vec<f64>> {
    if period == 0 || values.len() < period {
        return None;
    }
    let alpha = 2.0 / (period as f64 + 1.0);
    let seed = values[..period].iter().sum::<f64>() / period as f64;
    let mut out = Vec::with_capacity(values.len() - period + 1);
    out.push(seed);
    let mut prev = seed;
    for v in &values[period..] {
        let next = alpha * v + (1.0 - alpha) * prev;
        out.push(next);
        prev = next;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_warms_up() {
        assert_eq!(sma(&[1.0, 2.0], 3), None);
    }

    #[test]
    fn sma_matches_mean() {
        assert_eq!(sma(&[1.0, 2.0, 3.0], 3), Some(2.0));
        assert_eq!(sma(&[10.0, 1.0, 2.0, 3.0], 3), Some(2.0));
    }

    #[test]
    fn ema_seeds_with_sma_then_decays() {
        let series = vec![10.0, 10.0, 10.0, 20.0];
        let e = ema(&series, 3).unwrap();
        // seed = 10, alpha = 0.5 -> next = 0.5*20 + 0.5*10 = 15
        assert!((e - 15.0).abs() < 1e-9);
    }
}
