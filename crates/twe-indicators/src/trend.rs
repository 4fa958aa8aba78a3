/// ADX(period) plus the DI+ / DI- lines, Wilder's smoothing. Used by
/// RegimeClassifier (trending vs ranging) and ADX-trend strategies alike.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adx {
    pub adx: f64,
    pub di_plus: f64,
    pub di_minus: f64,
}

pub fn adx(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Option<Adx> {
    let n = highs.len();
    if n != lows.len() || n != closes.len() || n < period * 2 + 1 {
        return None;
    }

    let mut plus_dm = Vec::with_capacity(n - 1);
    let mut minus_dm = Vec::with_capacity(n - 1);
    let mut tr = Vec::with_capacity(n - 1);
    for i in 1..n {
        let up_move = highs[i] - highs[i - 1];
        let down_move = lows[i - 1] - lows[i];
        plus_dm.push(if up_move > down_move && up_move > 0.0 { up_move } else { 0.0 });
        minus_dm.push(if down_move > up_move && down_move > 0.0 { down_move } else { 0.0 });
        let hl = highs[i] - lows[i];
        let hc = (highs[i] - closes[i - 1]).abs();
        let lc = (lows[i] - closes[i - 1]).abs();
        tr.push(hl.max(hc).max(lc));
    }

    let wilder_smooth = |series: &[f64], period: usize| -> Vec<f64> {
        let mut out = Vec::with_capacity(series.len() - period + 1);
        let seed: f64 = series[..period].iter().sum();
        out.push(seed);
        for v in &series[period..] {
            let prev = *out.last().unwrap();
            out.push(prev - prev / period as f64 + v);
        }
        out
    };

    let smoothed_plus_dm = wilder_smooth(&plus_dm, period);
    let smoothed_minus_dm = wilder_smooth(&minus_dm, period);
    let smoothed_tr = wilder_smooth(&tr, period);

    let len = smoothed_tr.len();
    let mut dx_series = Vec::with_capacity(len);
    let mut di_plus_last = 0.0;
    let mut di_minus_last = 0.0;
    for i in 0..len {
        let trv = smoothed_tr[i];
        if trv <= 0.0 {
            dx_series.push(0.0);
            continue;
        }
        let di_plus = 100.0 * smoothed_plus_dm[i] / trv;
        let di_minus = 100.0 * smoothed_minus_dm[i] / trv;
        di_plus_last = di_plus;
        di_minus_last = di_minus;
        let sum = di_plus + di_minus;
        let dx = if sum > 0.0 { 100.0 * (di_plus - di_minus).abs() / sum } else { 0.0 };
        dx_series.push(dx);
    }

    if dx_series.len() < period {
        return None;
    }
    let adx_value = dx_series[dx_series.len() - period..].iter().sum::<f64>() / period as f64;

    Some(Adx {
        adx: adx_value,
        di_plus: di_plus_last,
        di_minus: di_minus_last,
    })
}
