//! twe-sizing — PositionSizer.
//!
//! Every method returns a *share count*, already hard-capped at 10% of
//! equity per single position (the universal cap, applied on top
//! of whichever method-specific cap fires first). Callers still owe the lot
//! rounding and `maxPositionPct` clip from step 6 — that's
//! engine-level bookkeeping, not a sizing-method concern.

/// Hard cap applied to every sizing method, regardless of the method's own
/// result.
pub const MAX_POSITION_PCT: f64 = 0.10;

fn cap_shares(shares: f64, equity_twd: f64, price: f64) -> u64 {
    if price <= 0.0 || equity_twd <= 0.0 || !shares.is_finite() || shares <= 0.0 {
        return 0;
    }
    let max_shares = (equity_twd * MAX_POSITION_PCT / price).floor();
    shares.min(max_shares).floor().max(0.0) as u64
}

/// Fixed-risk sizing: risk a fixed `risk_pct` of equity on a trade with a
/// known stop distance (`price - stop_price`, always positive).
pub fn fixed_risk(equity_twd: f64, price: f64, stop_distance: f64, risk_pct: f64) -> u64 {
    if stop_distance <= 0.0 {
        return 0;
    }
    let risk_budget = equity_twd * risk_pct;
    let shares = risk_budget / stop_distance;
    cap_shares(shares, equity_twd, price)
}

/// ATR-based sizing: risk budget split by `multiplier * ATR` distance.
pub fn atr_based(equity_twd: f64, price: f64, atr: f64, risk_pct: f64, multiplier: f64) -> u64 {
    if atr <= 0.0 || multiplier <= 0.0 {
        return 0;
    }
    fixed_risk(equity_twd, price, atr * multiplier, risk_pct)
}

/// Kelly fraction: `winRate - (1 - winRate) / (avgWin / avgLoss)`, clamped
/// to `[0, 1]` (a negative edge sizes to zero rather than shorting the
/// sizing formula itself).
pub fn kelly_fraction(win_rate: f64, avg_win: f64, avg_loss: f64) -> f64 {
    if avg_loss <= 0.0 || avg_win <= 0.0 {
        return 0.0;
    }
    let payoff_ratio = avg_win / avg_loss;
    let f = win_rate - (1.0 - win_rate) / payoff_ratio;
    f.clamp(0.0, 1.0)
}

/// Half-Kelly (the default fraction): half the Kelly fraction of
/// equity, converted to shares at `price`.
pub fn half_kelly(equity_twd: f64, price: f64, win_rate: f64, avg_win: f64, avg_loss: f64) -> u64 {
    let f = kelly_fraction(win_rate, avg_win, avg_loss) * 0.5;
    let shares = equity_twd * f / price.max(f64::EPSILON);
    cap_shares(shares, equity_twd, price)
}

/// Volatility-target sizing: scale a `base_shares` count by
/// `target_vol / current_vol`, clipped to `[0.1, 2.0]`.
pub fn volatility_target(
    equity_twd: f64,
    price: f64,
    base_shares: u64,
    target_vol: f64,
    current_vol: f64,
) -> u64 {
    if current_vol <= 0.0 || target_vol <= 0.0 {
        return 0;
    }
    let ratio = (target_vol / current_vol).clamp(0.1, 2.0);
    let shares = base_shares as f64 * ratio;
    cap_shares(shares, equity_twd, price)
}

/// Inputs a recommender might have on hand; `None` fields degrade the
/// recommendation gracefully per the fallback order.
#[derive(Debug, Clone, Copy, Default)]
pub struct SizingInputs {
    pub win_rate: Option<f64>,
    pub avg_win: Option<f64>,
    pub avg_loss: Option<f64>,
    pub atr: Option<f64>,
    pub atr_multiplier: f64,
    pub risk_pct: f64,
    pub default_stop_distance: f64,
}

/// The recommender picks Half-Kelly when trade statistics are present,
/// ATR-based when only ATR is present, else fixed-risk.
pub fn recommend(equity_twd: f64, price: f64, inputs: &SizingInputs) -> u64 {
    match (inputs.win_rate, inputs.avg_win, inputs.avg_loss) {
        (Some(wr), Some(aw), Some(al)) => half_kelly(equity_twd, price, wr, aw, al),
        _ => match inputs.atr {
            Some(atr) if atr > 0.0 => atr_based(equity_twd, price, atr, inputs.risk_pct, inputs.atr_multiplier.max(1.0)),
            _ => fixed_risk(equity_twd, price, inputs.default_stop_distance, inputs.risk_pct),
        },
    }
}
