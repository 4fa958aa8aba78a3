//! Performance-metric and fitness computation.
//!
//! Every bar in a replay is treated as one trading day, matching the
//! teacher's convention of sampling the equity curve once per processed
//! bar; callers feeding in intraday bars get an intraday-scaled Sharpe,
//! which is the same tradeoff the "daily returns x sqrt(252)" note
//! makes for a daily bar series.

use chrono::{DateTime, Utc};
use twe_portfolio::ClosedTrade;

use crate::types::PerformanceMetrics;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

fn bar_returns(equity_curve: &[(DateTime<Utc>, f64)]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .filter_map(|w| {
            let (_, prev) = w[0];
            let (_, next) = w[1];
            if prev.abs() > f64::EPSILON {
                Some((next - prev) / prev)
            } else {
                None
            }
        })
        .collect()
}

fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        0.0
    } else {
        xs.iter().sum::<f64>() / xs.len() as f64
    }
}

fn population_std_dev(xs: &[f64], avg: f64) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let variance = xs.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / xs.len() as f64;
    variance.sqrt()
}

fn max_drawdown_pct(equity_curve: &[(DateTime<Utc>, f64)]) -> f64 {
    let mut peak = f64::MIN;
    let mut max_dd = 0.0;
    for &(_, equity) in equity_curve {
        if equity > peak {
            peak = equity;
        }
        if peak > 0.0 {
            let dd = (peak - equity) / peak * 100.0;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Compute the full metric set for one completed replay.
pub fn compute_metrics(
    initial_capital_twd: f64,
    equity_curve: &[(DateTime<Utc>, f64)],
    closed_trades: &[ClosedTrade],
    hold_bars: &[u64],
) -> PerformanceMetrics {
    let final_equity = equity_curve.last().map(|&(_, e)| e).unwrap_or(initial_capital_twd);
    let total_return_pct = if initial_capital_twd.abs() > f64::EPSILON {
        (final_equity - initial_capital_twd) / initial_capital_twd * 100.0
    } else {
        0.0
    };

    let returns = bar_returns(equity_curve);
    let avg_return = mean(&returns);
    let std_dev = population_std_dev(&returns, avg_return);
    let sharpe_ratio = if std_dev > f64::EPSILON {
        avg_return / std_dev * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    let downside: Vec<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();
    let downside_std = population_std_dev(&downside, 0.0);
    let sortino_ratio = if downside_std > f64::EPSILON {
        avg_return / downside_std * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    let max_drawdown_pct = max_drawdown_pct(equity_curve);
    let calmar_ratio = if max_drawdown_pct > f64::EPSILON {
        total_return_pct / max_drawdown_pct
    } else {
        0.0
    };

    let total_trades = closed_trades.len() as u32;
    let wins = closed_trades.iter().filter(|t| t.realized_pnl > 0.0).count();
    let win_rate_pct = if total_trades > 0 {
        wins as f64 / total_trades as f64 * 100.0
    } else {
        0.0
    };

    let average_hold_bars = if hold_bars.is_empty() {
        0.0
    } else {
        hold_bars.iter().sum::<u64>() as f64 / hold_bars.len() as f64
    };

    PerformanceMetrics {
        total_return_pct,
        sharpe_ratio,
        sortino_ratio,
        calmar_ratio,
        win_rate_pct,
        max_drawdown_pct,
        total_trades,
        average_hold_bars,
    }
}

/// Weights for the composite fitness score, normalized to
/// sum to 1.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitnessWeights {
    pub sharpe: f64,
    pub sortino: f64,
    pub calmar: f64,
    pub drawdown_penalty: f64,
    pub trade_count_penalty: f64,
}

impl FitnessWeights {
    pub fn equal() -> Self {
        Self {
            sharpe: 0.2,
            sortino: 0.2,
            calmar: 0.2,
            drawdown_penalty: 0.2,
            trade_count_penalty: 0.2,
        }
    }
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self::equal()
    }
}

fn sanitize(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

/// Minimum trade count for a result to be eligible for ranking/selection
/// ("a result with totalTrades < 10 is marked invalid").
pub const MIN_TRADES_FOR_SELECTION: u32 = 10;

pub fn is_eligible_for_selection(metrics: &PerformanceMetrics) -> bool {
    metrics.total_trades >= MIN_TRADES_FOR_SELECTION
}

/// `w1*Sharpe + w2*Sortino + w3*Calmar - w4*max(0, drawdown-20%) -
/// w5*max(0, 20-totalTrades)`. NaN/infinite terms
/// contribute 0 rather than poisoning the whole score.
pub fn fitness(metrics: &PerformanceMetrics, weights: &FitnessWeights) -> f64 {
    let drawdown_excess = (metrics.max_drawdown_pct - 20.0).max(0.0);
    let trade_shortfall = (20.0 - metrics.total_trades as f64).max(0.0);

    weights.sharpe * sanitize(metrics.sharpe_ratio)
        + weights.sortino * sanitize(metrics.sortino_ratio)
        + weights.calmar * sanitize(metrics.calmar_ratio)
        - weights.drawdown_penalty * sanitize(drawdown_excess)
        - weights.trade_count_penalty * sanitize(trade_shortfall)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn flat_equity_curve_has_zero_sharpe_and_drawdown() {
        let curve = vec![(ts(1), 100.0), (ts(2), 100.0), (ts(3), 100.0)];
        let metrics = compute_metrics(100.0, &curve, &[], &[]);
        assert_eq!(metrics.sharpe_ratio, 0.0);
        assert_eq!(metrics.max_drawdown_pct, 0.0);
        assert_eq!(metrics.total_return_pct, 0.0);
    }

    #[test]
    fn drawdown_is_measured_from_the_running_peak() {
        let curve = vec![(ts(1), 100.0), (ts(2), 120.0), (ts(3), 90.0), (ts(4), 110.0)];
        let metrics = compute_metrics(100.0, &curve, &[], &[]);
        assert!((metrics.max_drawdown_pct - 25.0).abs() < 1e-9);
    }

    #[test]
    fn fitness_penalizes_thin_trade_counts() {
        let base = PerformanceMetrics {
            total_return_pct: 10.0,
            sharpe_ratio: 1.0,
            sortino_ratio: 1.2,
            calmar_ratio: 0.5,
            win_rate_pct: 60.0,
            max_drawdown_pct: 10.0,
            total_trades: 3,
            average_hold_bars: 5.0,
        };
        let weights = FitnessWeights::equal();
        assert!(!is_eligible_for_selection(&base));
        let thin_score = fitness(&base, &weights);
        let healthy = PerformanceMetrics { total_trades: 25, ..base };
        let healthy_score = fitness(&healthy, &weights);
        assert!(healthy_score > thin_score);
    }

    #[test]
    fn non_finite_ratios_contribute_zero_not_nan() {
        let metrics = PerformanceMetrics {
            total_return_pct: f64::NAN,
            sharpe_ratio: f64::NAN,
            sortino_ratio: f64::INFINITY,
            calmar_ratio: f64::NEG_INFINITY,
            win_rate_pct: 0.0,
            max_drawdown_pct: 0.0,
            total_trades: 15,
            average_hold_bars: 0.0,
        };
        let score = fitness(&metrics, &FitnessWeights::equal());
        assert!(score.is_finite());
    }
}
