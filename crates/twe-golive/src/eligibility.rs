//! Go-live eligibility check: the gate `ControlPlane`
//! evaluates before admitting a `golive` command. Distinct from the
//! reconcile-clean gate (`gate::check_arm_gate`) — this one asks "has the
//! strategy actually earned the right to trade real money," the reconcile
//! gate asks "do we agree with the broker about what we currently hold."
//! Both must pass before a `confirmlive` is honored.

use serde::{Deserialize, Serialize};

/// Minimal trade-history stats `ControlPlane` needs to evaluate eligibility.
/// Sourced from closed trades recorded in `twe_schemas::Trade` rows, not
/// recomputed here — this crate stays pure arithmetic over caller-supplied
/// numbers, same as the rest of `twe-golive`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeHistoryStats {
    pub closed_trades: u32,
    /// 0..=100.
    pub win_rate_pct: f64,
    /// 0..=100, always non-negative (the magnitude of the worst drawdown).
    pub max_drawdown_pct: f64,
}

/// defaults: `closedTrades >= 20`, `winRate >= 55%`,
/// `maxDrawdown <= 5%`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoLiveThresholds {
    pub min_closed_trades: u32,
    pub min_win_rate_pct: f64,
    pub max_drawdown_pct: f64,
}

impl Default for GoLiveThresholds {
    fn default() -> Self {
        Self {
            min_closed_trades: 20,
            min_win_rate_pct: 55.0,
            max_drawdown_pct: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoLiveDecision {
    pub eligible: bool,
    pub reasons: Vec<String>,
}

/// Evaluate go-live eligibility. A fresh-start stats struct
/// (`closed_trades = 0`) is ineligible by construction — the check never
/// passes on an unproven strategy.
pub fn check_go_live_eligibility(stats: &TradeHistoryStats, thresholds: &GoLiveThresholds) -> GoLiveDecision {
    let mut reasons = Vec::new();

    if stats.closed_trades < thresholds.min_closed_trades {
        reasons.push(format!(
            "closed trades {} below minimum {}",
            stats.closed_trades, thresholds.min_closed_trades
        ));
    }
    if stats.win_rate_pct < thresholds.min_win_rate_pct {
        reasons.push(format!(
            "win rate {:.2}% below minimum {:.2}%",
            stats.win_rate_pct, thresholds.min_win_rate_pct
        ));
    }
    if stats.max_drawdown_pct > thresholds.max_drawdown_pct {
        reasons.push(format!(
            "max drawdown {:.2}% exceeds limit {:.2}%",
            stats.max_drawdown_pct, thresholds.max_drawdown_pct
        ));
    }

    GoLiveDecision {
        eligible: reasons.is_empty(),
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_strategy_is_ineligible() {
        let stats = TradeHistoryStats {
            closed_trades: 0,
            win_rate_pct: 0.0,
            max_drawdown_pct: 0.0,
        };
        let decision = check_go_live_eligibility(&stats, &GoLiveThresholds::default());
        assert!(!decision.eligible);
        assert!(!decision.reasons.is_empty());
    }

    #[test]
    fn strategy_clearing_every_threshold_is_eligible() {
        let stats = TradeHistoryStats {
            closed_trades: 25,
            win_rate_pct: 60.0,
            max_drawdown_pct: 3.0,
        };
        let decision = check_go_live_eligibility(&stats, &GoLiveThresholds::default());
        assert!(decision.eligible);
        assert!(decision.reasons.is_empty());
    }

    #[test]
    fn drawdown_just_over_the_limit_is_rejected() {
        let stats = TradeHistoryStats {
            closed_trades: 30,
            win_rate_pct: 70.0,
            max_drawdown_pct: 5.01,
        };
        let decision = check_go_live_eligibility(&stats, &GoLiveThresholds::default());
        assert!(!decision.eligible);
        assert_eq!(decision.reasons.len(), 1);
    }
}
