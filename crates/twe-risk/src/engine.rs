use chrono::NaiveDate;
use twe_schemas::Trade;

use crate::types::{week_start_of, RiskState, WeeklySnapshot};

/// RiskGuard: tracks daily/weekly P&L, trips
/// `emergencyShutdown` on a daily-limit breach, and rolls both counters at
/// their boundaries.
#[derive(Debug, Clone)]
pub struct RiskGuard {
    state: RiskState,
}

impl RiskGuard {
    pub fn new(daily_limit_twd: f64, weekly_limit_twd: f64, today: NaiveDate) -> Self {
        Self {
            state: RiskState::new(daily_limit_twd, weekly_limit_twd, today),
        }
    }

    /// Boot from a durable weekly snapshot plus today's already-closed
 /// trades ("daily P&L is recomputed from closed trades of
    /// the current day on boot").
    pub fn boot(
        snapshot: Option<WeeklySnapshot>,
        todays_closed_trades: &[Trade],
        today: NaiveDate,
        daily_limit_twd: f64,
        weekly_limit_twd: f64,
    ) -> Self {
        let mut guard = Self::new(daily_limit_twd, weekly_limit_twd, today);
        if let Some(snap) = snapshot {
            if snap.week_start == week_start_of(today) {
                guard.state.weekly_pnl_twd = snap.weekly_pnl_twd;
            }
        }
        let recomputed_daily: f64 = todays_closed_trades
            .iter()
            .filter(|t| t.closed_at.date_naive() == today)
            .map(|t| t.realized_pnl)
            .sum();
        guard.state.daily_pnl_twd = recomputed_daily;
        guard
    }

    pub fn state(&self) -> &RiskState {
        &self.state
    }

    pub fn snapshot(&self) -> WeeklySnapshot {
        WeeklySnapshot {
            week_start: self.state.current_week_start,
            weekly_pnl_twd: self.state.weekly_pnl_twd,
        }
    }

    /// Roll daily/weekly counters if `now` has crossed midnight or the
 /// Monday boundary since the last observed tick.
    pub fn roll_if_needed(&mut self, today: NaiveDate) {
        if today != self.state.current_day {
            self.state.daily_pnl_twd = 0.0;
            self.state.current_day = today;
        }
        let this_week_start = week_start_of(today);
        if this_week_start != self.state.current_week_start {
            self.state.weekly_pnl_twd = 0.0;
            self.state.current_week_start = this_week_start;
        }
    }

    /// Record a realized P&L delta and trip `emergencyShutdown` if the
 /// daily limit is breached.
    pub fn record_pnl(&mut self, delta_twd: f64, today: NaiveDate) {
        self.roll_if_needed(today);
        self.state.daily_pnl_twd += delta_twd;
        self.state.weekly_pnl_twd += delta_twd;
        if self.is_daily_limit_exceeded() {
            self.state.emergency_shutdown = true;
        }
    }

    pub fn is_daily_limit_exceeded(&self) -> bool {
        self.state.daily_limit_twd > 0.0 && self.state.daily_pnl_twd <= -self.state.daily_limit_twd
    }

    pub fn is_weekly_limit_hit(&self) -> bool {
        self.state.weekly_limit_twd > 0.0 && self.state.weekly_pnl_twd <= -self.state.weekly_limit_twd
    }

 /// Veto chain stage f: reject new entries once either
    /// limit is breached.
    pub fn entries_allowed(&self) -> bool {
        !self.state.emergency_shutdown && !self.is_daily_limit_exceeded() && !self.is_weekly_limit_hit()
    }

    pub fn emergency_shutdown(&self) -> bool {
        self.state.emergency_shutdown
    }

    /// Operator recovery: clears the emergency flag without touching
    /// accumulated P&L. Used by ControlPlane's `resume` command after
    /// manual review.
    pub fn clear_emergency_shutdown(&mut self) {
        self.state.emergency_shutdown = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use twe_schemas::TradeSide;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn seed_test_2_daily_loss_limit_trips_emergency_shutdown() {
 // scenario 2: dailyPnL=-4400, trade closes at -200,
        // daily limit breached -> dailyPnL=-4600, emergencyShutdown=true.
        let mut guard = RiskGuard::new(4_500.0, 50_000.0, date(2026, 7, 29));
        guard.record_pnl(-4_400.0, date(2026, 7, 29));
        assert!(guard.entries_allowed());
        guard.record_pnl(-200.0, date(2026, 7, 29));
        assert!((guard.state().daily_pnl_twd - (-4_600.0)).abs() < 1e-9);
        assert!(guard.emergency_shutdown());
        assert!(!guard.entries_allowed());
    }

    #[test]
    fn daily_pnl_resets_at_midnight() {
        let mut guard = RiskGuard::new(1_000.0, 50_000.0, date(2026, 7, 29));
        guard.record_pnl(-500.0, date(2026, 7, 29));
        guard.roll_if_needed(date(2026, 7, 30));
        assert_eq!(guard.state().daily_pnl_twd, 0.0);
        // weekly P&L is unaffected by the daily roll.
        assert_eq!(guard.state().weekly_pnl_twd, -500.0);
    }

    #[test]
    fn weekly_pnl_resets_on_monday_boundary() {
        // Friday 2026-07-24 to Monday 2026-07-27.
        let mut guard = RiskGuard::new(1_000.0, 5_000.0, date(2026, 7, 24));
        guard.record_pnl(-300.0, date(2026, 7, 24));
        guard.roll_if_needed(date(2026, 7, 27));
        assert_eq!(guard.state().weekly_pnl_twd, 0.0);
    }

    #[test]
    fn boot_recomputes_daily_pnl_from_closed_trades() {
        let today = date(2026, 7, 29);
        let trades = vec![Trade {
            symbol: "2330".to_string(),
            strategy_name: "MA Cross".to_string(),
            side: TradeSide::Sell,
            qty: 1000,
            entry_price: 100.0,
            exit_price: 98.0,
            realized_pnl: -2_000.0,
            opened_at: chrono::Utc.with_ymd_and_hms(2026, 7, 29, 9, 0, 0).unwrap(),
            closed_at: chrono::Utc.with_ymd_and_hms(2026, 7, 29, 9, 30, 0).unwrap(),
        }];
        let guard = RiskGuard::boot(None, &trades, today, 5_000.0, 20_000.0);
        assert_eq!(guard.state().daily_pnl_twd, -2_000.0);
    }

    #[test]
    fn boot_restores_weekly_snapshot_from_same_week() {
        let today = date(2026, 7, 29); // Wednesday
        let snap = WeeklySnapshot {
            week_start: week_start_of(today),
            weekly_pnl_twd: -1_000.0,
        };
        let guard = RiskGuard::boot(Some(snap), &[], today, 5_000.0, 20_000.0);
        assert_eq!(guard.state().weekly_pnl_twd, -1_000.0);
    }

    #[test]
    fn boot_discards_stale_snapshot_from_prior_week() {
        let today = date(2026, 7, 29);
        let snap = WeeklySnapshot {
            week_start: date(2026, 7, 13),
            weekly_pnl_twd: -9_999.0,
        };
        let guard = RiskGuard::boot(Some(snap), &[], today, 5_000.0, 20_000.0);
        assert_eq!(guard.state().weekly_pnl_twd, 0.0);
    }
}
