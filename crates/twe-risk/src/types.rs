use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// `(dailyPnL, weeklyPnL, emergencyShutdown, dailyLimitTwd, weeklyLimitTwd)`
/// plus the boundary bookkeeping needed to roll both counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskState {
    pub daily_pnl_twd: f64,
    pub weekly_pnl_twd: f64,
    pub emergency_shutdown: bool,
    pub daily_limit_twd: f64,
    pub weekly_limit_twd: f64,
    pub current_day: NaiveDate,
    pub current_week_start: NaiveDate,
}

impl RiskState {
    pub fn new(daily_limit_twd: f64, weekly_limit_twd: f64, today: NaiveDate) -> Self {
        Self {
            daily_pnl_twd: 0.0,
            weekly_pnl_twd: 0.0,
            emergency_shutdown: false,
            daily_limit_twd,
            weekly_limit_twd,
            current_day: today,
            current_week_start: week_start_of(today),
        }
    }
}

/// `week_start` is the Monday on/before `date`.
pub fn week_start_of(date: NaiveDate) -> NaiveDate {
    let days_since_monday = date.weekday().num_days_from_monday();
    date - chrono::Duration::days(days_since_monday as i64)
}

/// Durable weekly-P&L snapshot ("Weekly P&L persists across
/// restarts via a durable snapshot"). Persistence itself is the caller's
/// job (twe-db); this crate only defines the shape and the pure
/// load/save-worthy transitions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeeklySnapshot {
    pub week_start: NaiveDate,
    pub weekly_pnl_twd: f64,
}
