use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Immutable row keyed by `(backtest_run_id, symbol, strategy_name)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub backtest_run_id: Uuid,
    pub symbol: String,
    pub strategy_name: String,
    pub total_return_pct: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    pub win_rate_pct: f64,
    pub max_drawdown_pct: f64,
    pub total_trades: u32,
    pub average_hold_bars: f64,
    /// `(timestamp, equity_twd)` summary of the equity curve.
    pub equity_curve: Vec<(DateTime<Utc>, f64)>,
}

/// Which veto-chain stage produced a `VetoEvent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VetoStage {
    Window,
    Emergency,
    Freshness,
    Compliance,
    EarningsBlackout,
    Regime,
    Correlation,
    Concentration,
    Risk,
    Advisor,
    StopLoss,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VetoEvent {
    pub id: Uuid,
    pub ts: DateTime<Utc>,
    pub symbol: String,
    pub strategy_name: String,
    pub stage: VetoStage,
    pub reason: String,
}

impl VetoEvent {
    pub fn new(
        ts: DateTime<Utc>,
        symbol: impl Into<String>,
        strategy_name: impl Into<String>,
        stage: VetoStage,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::nil(),
            ts,
            symbol: symbol.into(),
            strategy_name: strategy_name.into(),
            stage,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

/// A closed round trip (entry + exit fill pair), the unit RiskGuard and the
/// backtester both consume for P&L bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    pub strategy_name: String,
    pub side: TradeSide,
    pub qty: u64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub realized_pnl: f64,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
}

/// A submission that did not result in a fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeAttempt {
    pub symbol: String,
    pub side: TradeSide,
    pub qty: u64,
    pub broker_error: String,
    pub attempt_no: u32,
    pub ts: DateTime<Utc>,
}

/// Nightly rollup row read/written by RiskGuard's midnight reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStatistics {
    pub date: NaiveDate,
    pub starting_equity_twd: f64,
    pub ending_equity_twd: f64,
    pub realized_pnl_twd: f64,
    pub trades_count: u32,
    pub veto_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarningsBlackoutDate {
    pub symbol: String,
    pub earnings_date: NaiveDate,
}
