use twe_portfolio::ClosedTrade;
use twe_schemas::TradeSide;

use crate::corporate_actions::CorporateActionPolicy;

/// Flat slippage applied to the simulated fill price, plus a commission
/// charged on notional at every fill. Both default to zero (/// "optional slippage/commission models (default zero)").
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlippageModel {
    /// Basis points added against the trader: buys fill higher, sells fill
    /// lower. `0` disables slippage.
    pub slippage_bps: f64,
    /// Basis points of fill notional charged as commission. `0` disables
    /// commission.
    pub commission_bps: f64,
}

impl SlippageModel {
    pub fn zero() -> Self {
        Self { slippage_bps: 0.0, commission_bps: 0.0 }
    }

    /// Apply slippage to a bar's close price for the given side.
    pub fn fill_price(&self, close: f64, side: TradeSide) -> f64 {
        let adj = close * self.slippage_bps / 10_000.0;
        match side {
            TradeSide::Buy => close + adj,
            TradeSide::Sell => close - adj,
        }
    }

    /// Commission owed on a fill of `qty` shares at `price`.
    pub fn commission(&self, qty: u64, price: f64) -> f64 {
        qty as f64 * price * self.commission_bps / 10_000.0
    }
}

impl Default for SlippageModel {
    fn default() -> Self {
        Self::zero()
    }
}

/// Backtest configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct BacktestConfig {
 /// Starting cash, the design default 80 000.
    pub initial_capital_twd: f64,
    /// Confidence floor an entry signal must clear to be actionable,
 /// matching `TradeSignal::is_actionable_entry`.
    pub entry_threshold: f64,
    /// Fraction of equity risked per trade when the strategy supplies no
    /// win-rate/ATR statistics of its own (fixed-risk sizing fallback).
    pub risk_pct: f64,
    /// Stop distance as a fraction of price, used by the same fallback.
    pub default_stop_distance_pct: f64,
    pub slippage: SlippageModel,
    pub corporate_action_policy: CorporateActionPolicy,
}

impl BacktestConfig {
 /// defaults: 80 000 initial capital, zero slippage/commission.
    pub fn defaults() -> Self {
        Self {
            initial_capital_twd: 80_000.0,
            entry_threshold: twe_schemas::DEFAULT_ENTRY_THRESHOLD,
            risk_pct: 0.01,
            default_stop_distance_pct: 0.03,
            slippage: SlippageModel::zero(),
            corporate_action_policy: CorporateActionPolicy::Allow,
        }
    }
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Metrics computed at the end of a `(strategy, symbol)` replay (the design
/// §4.9's exact list).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PerformanceMetrics {
    pub total_return_pct: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    pub win_rate_pct: f64,
    pub max_drawdown_pct: f64,
    pub total_trades: u32,
    pub average_hold_bars: f64,
}

/// One `(strategy, symbol)` evaluation. This is the engine-internal
/// counterpart of `twe_schemas::BacktestResult`: it carries the same
/// metrics plus the full equity curve and closed-trade detail a caller
/// needs before collapsing the run into a persisted row via
/// [`ReplayOutcome::into_backtest_result`].
#[derive(Clone, Debug, PartialEq)]
pub struct ReplayOutcome {
    pub symbol: String,
    pub strategy_name: String,
    pub metrics: PerformanceMetrics,
    /// `(bar timestamp, equity)` pairs, one per processed bar.
    pub equity_curve: Vec<(chrono::DateTime<chrono::Utc>, f64)>,
    pub closed_trades: Vec<ClosedTrade>,
    /// Set when the replay stopped before the last bar because a
    /// corporate-action exclusion was hit.
    pub halted_reason: Option<String>,
}

impl ReplayOutcome {
    /// Collapse into the persisted `(backtest_run_id, symbol, strategy_name)`
 /// row, dropping the per-trade detail
    /// the table doesn't carry.
    pub fn into_backtest_result(self, backtest_run_id: uuid::Uuid) -> twe_schemas::BacktestResult {
        twe_schemas::BacktestResult {
            backtest_run_id,
            symbol: self.symbol,
            strategy_name: self.strategy_name,
            total_return_pct: self.metrics.total_return_pct,
            sharpe_ratio: self.metrics.sharpe_ratio,
            sortino_ratio: self.metrics.sortino_ratio,
            calmar_ratio: self.metrics.calmar_ratio,
            win_rate_pct: self.metrics.win_rate_pct,
            max_drawdown_pct: self.metrics.max_drawdown_pct,
            total_trades: self.metrics.total_trades,
            average_hold_bars: self.metrics.average_hold_bars,
            equity_curve: self.equity_curve,
        }
    }
}
