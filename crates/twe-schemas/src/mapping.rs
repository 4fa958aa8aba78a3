use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyType {
    LongTerm,
    Swing,
    ShortTerm,
    Intraday,
}

/// `(symbol, strategyName)` row. At most one row per pair; at most one row
/// `is_active = true` at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyStockMapping {
    pub symbol: String,
    pub strategy_name: String,
    pub is_active: bool,
    pub confidence_score: f64,
    pub total_return_pct: f64,
    pub sharpe_ratio: f64,
    pub win_rate_pct: f64,
    pub max_drawdown_pct: f64,
    pub total_trades: u32,
    pub updated_at: DateTime<Utc>,
}
