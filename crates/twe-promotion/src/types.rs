use serde::{Deserialize, Serialize};
use twe_schemas::BacktestResult;

/// Eligibility thresholds and shadow-set size (step 1, §6
/// `auto_selection.*`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutoSelectionConfig {
    /// Minimum `winRatePct` (e.g. 50.0 = 50%).
    pub min_win_rate: f64,
    /// Minimum `sharpeRatio`.
    pub min_sharpe: f64,
    /// Minimum `totalReturnPct` (e.g. 10.0 = 10%).
    pub min_return: f64,
    /// Maximum `maxDrawdownPct` (e.g. 20.0 = 20%).
    pub max_drawdown: f64,
    /// How many of the remaining ranked rows become shadow mappings.
    pub shadow_count: usize,
}

impl Default for AutoSelectionConfig {
    fn default() -> Self {
        Self {
            min_win_rate: 50.0,
            min_sharpe: 0.5,
            min_return: 10.0,
            max_drawdown: 20.0,
            shadow_count: 5,
        }
    }
}

/// One ranked candidate: the raw persisted row plus its composite fitness
/// score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub result: BacktestResult,
    pub fitness: f64,
}

/// Output of one `AutoSelector::select` call.
///
/// `winner.is_none()` is the "empty eligible set" case: the caller must
/// retain the previous configuration and emit a warning rather than
/// demoting the current active mapping to nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionPlan {
    pub backtest_run_id: uuid::Uuid,
    pub winner: Option<RankedCandidate>,
    pub shadows: Vec<RankedCandidate>,
    /// Total rows considered before the eligibility filter.
    pub candidates_considered: usize,
}

impl SelectionPlan {
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}
