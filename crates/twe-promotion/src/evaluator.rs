//! AutoSelector ranking.
//!
//! Eligibility and fitness computation are owned by `twe_backtest::metrics`
//! (the same functions the backtest run itself used to decide whether a
//! result was worth persisting); this module only re-derives them from the
//! persisted `BacktestResult` rows and applies the §4.10 step-1 thresholds
//! on top of the backtester's own `totalTrades >= 10` floor.

use twe_backtest::{fitness, is_eligible_for_selection, FitnessWeights, PerformanceMetrics};
use twe_schemas::BacktestResult;

use crate::artifact_gate::ArtifactLock;
use crate::types::{AutoSelectionConfig, RankedCandidate, SelectionPlan};

fn metrics_of(r: &BacktestResult) -> PerformanceMetrics {
    PerformanceMetrics {
        total_return_pct: r.total_return_pct,
        sharpe_ratio: r.sharpe_ratio,
        sortino_ratio: r.sortino_ratio,
        calmar_ratio: r.calmar_ratio,
        win_rate_pct: r.win_rate_pct,
        max_drawdown_pct: r.max_drawdown_pct,
        total_trades: r.total_trades,
        average_hold_bars: r.average_hold_bars,
    }
}

/// step 1: `totalTrades >= 10` (delegated to
/// `is_eligible_for_selection`, the same floor the backtester itself
/// applies) plus the four auto-selection thresholds.
pub fn is_eligible(r: &BacktestResult, cfg: &AutoSelectionConfig) -> bool {
    let metrics = metrics_of(r);
    is_eligible_for_selection(&metrics)
        && r.win_rate_pct > cfg.min_win_rate
        && r.sharpe_ratio > cfg.min_sharpe
        && r.total_return_pct > cfg.min_return
        && r.max_drawdown_pct < cfg.max_drawdown
}

/// step 2: rank eligible rows by composite fitness,
/// descending; ties break on `(symbol, strategy_name)` so a repeat run over
/// identical inputs produces an identical order (idempotence
/// property).
pub fn rank(
    results: &[BacktestResult],
    cfg: &AutoSelectionConfig,
    weights: &FitnessWeights,
) -> Vec<RankedCandidate> {
    let mut ranked: Vec<RankedCandidate> = results
        .iter()
        .filter(|r| is_eligible(r, cfg))
        .map(|r| RankedCandidate {
            result: r.clone(),
            fitness: fitness(&metrics_of(r), weights),
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.fitness
            .partial_cmp(&a.fitness)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.result.symbol.cmp(&b.result.symbol))
            .then_with(|| a.result.strategy_name.cmp(&b.result.strategy_name))
    });

    ranked
}

/// Build the full selection plan for one backtest run (steps
/// 1-2). Does not touch storage or `StrategyManager` — the caller drives
/// those via `twe_db::store::promote_mapping` / `StrategyManager::swap_active`
/// and `install_shadows`, exactly once,
/// after inspecting `winner`.
///
/// `lock` is an optional integrity proof: when the caller requires one (via
/// `TWE_PROMOTION_REQUIRE_LOCK`) and none is supplied, the plan comes back
/// with no winner, exactly like an empty eligible set, rather than
/// promoting off artifacts nobody verified.
pub fn select(
    backtest_run_id: uuid::Uuid,
    results: &[BacktestResult],
    cfg: &AutoSelectionConfig,
    weights: &FitnessWeights,
    lock: Option<&ArtifactLock>,
) -> SelectionPlan {
    let candidates_considered = results.len();

    if lock.is_none() && std::env::var("TWE_PROMOTION_REQUIRE_LOCK").is_ok() {
        tracing::warn!(backtest_run_id = %backtest_run_id, "auto-selection skipped: artifact lock required but absent");
        return SelectionPlan {
            backtest_run_id,
            winner: None,
            shadows: Vec::new(),
            candidates_considered,
        };
    }

    let ranked = rank(results, cfg, weights);
    if ranked.is_empty() {
        tracing::warn!(backtest_run_id = %backtest_run_id, candidates_considered, "auto-selection found no eligible candidate; retaining previous configuration");
        return SelectionPlan {
            backtest_run_id,
            winner: None,
            shadows: Vec::new(),
            candidates_considered,
        };
    }

    let winner = ranked[0].clone();
    let shadows = ranked.into_iter().skip(1).take(cfg.shadow_count).collect();

    SelectionPlan {
        backtest_run_id,
        winner: Some(winner),
        shadows,
        candidates_considered,
    }
}
