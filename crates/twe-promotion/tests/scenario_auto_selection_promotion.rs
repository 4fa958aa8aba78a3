//! seed scenario 4 (auto-selection promotion): a run over many
//! `(symbol, strategy)` pairs where exactly one clears every threshold
//! produces exactly one winner and the configured shadow count.

use chrono::Utc;
use twe_backtest::FitnessWeights;
use twe_promotion::{select, AutoSelectionConfig};
use twe_schemas::BacktestResult;
use uuid::Uuid;

fn row(symbol: &str, strategy: &str, sharpe: f64, ret: f64, win_rate: f64, mdd: f64, trades: u32) -> BacktestResult {
    BacktestResult {
        backtest_run_id: Uuid::nil(),
        symbol: symbol.to_string(),
        strategy_name: strategy.to_string(),
        total_return_pct: ret,
        sharpe_ratio: sharpe,
        sortino_ratio: sharpe,
        calmar_ratio: sharpe,
        win_rate_pct: win_rate,
        max_drawdown_pct: mdd,
        total_trades: trades,
        average_hold_bars: 8.0,
        equity_curve: vec![(Utc::now(), 100_000.0)],
    }
}

#[test]
fn exactly_one_row_clears_every_threshold() {
    let run_id = Uuid::new_v4();
    let mut results = Vec::new();

    // 46 symbols x 50 strategies' worth of noise that each fail at least one
    // gate (thin trade count, low win rate, or a Sharpe below the floor).
    for s in 0..46 {
        for n in 0..50 {
            results.push(row(
                &format!("SYM{s}"),
                &format!("strat{n}"),
                0.2,
                5.0,
                45.0,
                25.0,
                4,
            ));
        }
    }

 // The single qualifying pair.
    results.push(row("2308.TW", "Pivot Points", 1.47, 162.5, 61.0, 12.0, 34));

    let cfg = AutoSelectionConfig::default();
    let weights = FitnessWeights::equal();
    let plan = select(run_id, &results, &cfg, &weights, None);

    let winner = plan.winner.expect("exactly one eligible row must win");
    assert_eq!(winner.result.symbol, "2308.TW");
    assert_eq!(winner.result.strategy_name, "Pivot Points");
    assert!(plan.shadows.is_empty(), "no other row clears the thresholds");
}

#[test]
fn shadow_set_is_the_next_n_ranked_rows() {
    let run_id = Uuid::new_v4();
    let results = vec![
        row("A", "s1", 2.0, 20.0, 60.0, 10.0, 30),
        row("B", "s2", 1.8, 20.0, 60.0, 10.0, 30),
        row("C", "s3", 1.6, 20.0, 60.0, 10.0, 30),
        row("D", "s4", 1.4, 20.0, 60.0, 10.0, 30),
    ];
    let mut cfg = AutoSelectionConfig::default();
    cfg.shadow_count = 2;
    let weights = FitnessWeights::equal();

    let plan = select(run_id, &results, &cfg, &weights, None);
    assert_eq!(plan.winner.unwrap().result.symbol, "A");
    let shadow_symbols: Vec<_> = plan.shadows.iter().map(|c| c.result.symbol.as_str()).collect();
    assert_eq!(shadow_symbols, vec!["B", "C"]);
}

#[test]
fn retains_no_winner_when_nothing_passes_retention_is_caller_responsibility() {
    let run_id = Uuid::new_v4();
    let results = vec![row("2330", "macd", 0.1, 2.0, 40.0, 30.0, 2)];
    let cfg = AutoSelectionConfig::default();
    let weights = FitnessWeights::equal();

    let plan = select(run_id, &results, &cfg, &weights, None);
    assert!(plan.winner.is_none());
    assert_eq!(plan.candidates_considered, 1);
}
