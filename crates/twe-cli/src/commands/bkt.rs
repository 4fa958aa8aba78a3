//! `twe bkt` — run the `(strategy, symbol)` backtest matrix over bars
//! loaded from a CSV file or from `twe-db`, print each replay's headline
//! metrics, and optionally write per-replay artifacts.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use twe_backtest::{fitness, run_matrix, BacktestConfig, BacktestJob, FitnessWeights, ReplayOutcome};
use twe_schemas::{Bar, Timeframe};
use twe_strategy::builtin_registry;

fn group_by_symbol(bars: Vec<Bar>) -> BTreeMap<String, Vec<Bar>> {
    let mut out: BTreeMap<String, Vec<Bar>> = BTreeMap::new();
    for bar in bars {
        out.entry(bar.symbol.clone()).or_default().push(bar);
    }
    out
}

fn resolve_strategy_names(strategies_csv: Option<String>) -> Result<Vec<String>> {
    let registry = builtin_registry();
    match strategies_csv {
        None => Ok(registry.list().into_iter().map(|m| m.name.clone()).collect()),
        Some(csv) => {
            let names: Vec<String> = csv
                .split(',')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect();
            for name in &names {
                if !registry.contains(name) {
                    anyhow::bail!("unknown --strategies entry '{}' (not in the builtin catalog)", name);
                }
            }
            if names.is_empty() {
                anyhow::bail!("--strategies must name at least one strategy");
            }
            Ok(names)
        }
    }
}

fn build_jobs(bars_by_symbol: &BTreeMap<String, Vec<Bar>>, strategy_names: &[String]) -> Vec<BacktestJob> {
    let registry = builtin_registry();
    let mut jobs = Vec::with_capacity(bars_by_symbol.len() * strategy_names.len());
    for (symbol, bars) in bars_by_symbol {
        for name in strategy_names {
            let strategy = registry
                .instantiate_verified(name)
                .expect("name was validated against the registry above");
            jobs.push(BacktestJob {
                symbol: symbol.clone(),
                strategy,
                bars: bars.clone(),
            });
        }
    }
    jobs
}

fn report_outcomes(run_id: Uuid, outcomes: &[ReplayOutcome], out_dir: Option<&str>) -> Result<()> {
    let weights = FitnessWeights::default();

    println!("backtest_run_id={}", run_id);
    println!("evaluations={}", outcomes.len());

    for outcome in outcomes {
        let score = fitness(&outcome.metrics, &weights);
        println!(
            "symbol={} strategy={} total_return_pct={:.4} sharpe={:.4} max_drawdown_pct={:.4} win_rate_pct={:.2} trades={} fitness={:.4}{}",
            outcome.symbol,
            outcome.strategy_name,
            outcome.metrics.total_return_pct,
            outcome.metrics.sharpe_ratio,
            outcome.metrics.max_drawdown_pct,
            outcome.metrics.win_rate_pct,
            outcome.metrics.total_trades,
            score,
            outcome
                .halted_reason
                .as_deref()
                .map(|r| format!(" halted_reason={r}"))
                .unwrap_or_default(),
        );

        if let Some(root) = out_dir {
            let dir = Path::new(root)
                .join(run_id.to_string())
                .join(&outcome.symbol)
                .join(&outcome.strategy_name);
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("create artifacts dir failed: {}", dir.display()))?;
            twe_artifacts::write_backtest_report(&dir, outcome)
                .with_context(|| format!("write backtest report failed: {}", dir.display()))?;
        }
    }

    if let Some(root) = out_dir {
        println!("artifacts_written=true out_dir={}/{}", root, run_id);
    } else {
        println!("artifacts_written=false");
    }

    Ok(())
}

/// Execute `twe bkt csv`: load bars from a CSV file and run every
/// requested strategy against every symbol present in the file.
pub async fn run_backtest_csv(
    bars_path: String,
    strategies_csv: Option<String>,
    out_dir: Option<String>,
) -> Result<()> {
    let bars = twe_backtest::load_csv_file(&bars_path)
        .with_context(|| format!("load bars csv failed: {}", bars_path))?;
    if bars.is_empty() {
        anyhow::bail!("no bars loaded from {}", bars_path);
    }

    let strategy_names = resolve_strategy_names(strategies_csv)?;
    let bars_by_symbol = group_by_symbol(bars);
    let jobs = build_jobs(&bars_by_symbol, &strategy_names);

    let config = BacktestConfig::defaults();
    let outcomes = run_matrix(jobs, config);

    report_outcomes(Uuid::new_v4(), &outcomes, out_dir.as_deref())
}

/// Execute `twe bkt db`: load bars from `twe-db` for the given symbols and
/// time range, then run the same matrix as `csv`.
#[allow(clippy::too_many_arguments)]
pub async fn run_backtest_db(
    symbols_csv: Option<String>,
    timeframe: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    strategies_csv: Option<String>,
    out_dir: Option<String>,
) -> Result<()> {
    if end < start {
        anyhow::bail!("--end must be >= --start");
    }

    let timeframe = Timeframe::parse(&timeframe)
        .with_context(|| format!("invalid --timeframe '{}'", timeframe))?;

    let symbols: Vec<String> = symbols_csv
        .context("--symbols is required for db-sourced backtests")?
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect();
    if symbols.is_empty() {
        anyhow::bail!("--symbols must name at least one symbol");
    }

    let pool = twe_db::connect_from_env().await?;

    let mut bars_by_symbol: BTreeMap<String, Vec<Bar>> = BTreeMap::new();
    for symbol in &symbols {
        let bars = twe_db::store::fetch_bars(&pool, symbol, timeframe, start, end)
            .await
            .with_context(|| format!("fetch_bars failed for {}", symbol))?;
        if !bars.is_empty() {
            bars_by_symbol.insert(symbol.clone(), bars);
        }
    }
    if bars_by_symbol.is_empty() {
        anyhow::bail!("no bars found for the requested symbols/timeframe/range");
    }

    let strategy_names = resolve_strategy_names(strategies_csv)?;
    let jobs = build_jobs(&bars_by_symbol, &strategy_names);

    let config = BacktestConfig::defaults();
    let outcomes = run_matrix(jobs, config);

    let run_id = Uuid::new_v4();
    for outcome in &outcomes {
        let score = fitness(&outcome.metrics, &FitnessWeights::default());
        twe_db::store::insert_backtest_result(&pool, &outcome.clone().into_backtest_result(run_id), score)
            .await
            .with_context(|| {
                format!(
                    "insert_backtest_result failed for {}/{}",
                    outcome.symbol, outcome.strategy_name
                )
            })?;
    }

    report_outcomes(run_id, &outcomes, out_dir.as_deref())
}
