//! Run artifact layout: `manifest.json`, `audit.jsonl`, and the
//! order/fill/equity-curve/metrics files every run (live, paper, or
//! backtest) writes under `<exports_root>/<run_id>/`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: u32,
    pub run_id: Uuid,
    pub engine_id: String,
    pub mode: String,
    pub git_hash: String,
    pub config_hash: String,
    pub host_fingerprint: String,
    pub created_at_utc: DateTime<Utc>,
    pub artifacts: ArtifactList,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactList {
    pub audit_jsonl: String,
    pub manifest_json: String,
    pub orders_csv: String,
    pub fills_csv: String,
    pub equity_curve_csv: String,
    pub metrics_json: String,
}

pub struct InitRunArtifactsArgs<'a> {
    pub exports_root: &'a Path,
    pub schema_version: u32,
    pub run_id: Uuid,
    pub engine_id: &'a str,
    pub mode: &'a str,
    pub git_hash: &'a str,
    pub config_hash: &'a str,
    pub host_fingerprint: &'a str,
}

pub struct InitRunArtifactsOutput {
    pub run_dir: PathBuf,
    pub manifest_path: PathBuf,
}

/// Create `<exports_root>/<run_id>/` with placeholder artifact files and a
/// freshly-stamped `manifest.json`. Idempotent: existing placeholder files
/// are left alone, only `manifest.json` is always rewritten.
pub fn init_run_artifacts(args: InitRunArtifactsArgs<'_>) -> Result<InitRunArtifactsOutput> {
    let run_dir = args.exports_root.join(args.run_id.to_string());
    fs::create_dir_all(&run_dir)
        .with_context(|| format!("create run dir failed: {}", run_dir.display()))?;

    ensure_file(&run_dir.join("audit.jsonl"), "")?;
    ensure_file(
        &run_dir.join("orders.csv"),
        "ts_utc,order_id,symbol,side,qty,order_type,limit_price,stop_price,status\n",
    )?;
    ensure_file(
        &run_dir.join("fills.csv"),
        "ts_utc,fill_id,order_id,symbol,side,qty,price,fee\n",
    )?;
    ensure_file(&run_dir.join("equity_curve.csv"), "ts_utc,equity\n")?;
    ensure_file(&run_dir.join("metrics.json"), "{}\n")?;

    let manifest = RunManifest {
        schema_version: args.schema_version,
        run_id: args.run_id,
        engine_id: args.engine_id.to_string(),
        mode: args.mode.to_string(),
        git_hash: args.git_hash.to_string(),
        config_hash: args.config_hash.to_string(),
        host_fingerprint: args.host_fingerprint.to_string(),
        created_at_utc: Utc::now(),
        artifacts: ArtifactList {
            audit_jsonl: "audit.jsonl".to_string(),
            manifest_json: "manifest.json".to_string(),
            orders_csv: "orders.csv".to_string(),
            fills_csv: "fills.csv".to_string(),
            equity_curve_csv: "equity_curve.csv".to_string(),
            metrics_json: "metrics.json".to_string(),
        },
    };

    let manifest_path = run_dir.join("manifest.json");
    let json = serde_json::to_string_pretty(&manifest).context("serialize manifest failed")?;
    fs::write(&manifest_path, format!("{json}\n"))
        .with_context(|| format!("write manifest failed: {}", manifest_path.display()))?;

    Ok(InitRunArtifactsOutput {
        run_dir,
        manifest_path,
    })
}

fn ensure_file(path: &Path, contents_if_create: &str) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    fs::write(path, contents_if_create)
        .with_context(|| format!("create placeholder failed: {}", path.display()))
}

// ---------------------------------------------------------------------------
// Backtest report writer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
struct BacktestMetrics<'a> {
    schema_version: u32,
    symbol: &'a str,
    strategy_name: &'a str,
    total_return_pct: f64,
    sharpe_ratio: f64,
    sortino_ratio: f64,
    calmar_ratio: f64,
    win_rate_pct: f64,
    max_drawdown_pct: f64,
    total_trades: u32,
    average_hold_bars: f64,
    fitness: f64,
    halted_reason: Option<&'a str>,
    bars: usize,
    trades: usize,
}

/// Write deterministic backtest artifacts (`fills.csv`, `equity_curve.csv`,
/// `metrics.json`) for one `(strategy, symbol)` replay into an existing run
/// directory. Called once per outcome when a full backtest spans several
/// symbol/strategy combinations — callers that want one directory per
/// combination should pass distinct `dir`s.
pub fn write_backtest_report(dir: &Path, outcome: &twe_backtest::ReplayOutcome) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("create backtest artifacts dir failed: {}", dir.display()))?;

    let mut fills_csv = String::from("ts_utc,fill_id,order_id,symbol,side,qty,price,fee\n");
    for t in &outcome.closed_trades {
        fills_csv.push_str(&format!(
            "{},,,{},SELL,{},{},0\n",
            t.closed_at.to_rfc3339(),
            t.symbol,
            t.qty,
            t.exit_price
        ));
    }
    let fills_path = dir.join("fills.csv");
    fs::write(&fills_path, fills_csv)
        .with_context(|| format!("write fills.csv failed: {}", fills_path.display()))?;

    let mut eq_csv = String::from("ts_utc,equity\n");
    for (ts, eq) in &outcome.equity_curve {
        eq_csv.push_str(&format!("{},{}\n", ts.to_rfc3339(), eq));
    }
    let eq_path = dir.join("equity_curve.csv");
    fs::write(&eq_path, eq_csv)
        .with_context(|| format!("write equity_curve.csv failed: {}", eq_path.display()))?;

    let metrics = BacktestMetrics {
        schema_version: 1,
        symbol: &outcome.symbol,
        strategy_name: &outcome.strategy_name,
        total_return_pct: outcome.metrics.total_return_pct,
        sharpe_ratio: outcome.metrics.sharpe_ratio,
        sortino_ratio: outcome.metrics.sortino_ratio,
        calmar_ratio: outcome.metrics.calmar_ratio,
        win_rate_pct: outcome.metrics.win_rate_pct,
        max_drawdown_pct: outcome.metrics.max_drawdown_pct,
        total_trades: outcome.metrics.total_trades,
        average_hold_bars: outcome.metrics.average_hold_bars,
        fitness: twe_backtest::fitness(&outcome.metrics, &twe_backtest::FitnessWeights::default()),
        halted_reason: outcome.halted_reason.as_deref(),
        bars: outcome.equity_curve.len(),
        trades: outcome.closed_trades.len(),
    };

    let metrics_path = dir.join("metrics.json");
    let json = serde_json::to_string_pretty(&metrics).context("serialize metrics failed")?;
    fs::write(&metrics_path, format!("{json}\n"))
        .with_context(|| format!("write metrics.json failed: {}", metrics_path.display()))?;

    Ok(())
}
