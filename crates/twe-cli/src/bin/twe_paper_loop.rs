//! Standalone paper-trading loop: drives `twe-engine::TradingEngine`
//! against bars already ingested into `twe-db`, filling through
//! `twe-broker-sim::SimBrokerAdapter` at each bar's close. Exists for
//! manual smoke-testing of the strategy/veto/sizing/execution path end to
//! end without a live bridge connection; gated behind the `testkit`
//! feature like the rest of the CLI's diagnostic surface.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use twe_broker_sim::SimBrokerAdapter;
use twe_engine::{EngineConfig, TradingEngine};
use twe_runtime::RuntimeControl;
use twe_schemas::{Portfolio, Timeframe};
use twe_strategy::{builtin_registry, StrategyManager};

#[derive(Parser)]
#[command(name = "twe_paper_loop")]
#[command(about = "Replay persisted bars through the trading engine with a paper broker")]
struct Args {
    /// Comma-separated symbol list.
    #[arg(long)]
    symbols: String,

    /// Timeframe, e.g. 1m, 5m, 1d.
    #[arg(long, default_value = "1d")]
    timeframe: String,

    #[arg(long)]
    start: DateTime<Utc>,

    #[arg(long)]
    end: DateTime<Utc>,

    /// `symbol:strategy_name` pair to install as the initial active mapping.
    #[arg(long = "strategy")]
    strategy: String,

    #[arg(long = "initial-cash", default_value_t = 80_000.0)]
    initial_cash: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let timeframe = Timeframe::parse(&args.timeframe)
        .with_context(|| format!("invalid --timeframe '{}'", args.timeframe))?;

    let symbols: Vec<String> = args
        .symbols
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect();
    if symbols.is_empty() {
        anyhow::bail!("--symbols must name at least one symbol");
    }

    let (strategy_symbol, strategy_name) = args
        .strategy
        .split_once(':')
        .with_context(|| format!("--strategy must be 'symbol:strategy_name', got '{}'", args.strategy))?;

    let pool = twe_db::connect_from_env().await?;

    let mut strategies = StrategyManager::new(builtin_registry(), 5);
    strategies
        .swap_active(strategy_symbol.to_string(), strategy_name, &Portfolio::flat())
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    let broker = Arc::new(SimBrokerAdapter::new());
    let cfg = EngineConfig::taiwan_stock_defaults(args.initial_cash);
    let today = args.start.date_naive();
    let mut engine = TradingEngine::new(cfg, strategies, broker.clone(), today);

    let control = RuntimeControl::new();
    let summary = twe_runtime::run_bar_loop(
        &mut engine,
        &pool,
        &control,
        &symbols,
        timeframe,
        args.start,
        args.end,
        |bar| broker.set_mark_price(bar.symbol.clone(), bar.close),
    )
    .await?;

    println!("bars_processed={}", summary.bars_processed);
    println!("bars_skipped_paused={}", summary.bars_skipped_paused);
    println!("flattens_executed={}", summary.flattens_executed);
    println!("stopped_on_shutdown={}", summary.stopped_on_shutdown);
    println!("equity_twd={:.2}", engine.equity_twd());
    println!("daily_pnl_twd={:.2}", engine.risk().state().daily_pnl_twd);

    Ok(())
}
