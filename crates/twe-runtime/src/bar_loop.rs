//! The live/paper bar-driven run loop. Pulls persisted
//! bars for a fixed symbol set from `twe-db`, interleaves them in timestamp
//! order, and feeds each one through `TradingEngine::on_bar` — checking
//! `RuntimeControl` exactly once between bars, never mid-bar, so a
//! `pause`/`flatten`/`shutdown` command from the control plane always lands
//! on a tick boundary.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use twe_engine::{BarOutcome, TradingEngine};
use twe_execution::BrokerAdapter;
use twe_schemas::{Bar, Timeframe};

use crate::control::RuntimeControl;

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub bars_processed: u64,
    pub bars_skipped_paused: u64,
    pub flattens_executed: u64,
    pub stopped_on_shutdown: bool,
}

/// Load every symbol's bars in `[start, end]`, merge them into one
/// ascending-timestamp stream. Ties between symbols at the same timestamp
/// are broken lexicographically by symbol for determinism.
async fn load_merged_bars(
    pool: &PgPool,
    symbols: &[String],
    timeframe: Timeframe,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> anyhow::Result<Vec<Bar>> {
    let mut merged = Vec::new();
    for symbol in symbols {
        let bars = twe_db::fetch_bars(pool, symbol, timeframe, start, end).await?;
        merged.extend(bars);
    }
    merged.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.symbol.cmp(&b.symbol)));
    Ok(merged)
}

/// Drive `engine` through every persisted bar for `symbols` between
/// `start` and `end`, honoring `control` between each bar. `on_bar` runs
/// immediately before each bar is routed into the engine — a live bridge
/// adapter has no use for it (a no-op closure is fine), but a paper/sim
/// adapter that fills at a caller-supplied mark price (e.g.
/// `twe-broker-sim::SimBrokerAdapter`) needs the mark set before the
/// engine can place an order off of it.
pub async fn run_bar_loop<B: BrokerAdapter>(
    engine: &mut TradingEngine<B>,
    pool: &PgPool,
    control: &RuntimeControl,
    symbols: &[String],
    timeframe: Timeframe,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    mut on_bar: impl FnMut(&Bar),
) -> anyhow::Result<RunSummary> {
    let bars = load_merged_bars(pool, symbols, timeframe, start, end).await?;
    let mut summary = RunSummary::default();

    for bar in &bars {
        if control.is_shutdown_requested() {
            summary.stopped_on_shutdown = true;
            break;
        }

        if control.take_flatten_request() {
            let closed = engine.flatten_all(bar.timestamp).await;
            summary.flattens_executed += closed.len() as u64;
        }

        if control.is_paused() {
            summary.bars_skipped_paused += 1;
            continue;
        }

        on_bar(bar);
        let outcome: BarOutcome = engine.on_bar(bar, bar.timestamp).await;
        if outcome.closed_trade.is_some() {
            tracing::info!(symbol = %bar.symbol, ts = %bar.timestamp, "bar closed a trade");
        }
        summary.bars_processed += 1;
    }

    Ok(summary)
}
