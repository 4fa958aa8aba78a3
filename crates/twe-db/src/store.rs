//! Persistence for the spec's core data model: bars, quotes,
//! the strategy–symbol mapping table, backtest results, trades, signals,
//! veto events, daily statistics and the earnings-blackout calendar.
//!
//! Every query here uses the runtime `query`/`query_as` binding style, not
//! the `query!` compile-time macros — this crate has no `DATABASE_URL` at
//! build time to check against.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use twe_schemas::{
    Bar, BacktestResult, DailyStatistics, EarningsBlackoutDate, OrderBookData, PriceLevel,
    StrategyStockMapping, StrategyType, Timeframe, Trade, TradeSide, VetoEvent, VetoStage,
};

// ---------------------------------------------------------------------------
// bar
// ---------------------------------------------------------------------------

pub async fn insert_bar(pool: &PgPool, bar: &Bar) -> Result<()> {
    sqlx::query(
        "insert into bar (symbol, timeframe, ts, open, high, low, close, volume)
         values ($1, $2, $3, $4, $5, $6, $7, $8)
         on conflict (symbol, timeframe, ts) do update
         set open = excluded.open, high = excluded.high, low = excluded.low,
             close = excluded.close, volume = excluded.volume",
    )
    .bind(&bar.symbol)
    .bind(bar.timeframe.as_str())
    .bind(bar.timestamp)
    .bind(bar.open)
    .bind(bar.high)
    .bind(bar.low)
    .bind(bar.close)
    .bind(bar.volume as i64)
    .execute(pool)
    .await
    .context("insert_bar failed")?;
    Ok(())
}

/// Load bars for `symbol`/`timeframe` in ascending timestamp order, the
/// shape `twe-backtest` and live replay both consume.
pub async fn fetch_bars(
    pool: &PgPool,
    symbol: &str,
    timeframe: Timeframe,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<Bar>> {
    let rows = sqlx::query(
        "select symbol, timeframe, ts, open, high, low, close, volume
         from bar
         where symbol = $1 and timeframe = $2 and ts >= $3 and ts <= $4
         order by ts asc",
    )
    .bind(symbol)
    .bind(timeframe.as_str())
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
    .context("fetch_bars failed")?;

    let mut out = Vec::with_capacity(rows.len());
    for r in rows {
        let tf_str: String = r.try_get("timeframe")?;
        let tf = Timeframe::parse(&tf_str)
            .ok_or_else(|| anyhow::anyhow!("unknown timeframe in bar row: {tf_str}"))?;
        let volume: i64 = r.try_get("volume")?;
        out.push(Bar {
            symbol: r.try_get("symbol")?,
            timeframe: tf,
            timestamp: r.try_get("ts")?,
            open: r.try_get("open")?,
            high: r.try_get("high")?,
            low: r.try_get("low")?,
            close: r.try_get("close")?,
            volume: volume as u64,
        });
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// market_data / quote
// ---------------------------------------------------------------------------

pub async fn insert_market_data(
    pool: &PgPool,
    symbol: &str,
    ts: DateTime<Utc>,
    last_price: f64,
    volume: u64,
) -> Result<()> {
    sqlx::query(
        "insert into market_data (symbol, ts, last_price, volume)
         values ($1, $2, $3, $4)
         on conflict (symbol, ts) do update
         set last_price = excluded.last_price, volume = excluded.volume",
    )
    .bind(symbol)
    .bind(ts)
    .bind(last_price)
    .bind(volume as i64)
    .execute(pool)
    .await
    .context("insert_market_data failed")?;
    Ok(())
}

pub async fn insert_quote(
    pool: &PgPool,
    symbol: &str,
    ts: DateTime<Utc>,
    book: &OrderBookData,
) -> Result<()> {
    let bids = serde_json::to_value(&book.bids).context("serialize bids failed")?;
    let asks = serde_json::to_value(&book.asks).context("serialize asks failed")?;
    sqlx::query(
        "insert into quote (symbol, ts, bids_json, asks_json)
         values ($1, $2, $3, $4)
         on conflict (symbol, ts) do update
         set bids_json = excluded.bids_json, asks_json = excluded.asks_json",
    )
    .bind(symbol)
    .bind(ts)
    .bind(bids)
    .bind(asks)
    .execute(pool)
    .await
    .context("insert_quote failed")?;
    Ok(())
}

pub async fn fetch_latest_quote(pool: &PgPool, symbol: &str) -> Result<Option<OrderBookData>> {
    let row = sqlx::query(
        "select bids_json, asks_json from quote where symbol = $1 order by ts desc limit 1",
    )
    .bind(symbol)
    .fetch_optional(pool)
    .await
    .context("fetch_latest_quote failed")?;

    let Some(row) = row else { return Ok(None) };
    let bids: Vec<PriceLevel> = serde_json::from_value(row.try_get("bids_json")?)
        .context("deserialize bids_json failed")?;
    let asks: Vec<PriceLevel> = serde_json::from_value(row.try_get("asks_json")?)
        .context("deserialize asks_json failed")?;
    Ok(Some(OrderBookData { bids, asks }))
}

// ---------------------------------------------------------------------------
// strategy_stock_mapping
// ---------------------------------------------------------------------------

pub async fn upsert_mapping(pool: &PgPool, m: &StrategyStockMapping) -> Result<()> {
    sqlx::query(
        "insert into strategy_stock_mapping
            (symbol, strategy_name, is_active, confidence_score, total_return_pct,
             sharpe_ratio, win_rate_pct, max_drawdown_pct, total_trades, updated_at)
         values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         on conflict (symbol, strategy_name) do update
         set is_active = excluded.is_active,
             confidence_score = excluded.confidence_score,
             total_return_pct = excluded.total_return_pct,
             sharpe_ratio = excluded.sharpe_ratio,
             win_rate_pct = excluded.win_rate_pct,
             max_drawdown_pct = excluded.max_drawdown_pct,
             total_trades = excluded.total_trades,
             updated_at = excluded.updated_at",
    )
    .bind(&m.symbol)
    .bind(&m.strategy_name)
    .bind(m.is_active)
    .bind(m.confidence_score)
    .bind(m.total_return_pct)
    .bind(m.sharpe_ratio)
    .bind(m.win_rate_pct)
    .bind(m.max_drawdown_pct)
    .bind(m.total_trades as i64)
    .bind(m.updated_at)
    .execute(pool)
    .await
    .context("upsert_mapping failed")?;
    Ok(())
}

pub async fn fetch_active_mapping(
    pool: &PgPool,
    symbol: &str,
) -> Result<Option<StrategyStockMapping>> {
    let row = sqlx::query(
        "select symbol, strategy_name, is_active, confidence_score, total_return_pct,
                sharpe_ratio, win_rate_pct, max_drawdown_pct, total_trades, updated_at
         from strategy_stock_mapping
         where symbol = $1 and is_active = true",
    )
    .bind(symbol)
    .fetch_optional(pool)
    .await
    .context("fetch_active_mapping failed")?;

    row.map(mapping_from_row).transpose()
}

pub async fn fetch_mappings_for_symbol(
    pool: &PgPool,
    symbol: &str,
) -> Result<Vec<StrategyStockMapping>> {
    let rows = sqlx::query(
        "select symbol, strategy_name, is_active, confidence_score, total_return_pct,
                sharpe_ratio, win_rate_pct, max_drawdown_pct, total_trades, updated_at
         from strategy_stock_mapping
         where symbol = $1
         order by strategy_name",
    )
    .bind(symbol)
    .fetch_all(pool)
    .await
    .context("fetch_mappings_for_symbol failed")?;

    rows.into_iter().map(mapping_from_row).collect()
}

fn mapping_from_row(row: sqlx::postgres::PgRow) -> Result<StrategyStockMapping> {
    let total_trades: i64 = row.try_get("total_trades")?;
    Ok(StrategyStockMapping {
        symbol: row.try_get("symbol")?,
        strategy_name: row.try_get("strategy_name")?,
        is_active: row.try_get("is_active")?,
        confidence_score: row.try_get("confidence_score")?,
        total_return_pct: row.try_get("total_return_pct")?,
        sharpe_ratio: row.try_get("sharpe_ratio")?,
        win_rate_pct: row.try_get("win_rate_pct")?,
        max_drawdown_pct: row.try_get("max_drawdown_pct")?,
        total_trades: total_trades as u32,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Atomically promote `winner` to `is_active = true` for its symbol and
/// demote every other mapping of that symbol to shadow (/// exactly one active strategy per symbol at a time). Runs in a single
/// transaction so a reader never observes two active rows, or zero.
pub async fn promote_mapping(pool: &PgPool, winner: &StrategyStockMapping) -> Result<()> {
    let mut tx = pool.begin().await.context("begin promote_mapping tx failed")?;

    sqlx::query("update strategy_stock_mapping set is_active = false where symbol = $1")
        .bind(&winner.symbol)
        .execute(&mut *tx)
        .await
        .context("demote existing mappings failed")?;

    sqlx::query(
        "insert into strategy_stock_mapping
            (symbol, strategy_name, is_active, confidence_score, total_return_pct,
             sharpe_ratio, win_rate_pct, max_drawdown_pct, total_trades, updated_at)
         values ($1, $2, true, $3, $4, $5, $6, $7, $8, $9)
         on conflict (symbol, strategy_name) do update
         set is_active = true,
             confidence_score = excluded.confidence_score,
             total_return_pct = excluded.total_return_pct,
             sharpe_ratio = excluded.sharpe_ratio,
             win_rate_pct = excluded.win_rate_pct,
             max_drawdown_pct = excluded.max_drawdown_pct,
             total_trades = excluded.total_trades,
             updated_at = excluded.updated_at",
    )
    .bind(&winner.symbol)
    .bind(&winner.strategy_name)
    .bind(winner.confidence_score)
    .bind(winner.total_return_pct)
    .bind(winner.sharpe_ratio)
    .bind(winner.win_rate_pct)
    .bind(winner.max_drawdown_pct)
    .bind(winner.total_trades as i64)
    .bind(winner.updated_at)
    .execute(&mut *tx)
    .await
    .context("activate winner mapping failed")?;

    tx.commit().await.context("commit promote_mapping tx failed")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// backtest_results
// ---------------------------------------------------------------------------

pub async fn insert_backtest_result(pool: &PgPool, result: &BacktestResult, fitness: f64) -> Result<()> {
    let equity_curve_json =
        serde_json::to_value(&result.equity_curve).context("serialize equity curve failed")?;
    sqlx::query(
        "insert into backtest_results
            (backtest_run_id, symbol, strategy_name, total_return_pct, sharpe_ratio,
             sortino_ratio, calmar_ratio, win_rate_pct, max_drawdown_pct, total_trades,
             average_hold_bars, fitness, equity_curve_json)
         values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
         on conflict (backtest_run_id, symbol, strategy_name) do update
         set total_return_pct = excluded.total_return_pct,
             sharpe_ratio = excluded.sharpe_ratio,
             sortino_ratio = excluded.sortino_ratio,
             calmar_ratio = excluded.calmar_ratio,
             win_rate_pct = excluded.win_rate_pct,
             max_drawdown_pct = excluded.max_drawdown_pct,
             total_trades = excluded.total_trades,
             average_hold_bars = excluded.average_hold_bars,
             fitness = excluded.fitness,
             equity_curve_json = excluded.equity_curve_json",
    )
    .bind(result.backtest_run_id)
    .bind(&result.symbol)
    .bind(&result.strategy_name)
    .bind(result.total_return_pct)
    .bind(result.sharpe_ratio)
    .bind(result.sortino_ratio)
    .bind(result.calmar_ratio)
    .bind(result.win_rate_pct)
    .bind(result.max_drawdown_pct)
    .bind(result.total_trades as i64)
    .bind(result.average_hold_bars)
    .bind(fitness)
    .bind(equity_curve_json)
    .execute(pool)
    .await
    .context("insert_backtest_result failed")?;
    Ok(())
}

pub async fn fetch_backtest_results(
    pool: &PgPool,
    backtest_run_id: Uuid,
) -> Result<Vec<BacktestResult>> {
    let rows = sqlx::query(
        "select backtest_run_id, symbol, strategy_name, total_return_pct, sharpe_ratio,
                sortino_ratio, calmar_ratio, win_rate_pct, max_drawdown_pct, total_trades,
                average_hold_bars, equity_curve_json
         from backtest_results
         where backtest_run_id = $1
         order by symbol, strategy_name",
    )
    .bind(backtest_run_id)
    .fetch_all(pool)
    .await
    .context("fetch_backtest_results failed")?;

    let mut out = Vec::with_capacity(rows.len());
    for r in rows {
        let total_trades: i64 = r.try_get("total_trades")?;
        let equity_curve: Vec<(DateTime<Utc>, f64)> =
            serde_json::from_value(r.try_get("equity_curve_json")?)
                .context("deserialize equity_curve_json failed")?;
        out.push(BacktestResult {
            backtest_run_id: r.try_get("backtest_run_id")?,
            symbol: r.try_get("symbol")?,
            strategy_name: r.try_get("strategy_name")?,
            total_return_pct: r.try_get("total_return_pct")?,
            sharpe_ratio: r.try_get("sharpe_ratio")?,
            sortino_ratio: r.try_get("sortino_ratio")?,
            calmar_ratio: r.try_get("calmar_ratio")?,
            win_rate_pct: r.try_get("win_rate_pct")?,
            max_drawdown_pct: r.try_get("max_drawdown_pct")?,
            total_trades: total_trades as u32,
            average_hold_bars: r.try_get("average_hold_bars")?,
            equity_curve,
        });
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// trade / trade_attempt
// ---------------------------------------------------------------------------

fn trade_side_str(side: TradeSide) -> &'static str {
    match side {
        TradeSide::Buy => "BUY",
        TradeSide::Sell => "SELL",
    }
}

pub async fn insert_trade(
    pool: &PgPool,
    run_id: Option<Uuid>,
    is_shadow: bool,
    trade: &Trade,
) -> Result<()> {
    sqlx::query(
        "insert into trade
            (run_id, symbol, strategy_name, side, qty, entry_price, exit_price,
             realized_pnl, is_shadow, opened_at, closed_at)
         values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(run_id)
    .bind(&trade.symbol)
    .bind(&trade.strategy_name)
    .bind(trade_side_str(trade.side))
    .bind(trade.qty as i64)
    .bind(trade.entry_price)
    .bind(trade.exit_price)
    .bind(trade.realized_pnl)
    .bind(is_shadow)
    .bind(trade.opened_at)
    .bind(trade.closed_at)
    .execute(pool)
    .await
    .context("insert_trade failed")?;
    Ok(())
}

pub async fn insert_trade_attempt(
    pool: &PgPool,
    run_id: Option<Uuid>,
    attempt: &twe_schemas::TradeAttempt,
) -> Result<()> {
    sqlx::query(
        "insert into trade_attempt (run_id, symbol, side, qty, broker_error, attempt_no, ts)
         values ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(run_id)
    .bind(&attempt.symbol)
    .bind(trade_side_str(attempt.side))
    .bind(attempt.qty as i64)
    .bind(&attempt.broker_error)
    .bind(attempt.attempt_no as i32)
    .bind(attempt.ts)
    .execute(pool)
    .await
    .context("insert_trade_attempt failed")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// signal
// ---------------------------------------------------------------------------

pub async fn insert_signal(
    pool: &PgPool,
    run_id: Option<Uuid>,
    symbol: &str,
    strategy_name: &str,
    direction: &str,
    confidence: f64,
    reason: &str,
    is_shadow: bool,
    bar_ts: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "insert into signal
            (run_id, symbol, strategy_name, direction, confidence, reason, is_shadow, bar_ts)
         values ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(run_id)
    .bind(symbol)
    .bind(strategy_name)
    .bind(direction)
    .bind(confidence)
    .bind(reason)
    .bind(is_shadow)
    .bind(bar_ts)
    .execute(pool)
    .await
    .context("insert_signal failed")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// veto_event
// ---------------------------------------------------------------------------

fn veto_stage_str(stage: VetoStage) -> &'static str {
    match stage {
        VetoStage::Window => "WINDOW",
        VetoStage::Emergency => "EMERGENCY",
        VetoStage::Freshness => "FRESHNESS",
        VetoStage::Compliance => "COMPLIANCE",
        VetoStage::EarningsBlackout => "EARNINGS_BLACKOUT",
        VetoStage::Regime => "REGIME",
        VetoStage::Correlation => "CORRELATION",
        VetoStage::Concentration => "CONCENTRATION",
        VetoStage::Risk => "RISK",
        VetoStage::Advisor => "ADVISOR",
        VetoStage::StopLoss => "STOP_LOSS",
    }
}

fn veto_stage_parse(s: &str) -> Option<VetoStage> {
    Some(match s {
        "WINDOW" => VetoStage::Window,
        "EMERGENCY" => VetoStage::Emergency,
        "FRESHNESS" => VetoStage::Freshness,
        "COMPLIANCE" => VetoStage::Compliance,
        "EARNINGS_BLACKOUT" => VetoStage::EarningsBlackout,
        "REGIME" => VetoStage::Regime,
        "CORRELATION" => VetoStage::Correlation,
        "CONCENTRATION" => VetoStage::Concentration,
        "RISK" => VetoStage::Risk,
        "ADVISOR" => VetoStage::Advisor,
        "STOP_LOSS" => VetoStage::StopLoss,
        _ => return None,
    })
}

pub async fn insert_veto_event(
    pool: &PgPool,
    run_id: Option<Uuid>,
    event: &VetoEvent,
) -> Result<()> {
    sqlx::query(
        "insert into veto_event (id, run_id, ts, symbol, strategy_name, stage, reason)
         values ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(event.id)
    .bind(run_id)
    .bind(event.ts)
    .bind(&event.symbol)
    .bind(&event.strategy_name)
    .bind(veto_stage_str(event.stage))
    .bind(&event.reason)
    .execute(pool)
    .await
    .context("insert_veto_event failed")?;
    Ok(())
}

pub async fn fetch_veto_events_for_symbol(
    pool: &PgPool,
    symbol: &str,
    limit: i64,
) -> Result<Vec<VetoEvent>> {
    let rows = sqlx::query(
        "select id, ts, symbol, strategy_name, stage, reason
         from veto_event
         where symbol = $1
         order by ts desc
         limit $2",
    )
    .bind(symbol)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("fetch_veto_events_for_symbol failed")?;

    let mut out = Vec::with_capacity(rows.len());
    for r in rows {
        let stage_str: String = r.try_get("stage")?;
        let stage = veto_stage_parse(&stage_str)
            .ok_or_else(|| anyhow::anyhow!("unknown veto stage in row: {stage_str}"))?;
        out.push(VetoEvent {
            id: r.try_get("id")?,
            ts: r.try_get("ts")?,
            symbol: r.try_get("symbol")?,
            strategy_name: r.try_get("strategy_name")?,
            stage,
            reason: r.try_get("reason")?,
        });
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// daily_statistics
// ---------------------------------------------------------------------------

pub async fn upsert_daily_statistics(pool: &PgPool, stats: &DailyStatistics) -> Result<()> {
    sqlx::query(
        "insert into daily_statistics
            (trading_date, starting_equity_twd, ending_equity_twd, realized_pnl_twd,
             trades_count, veto_count)
         values ($1, $2, $3, $4, $5, $6)
         on conflict (trading_date) do update
         set ending_equity_twd = excluded.ending_equity_twd,
             realized_pnl_twd = excluded.realized_pnl_twd,
             trades_count = excluded.trades_count,
             veto_count = excluded.veto_count",
    )
    .bind(stats.date)
    .bind(stats.starting_equity_twd)
    .bind(stats.ending_equity_twd)
    .bind(stats.realized_pnl_twd)
    .bind(stats.trades_count as i64)
    .bind(stats.veto_count as i64)
    .execute(pool)
    .await
    .context("upsert_daily_statistics failed")?;
    Ok(())
}

pub async fn fetch_daily_statistics(
    pool: &PgPool,
    trading_date: NaiveDate,
) -> Result<Option<DailyStatistics>> {
    let row = sqlx::query(
        "select trading_date, starting_equity_twd, ending_equity_twd, realized_pnl_twd,
                trades_count, veto_count
         from daily_statistics
         where trading_date = $1",
    )
    .bind(trading_date)
    .fetch_optional(pool)
    .await
    .context("fetch_daily_statistics failed")?;

    let Some(row) = row else { return Ok(None) };
    let trades_count: i64 = row.try_get("trades_count")?;
    let veto_count: i64 = row.try_get("veto_count")?;
    Ok(Some(DailyStatistics {
        date: row.try_get("trading_date")?,
        starting_equity_twd: row.try_get("starting_equity_twd")?,
        ending_equity_twd: row.try_get("ending_equity_twd")?,
        realized_pnl_twd: row.try_get("realized_pnl_twd")?,
        trades_count: trades_count as u32,
        veto_count: veto_count as u32,
    }))
}

// ---------------------------------------------------------------------------
// earnings_blackout_date
// ---------------------------------------------------------------------------

pub async fn insert_earnings_blackout_date(
    pool: &PgPool,
    date: &EarningsBlackoutDate,
) -> Result<()> {
    sqlx::query(
        "insert into earnings_blackout_date (symbol, earnings_date)
         values ($1, $2)
         on conflict (symbol, earnings_date) do nothing",
    )
    .bind(&date.symbol)
    .bind(date.earnings_date)
    .execute(pool)
    .await
    .context("insert_earnings_blackout_date failed")?;
    Ok(())
}

pub async fn fetch_earnings_blackout_dates(
    pool: &PgPool,
    symbol: &str,
) -> Result<Vec<NaiveDate>> {
    let rows = sqlx::query("select earnings_date from earnings_blackout_date where symbol = $1 order by earnings_date")
        .bind(symbol)
        .fetch_all(pool)
        .await
        .context("fetch_earnings_blackout_dates failed")?;

    rows.into_iter()
        .map(|r| r.try_get::<NaiveDate, _>("earnings_date").map_err(Into::into))
        .collect()
}

/// Unused import guard: `StrategyType` is part of the public re-export
/// surface this module's callers use alongside `StrategyStockMapping`.
#[allow(dead_code)]
fn _assert_strategy_type_exported(_s: StrategyType) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeframe_roundtrips_through_as_str() {
        for tf in [
            Timeframe::Tick,
            Timeframe::M1,
            Timeframe::M5,
            Timeframe::M15,
            Timeframe::M30,
            Timeframe::H1,
            Timeframe::D1,
        ] {
            assert_eq!(Timeframe::parse(tf.as_str()), Some(tf));
        }
    }
}
