//! Deterministic per-`(strategy, symbol)` replay.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use twe_portfolio::{ClosedTrade, PositionBook};
use twe_schemas::{Bar, Direction, Portfolio, TradeSide, TradeSignal};
use twe_sizing::{recommend, SizingInputs};
use twe_strategy::Strategy;

use crate::metrics::compute_metrics;
use crate::types::{BacktestConfig, ReplayOutcome};

fn entry_side(direction: Direction) -> Option<TradeSide> {
    match direction {
        Direction::Long => Some(TradeSide::Buy),
        Direction::Short => Some(TradeSide::Sell),
        _ => None,
    }
}

fn exit_side(direction: Direction) -> Option<TradeSide> {
    match direction {
        Direction::ExitLong => Some(TradeSide::Sell),
        Direction::ExitShort => Some(TradeSide::Buy),
        _ => None,
    }
}

/// Replays one strategy instance against one symbol's bar history, bar by
/// bar, in strict ascending order. Each call to [`run`]
/// resets the strategy and the internal ledger first, so the same engine
/// can be reused across an evaluation matrix without reallocating.
///
/// [`run`]: BacktestEngine::run
pub struct BacktestEngine {
    strategy: Box<dyn Strategy>,
    config: BacktestConfig,
    book: PositionBook,
    cash_twd: f64,
    equity_curve: Vec<(DateTime<Utc>, f64)>,
    closed_trades: Vec<ClosedTrade>,
    hold_bars: Vec<u64>,
    position_opened_at_bar: Option<usize>,
}

impl BacktestEngine {
    pub fn new(strategy: Box<dyn Strategy>, config: BacktestConfig) -> Self {
        Self {
            strategy,
            cash_twd: config.initial_capital_twd,
            config,
            book: PositionBook::new(),
            equity_curve: Vec::new(),
            closed_trades: Vec::new(),
            hold_bars: Vec::new(),
            position_opened_at_bar: None,
        }
    }

    fn portfolio_snapshot(&self, symbol: &str) -> Portfolio {
        let mut positions = BTreeMap::new();
        let mut avg_entry_price = BTreeMap::new();
        if let Some(pos) = self.book.position(symbol) {
            positions.insert(symbol.to_string(), pos.signed_qty);
            avg_entry_price.insert(symbol.to_string(), pos.avg_entry_price);
        }
        Portfolio {
            positions,
            cash_twd: self.cash_twd,
            avg_entry_price,
            realized_pnl_to_date: self.book.realized_pnl_to_date(),
        }
    }

    fn equity(&self, symbol: &str, close: f64) -> f64 {
        let mark = self.book.position(symbol).map(|p| p.signed_qty as f64 * close).unwrap_or(0.0);
        self.cash_twd + mark
    }

    fn size(&self, equity_twd: f64, price: f64) -> u64 {
        let inputs = SizingInputs {
            risk_pct: self.config.risk_pct,
            default_stop_distance: price * self.config.default_stop_distance_pct,
            atr_multiplier: 2.0,
            ..Default::default()
        };
        recommend(equity_twd, price, &inputs)
    }

    /// Apply one fill: move cash, charge commission, fold into the ledger,
    /// and track the hold-bar count for any round trip it closes.
    fn fill(&mut self, symbol: &str, side: TradeSide, qty: u64, bar: &Bar, bar_index: usize) {
        let price = self.config.slippage.fill_price(bar.close, side);
        let commission = self.config.slippage.commission(qty, price);
        match side {
            TradeSide::Buy => self.cash_twd -= qty as f64 * price + commission,
            TradeSide::Sell => self.cash_twd += qty as f64 * price - commission,
        }

        match self.book.apply_fill(symbol, side, qty, price, bar.timestamp) {
            Ok(Some(closed)) => {
                if let Some(start) = self.position_opened_at_bar {
                    self.hold_bars.push((bar_index - start) as u64);
                }
                self.closed_trades.push(closed);
                self.position_opened_at_bar = if self.book.is_flat(symbol) { None } else { Some(bar_index) };
            }
            Ok(None) => {
                self.position_opened_at_bar.get_or_insert(bar_index);
            }
            Err(_) => {}
        }
    }

    /// Run one full replay: `reset()` the strategy, then route every bar
    /// through it in order, simulating fills at the bar's close for
    /// actionable signals and folding the result into the ledger.
    pub fn run(&mut self, symbol: &str, bars: &[Bar]) -> ReplayOutcome {
        self.strategy.reset();
        self.book = PositionBook::new();
        self.cash_twd = self.config.initial_capital_twd;
        self.equity_curve.clear();
        self.closed_trades.clear();
        self.hold_bars.clear();
        self.position_opened_at_bar = None;

        let mut halted_reason = None;

        for (idx, bar) in bars.iter().enumerate() {
            if self.config.corporate_action_policy.is_excluded(symbol, bar.timestamp) {
                halted_reason = Some(format!(
                    "corporate action exclusion: {symbol} at {} is in a forbidden period",
                    bar.timestamp
                ));
                break;
            }

            let portfolio = self.portfolio_snapshot(symbol);
            let signal: TradeSignal = self.strategy.execute(&portfolio, bar);

            if let Some(side) = exit_side(signal.direction) {
                if let Some(qty) = self.book.position(symbol).map(|p| p.signed_qty.unsigned_abs()) {
                    if qty > 0 {
                        self.fill(symbol, side, qty, bar, idx);
                    }
                }
            } else if signal.is_actionable_entry(self.config.entry_threshold) && self.book.is_flat(symbol) {
                if let Some(side) = entry_side(signal.direction) {
                    let equity = self.equity(symbol, bar.close);
                    let qty = self.size(equity, bar.close);
                    if qty > 0 {
                        self.fill(symbol, side, qty, bar, idx);
                    }
                }
            }

            self.equity_curve.push((bar.timestamp, self.equity(symbol, bar.close)));
        }

        let metrics = compute_metrics(self.config.initial_capital_twd, &self.equity_curve, &self.closed_trades, &self.hold_bars);

        ReplayOutcome {
            symbol: symbol.to_string(),
            strategy_name: self.strategy.name().to_string(),
            metrics,
            equity_curve: self.equity_curve.clone(),
            closed_trades: self.closed_trades.clone(),
            halted_reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use twe_schemas::{StrategyType, Timeframe};

    struct AlwaysLong;
    impl Strategy for AlwaysLong {
        fn name(&self) -> &str {
            "always-long"
        }
        fn strategy_type(&self) -> StrategyType {
            StrategyType::ShortTerm
        }
        fn execute(&mut self, portfolio: &Portfolio, bar: &Bar) -> TradeSignal {
            if portfolio.is_flat(&bar.symbol) {
                TradeSignal::new(Direction::Long, 0.9, "always long")
            } else {
                TradeSignal::neutral("holding")
            }
        }
        fn reset(&mut self) {}
    }

    struct EnterThenExit(u32);
    impl Strategy for EnterThenExit {
        fn name(&self) -> &str {
            "enter-then-exit"
        }
        fn strategy_type(&self) -> StrategyType {
            StrategyType::ShortTerm
        }
        fn execute(&mut self, portfolio: &Portfolio, bar: &Bar) -> TradeSignal {
            self.0 += 1;
            if portfolio.is_flat(&bar.symbol) {
                TradeSignal::new(Direction::Long, 0.9, "enter")
            } else if self.0 >= 3 {
                TradeSignal::new(Direction::ExitLong, 1.0, "exit")
            } else {
                TradeSignal::neutral("holding")
            }
        }
        fn reset(&mut self) {
            self.0 = 0;
        }
    }

    fn bar(symbol: &str, close: f64, day: u32) -> Bar {
        Bar {
            symbol: symbol.to_string(),
            timeframe: Timeframe::D1,
            timestamp: Utc.with_ymd_and_hms(2026, 1, day, 0, 0, 0).unwrap(),
            open: close,
            high: close * 1.01,
            low: close * 0.99,
            close,
            volume: 10_000,
        }
    }

    #[test]
    fn flat_strategy_never_trades() {
        struct NeverTrade;
        impl Strategy for NeverTrade {
            fn name(&self) -> &str {
                "never"
            }
            fn strategy_type(&self) -> StrategyType {
                StrategyType::ShortTerm
            }
            fn execute(&mut self, _p: &Portfolio, _b: &Bar) -> TradeSignal {
                TradeSignal::neutral("never")
            }
            fn reset(&mut self) {}
        }

        let bars: Vec<Bar> = (1..=5).map(|d| bar("2330", 100.0, d)).collect();
        let mut engine = BacktestEngine::new(Box::new(NeverTrade), BacktestConfig::defaults());
        let result = engine.run("2330", &bars);
        assert_eq!(result.metrics.total_trades, 0);
        assert_eq!(result.metrics.total_return_pct, 0.0);
    }

    #[test]
    fn round_trip_produces_one_closed_trade_with_hold_bars() {
        let bars: Vec<Bar> = (1..=10).map(|d| bar("2330", 100.0 + d as f64, d)).collect();
        let mut engine = BacktestEngine::new(Box::new(EnterThenExit(0)), BacktestConfig::defaults());
        let result = engine.run("2330", &bars);
        assert_eq!(result.closed_trades.len(), 1);
        assert!(result.metrics.total_trades == 1);
        assert!(result.metrics.average_hold_bars >= 1.0);
    }

    #[test]
    fn rising_prices_grow_equity_for_a_held_long() {
        let bars: Vec<Bar> = (1..=20).map(|d| bar("2330", 100.0 + d as f64 * 2.0, d)).collect();
        let mut engine = BacktestEngine::new(Box::new(AlwaysLong), BacktestConfig::defaults());
        let result = engine.run("2330", &bars);
        assert!(result.metrics.total_return_pct > 0.0);
    }

    #[test]
    fn reset_between_runs_clears_prior_state() {
        let bars: Vec<Bar> = (1..=10).map(|d| bar("2330", 100.0 + d as f64, d)).collect();
        let mut engine = BacktestEngine::new(Box::new(EnterThenExit(0)), BacktestConfig::defaults());
        let first = engine.run("2330", &bars);
        let second = engine.run("2330", &bars);
        assert_eq!(first.metrics, second.metrics);
    }
}
