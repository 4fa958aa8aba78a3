use twe_schemas::{Bar, Portfolio, StrategyType, TradeSignal};

/// Uniform contract every strategy implements.
///
/// `execute` is called in strict bar-timestamp order per symbol and must be
/// deterministic given the sequence of `(portfolio, bar)` inputs since the
/// last `reset()`. Strategies never emit orders, never access the bar
/// store, and never read the clock except via `bar.timestamp`.
pub trait Strategy: Send {
    /// Stable name, used as the primary key in `StrategyStockMapping`.
    fn name(&self) -> &str;

    fn strategy_type(&self) -> StrategyType;

    fn execute(&mut self, portfolio: &Portfolio, bar: &Bar) -> TradeSignal;

    /// Drop all internal state (rolling windows, warm-up counters). Called
    /// by `StrategyManager` whenever a mapping is installed or swapped out.
    fn reset(&mut self);
}
