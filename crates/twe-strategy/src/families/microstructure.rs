use twe_schemas::{Bar, Direction, OrderBookData, Portfolio, StrategyType, TradeSignal};

/// Order-flow imbalance. Inputs: the top-N order book when available (fed
/// via [`OrderFlowImbalance::on_quote`]), else a price×volume proxy derived
/// from the bar itself. Warm-up: none (stateless per-bar signal smoothed
/// over `smoothing` bars). Parameters: `smoothing=5`, `threshold=0.3`.
/// Output: LONG when smoothed imbalance exceeds `+threshold`, SHORT below
/// `-threshold`.
///
/// The `Strategy` contract only hands strategies `(portfolio, bar)`, so the
/// live order book (when the bridge provides one) is pushed in separately by
/// the caller via `on_quote` before `execute` runs for that symbol/bar.
use crate::traits::Strategy;

pub struct OrderFlowImbalance {
    name: String,
    smoothing: usize,
    threshold: f64,
    latest_book_imbalance: std::collections::BTreeMap<String, f64>,
    history: std::collections::BTreeMap<String, std::collections::VecDeque<f64>>,
}

impl OrderFlowImbalance {
    pub fn new(name: impl Into<String>, smoothing: usize, threshold: f64) -> Self {
        Self {
            name: name.into(),
            smoothing,
            threshold,
            latest_book_imbalance: Default::default(),
            history: Default::default(),
        }
    }

    /// Feed the most recent order book snapshot for a symbol. Called by the
    /// engine ahead of `execute` whenever a fresh quote arrives.
    pub fn on_quote(&mut self, symbol: &str, book: &OrderBookData) {
        if let Some(imbalance) = book.imbalance() {
            self.latest_book_imbalance.insert(symbol.to_string(), imbalance);
        }
    }

    fn price_volume_proxy(bar: &Bar) -> f64 {
        let range = bar.high - bar.low;
        if range <= 0.0 {
            return 0.0;
        }
        // Bars that close in the top half of their range on above-average
        // effort read as buy-side pressure, and vice versa.
        let position_in_range = (bar.close - bar.low) / range - 0.5;
        (position_in_range * 2.0).clamp(-1.0, 1.0)
    }
}

impl Strategy for OrderFlowImbalance {
    fn name(&self) -> &str {
        &self.name
    }

    fn strategy_type(&self) -> StrategyType {
        StrategyType::Intraday
    }

    fn execute(&mut self, _portfolio: &Portfolio, bar: &Bar) -> TradeSignal {
        let imbalance = self
            .latest_book_imbalance
            .remove(&bar.symbol)
            .unwrap_or_else(|| Self::price_volume_proxy(bar));

        let window = self.history.entry(bar.symbol.clone()).or_default();
        window.push_back(imbalance);
        while window.len() > self.smoothing {
            window.pop_front();
        }
        if window.len() < self.smoothing {
            return TradeSignal::warming_up();
        }
        let avg = window.iter().sum::<f64>() / window.len() as f64;
        if avg > self.threshold {
            TradeSignal::new(Direction::Long, 0.6, format!("order-flow imbalance {avg:.2} buy-side"))
        } else if avg < -self.threshold {
            TradeSignal::new(Direction::Short, 0.6, format!("order-flow imbalance {avg:.2} sell-side"))
        } else {
            TradeSignal::neutral("order flow balanced")
        }
    }

    fn reset(&mut self) {
        self.latest_book_imbalance.clear();
        self.history.clear();
    }
}
