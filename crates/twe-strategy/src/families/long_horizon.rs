use std::collections::BTreeMap;

use twe_indicators::momentum_pct;
use twe_schemas::{Bar, Direction, Portfolio, StrategyType, TradeSignal};

use crate::traits::Strategy;
use crate::window::SymbolWindows;

/// Dollar-cost averaging. Inputs: none beyond a bar counter. Parameters:
/// `interval_bars=20`. Output: a small fixed-confidence LONG entry every
/// `interval_bars` bars regardless of price, NEUTRAL otherwise. Exits are
/// left to the portfolio's own rebalancing cadence rather than this
/// strategy, matching a buy-and-hold accumulation mandate.
pub struct Dca {
    name: String,
    interval_bars: u32,
    bars_since_buy: BTreeMap<String, u32>,
}

impl Dca {
    pub fn new(name: impl Into<String>, interval_bars: u32) -> Self {
        Self {
            name: name.into(),
            interval_bars,
            bars_since_buy: BTreeMap::new(),
        }
    }
}

impl Strategy for Dca {
    fn name(&self) -> &str {
        &self.name
    }

    fn strategy_type(&self) -> StrategyType {
        StrategyType::LongTerm
    }

    fn execute(&mut self, _portfolio: &Portfolio, bar: &Bar) -> TradeSignal {
        let counter = self.bars_since_buy.entry(bar.symbol.clone()).or_insert(0);
        *counter += 1;
        if *counter >= self.interval_bars {
            *counter = 0;
            TradeSignal::new(Direction::Long, 0.55, "scheduled dollar-cost-average buy")
        } else {
            TradeSignal::neutral("between scheduled buys")
        }
    }

    fn reset(&mut self) {
        self.bars_since_buy.clear();
    }
}

/// Target-weight rebalancing, approximated to a single symbol. Inputs: the
/// position's current market value against a locally observable equity
/// proxy (`cash_twd` plus this symbol's position value — other symbols'
/// marks are not visible to a per-symbol `Strategy`, so this is a
/// deliberate approximation of portfolio-wide rebalancing). Parameters:
/// `target_weight=0.10`, `band_pct=0.02`. Output: LONG when the position's
/// weight has drifted `band_pct` below target, EXIT_LONG when it has
/// drifted `band_pct` above target.
pub struct Rebalancing {
    name: String,
    target_weight: f64,
    band_pct: f64,
}

impl Rebalancing {
    pub fn new(name: impl Into<String>, target_weight: f64, band_pct: f64) -> Self {
        Self {
            name: name.into(),
            target_weight,
            band_pct,
        }
    }
}

impl Strategy for Rebalancing {
    fn name(&self) -> &str {
        &self.name
    }

    fn strategy_type(&self) -> StrategyType {
        StrategyType::LongTerm
    }

    fn execute(&mut self, portfolio: &Portfolio, bar: &Bar) -> TradeSignal {
        let qty = portfolio.position_qty(&bar.symbol);
        let position_value = qty as f64 * bar.close;
        let equity_proxy = portfolio.cash_twd + position_value;
        if equity_proxy <= 0.0 {
            return TradeSignal::neutral("no observable equity to rebalance against");
        }
        let weight = position_value / equity_proxy;
        let drift = weight - self.target_weight;
        if drift < -self.band_pct {
            TradeSignal::new(Direction::Long, 0.5, format!("position {:.1}pp under target weight", -drift * 100.0))
        } else if drift > self.band_pct && qty > 0 {
            TradeSignal::new(Direction::ExitLong, 0.5, format!("position {:.1}pp over target weight", drift * 100.0))
        } else {
            TradeSignal::neutral("within rebalancing band")
        }
    }

    fn reset(&mut self) {}
}

/// Dual-timeframe absolute momentum. Inputs: closes at two independent
/// lookbacks. Warm-up: `max(short_lookback, long_lookback)+1` bars.
/// Parameters: `short_lookback=63` (~3 months), `long_lookback=252`
/// (~12 months). Output: LONG when both timeframes show positive momentum,
/// SHORT when both show negative momentum, else NEUTRAL. This is a
/// single-symbol, dual-timeframe variant of dual momentum: the classic
/// formulation also ranks relative momentum across a universe of symbols,
/// which a single `Strategy` instance bound to one symbol cannot see.
pub struct DualMomentum {
    name: String,
    short_lookback: usize,
    long_lookback: usize,
    bars: SymbolWindows,
}

impl DualMomentum {
    pub fn new(name: impl Into<String>, short_lookback: usize, long_lookback: usize) -> Self {
        let capacity = short_lookback.max(long_lookback) + 1;
        Self {
            name: name.into(),
            short_lookback,
            long_lookback,
            bars: SymbolWindows::new(capacity),
        }
    }
}

impl Strategy for DualMomentum {
    fn name(&self) -> &str {
        &self.name
    }

    fn strategy_type(&self) -> StrategyType {
        StrategyType::LongTerm
    }

    fn execute(&mut self, _portfolio: &Portfolio, bar: &Bar) -> TradeSignal {
        self.bars.push(bar);
        let closes = self.bars.closes(&bar.symbol);
        let (Some(short_mom), Some(long_mom)) = (
            momentum_pct(&closes, self.short_lookback),
            momentum_pct(&closes, self.long_lookback),
        ) else {
            return TradeSignal::warming_up();
        };
        if short_mom > 0.0 && long_mom > 0.0 {
            TradeSignal::new(Direction::Long, 0.6, "positive momentum across both horizons")
        } else if short_mom < 0.0 && long_mom < 0.0 {
            TradeSignal::new(Direction::Short, 0.6, "negative momentum across both horizons")
        } else {
            TradeSignal::neutral("momentum horizons disagree")
        }
    }

    fn reset(&mut self) {
        self.bars.clear();
    }
}
