use twe_indicators::{aroon, balance_of_power, macd, momentum_pct};
use twe_schemas::{Bar, Direction, Portfolio, StrategyType, TradeSignal};

use crate::traits::Strategy;
use crate::window::SymbolWindows;

/// Price momentum. Inputs: closes. Warm-up: `lookback+1` bars. Parameters:
/// `lookback=20`, `threshold=0.05`. Output: LONG above `+threshold`, SHORT
/// below `-threshold`.
pub struct MomentumPctStrategy {
    name: String,
    lookback: usize,
    threshold: f64,
    bars: SymbolWindows,
}

impl MomentumPctStrategy {
    pub fn new(name: impl Into<String>, lookback: usize, threshold: f64) -> Self {
        Self {
            name: name.into(),
            lookback,
            threshold,
            bars: SymbolWindows::new(lookback + 1),
        }
    }
}

impl Strategy for MomentumPctStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn strategy_type(&self) -> StrategyType {
        StrategyType::ShortTerm
    }

    fn execute(&mut self, _portfolio: &Portfolio, bar: &Bar) -> TradeSignal {
        self.bars.push(bar);
        let closes = self.bars.closes(&bar.symbol);
        let Some(pct) = momentum_pct(&closes, self.lookback) else {
            return TradeSignal::warming_up();
        };
        let confidence = (0.5 + pct.abs() * 2.0).min(0.9);
        if pct > self.threshold {
            TradeSignal::new(Direction::Long, confidence, format!("{:.1}% momentum over {} bars", pct * 100.0, self.lookback))
        } else if pct < -self.threshold {
            TradeSignal::new(Direction::Short, confidence, format!("{:.1}% momentum over {} bars", pct * 100.0, self.lookback))
        } else {
            TradeSignal::neutral("momentum within threshold")
        }
    }

    fn reset(&mut self) {
        self.bars.clear();
    }
}

/// MACD momentum. Inputs: closes. Warm-up: `slow+signal` bars. Parameters:
/// `fast=12`, `slow=26`, `signal=9`. Output: LONG on histogram turning
/// positive, SHORT on turning negative.
pub struct MacdMomentum {
    name: String,
    fast: usize,
    slow: usize,
    signal: usize,
    bars: SymbolWindows,
    prev_histogram_sign: std::collections::BTreeMap<String, i8>,
}

impl MacdMomentum {
    pub fn new(name: impl Into<String>, fast: usize, slow: usize, signal: usize) -> Self {
        Self {
            name: name.into(),
            fast,
            slow,
            signal,
            bars: SymbolWindows::new(slow + signal + 5),
            prev_histogram_sign: Default::default(),
        }
    }
}

impl Strategy for MacdMomentum {
    fn name(&self) -> &str {
        &self.name
    }

    fn strategy_type(&self) -> StrategyType {
        StrategyType::ShortTerm
    }

    fn execute(&mut self, _portfolio: &Portfolio, bar: &Bar) -> TradeSignal {
        self.bars.push(bar);
        let closes = self.bars.closes(&bar.symbol);
        let Some(result) = macd(&closes, self.fast, self.slow, self.signal) else {
            return TradeSignal::warming_up();
        };
        let sign: i8 = if result.histogram > 0.0 { 1 } else if result.histogram < 0.0 { -1 } else { 0 };
        let prev = self.prev_histogram_sign.insert(bar.symbol.clone(), sign).unwrap_or(0);
        if prev <= 0 && sign > 0 {
            TradeSignal::new(Direction::Long, 0.65, "MACD histogram turned positive")
        } else if prev >= 0 && sign < 0 {
            TradeSignal::new(Direction::Short, 0.65, "MACD histogram turned negative")
        } else {
            TradeSignal::neutral("no MACD histogram sign change")
        }
    }

    fn reset(&mut self) {
        self.bars.clear();
        self.prev_histogram_sign.clear();
    }
}

/// Balance-of-power momentum. Inputs: one bar's OHLC smoothed over
/// `smoothing` bars. Parameters: `smoothing=14`, `threshold=0.3`. Output:
/// LONG when smoothed BOP exceeds `+threshold`, SHORT below `-threshold`.
pub struct BalanceOfPowerMomentum {
    name: String,
    smoothing: usize,
    threshold: f64,
    values: std::collections::BTreeMap<String, std::collections::VecDeque<f64>>,
}

impl BalanceOfPowerMomentum {
    pub fn new(name: impl Into<String>, smoothing: usize, threshold: f64) -> Self {
        Self {
            name: name.into(),
            smoothing,
            threshold,
            values: Default::default(),
        }
    }
}

impl Strategy for BalanceOfPowerMomentum {
    fn name(&self) -> &str {
        &self.name
    }

    fn strategy_type(&self) -> StrategyType {
        StrategyType::Intraday
    }

    fn execute(&mut self, _portfolio: &Portfolio, bar: &Bar) -> TradeSignal {
        let Some(bop) = balance_of_power(bar.open, bar.high, bar.low, bar.close) else {
            return TradeSignal::neutral("flat range, balance of power undefined");
        };
        let window = self.values.entry(bar.symbol.clone()).or_default();
        window.push_back(bop);
        while window.len() > self.smoothing {
            window.pop_front();
        }
        if window.len() < self.smoothing {
            return TradeSignal::warming_up();
        }
        let avg = window.iter().sum::<f64>() / window.len() as f64;
        if avg > self.threshold {
            TradeSignal::new(Direction::Long, 0.6, format!("smoothed balance of power {avg:.2}"))
        } else if avg < -self.threshold {
            TradeSignal::new(Direction::Short, 0.6, format!("smoothed balance of power {avg:.2}"))
        } else {
            TradeSignal::neutral("balance of power within threshold")
        }
    }

    fn reset(&mut self) {
        self.values.clear();
    }
}

/// Aroon momentum. Inputs: highs/lows. Warm-up: `period+1` bars.
/// Parameters: `period=25`. Output: LONG when `Aroon up ≥ 70` and
/// `Aroon down ≤ 30`, SHORT on the reverse.
pub struct AroonMomentum {
    name: String,
    period: usize,
    bars: SymbolWindows,
}

impl AroonMomentum {
    pub fn new(name: impl Into<String>, period: usize) -> Self {
        Self {
            name: name.into(),
            period,
            bars: SymbolWindows::new(period + 1),
        }
    }
}

impl Strategy for AroonMomentum {
    fn name(&self) -> &str {
        &self.name
    }

    fn strategy_type(&self) -> StrategyType {
        StrategyType::Swing
    }

    fn execute(&mut self, _portfolio: &Portfolio, bar: &Bar) -> TradeSignal {
        self.bars.push(bar);
        let highs = self.bars.highs(&bar.symbol);
        let lows = self.bars.lows(&bar.symbol);
        let Some(a) = aroon(&highs, &lows, self.period) else {
            return TradeSignal::warming_up();
        };
        if a.up >= 70.0 && a.down <= 30.0 {
            TradeSignal::new(Direction::Long, 0.6, "Aroon up dominant")
        } else if a.down >= 70.0 && a.up <= 30.0 {
            TradeSignal::new(Direction::Short, 0.6, "Aroon down dominant")
        } else {
            TradeSignal::neutral("Aroon inconclusive")
        }
    }

    fn reset(&mut self) {
        self.bars.clear();
    }
}
