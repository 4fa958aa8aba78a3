use twe_indicators::{atr, bollinger_bands, pivot_points, rsi, stochastic};
use twe_schemas::{Bar, Direction, Portfolio, StrategyType, TradeSignal};

use crate::traits::Strategy;
use crate::window::SymbolWindows;

/// Bollinger mean reversion. Inputs: closes. Warm-up: `period` bars.
/// Parameters: `period=20`, `num_std=2.0`. Output: LONG when close closes
/// below the lower band (oversold), SHORT when above the upper band.
pub struct BollingerReversion {
    name: String,
    period: usize,
    num_std: f64,
    bars: SymbolWindows,
}

impl BollingerReversion {
    pub fn new(name: impl Into<String>, period: usize, num_std: f64) -> Self {
        Self {
            name: name.into(),
            period,
            num_std,
            bars: SymbolWindows::new(period),
        }
    }
}

impl Strategy for BollingerReversion {
    fn name(&self) -> &str {
        &self.name
    }

    fn strategy_type(&self) -> StrategyType {
        StrategyType::ShortTerm
    }

    fn execute(&mut self, _portfolio: &Portfolio, bar: &Bar) -> TradeSignal {
        self.bars.push(bar);
        let closes = self.bars.closes(&bar.symbol);
        let Some(bands) = bollinger_bands(&closes, self.period, self.num_std) else {
            return TradeSignal::warming_up();
        };
        if bar.close < bands.lower {
            TradeSignal::new(Direction::Long, 0.65, "close below lower Bollinger band")
        } else if bar.close > bands.upper {
            TradeSignal::new(Direction::Short, 0.65, "close above upper Bollinger band")
        } else {
            TradeSignal::neutral("inside Bollinger bands")
        }
    }

    fn reset(&mut self) {
        self.bars.clear();
    }
}

/// RSI mean reversion. Inputs: closes. Warm-up: `period+1` bars.
/// Parameters: `period=14`, `oversold=30`, `overbought=70`. Output: LONG
/// below `oversold`, SHORT above `overbought`.
pub struct RsiReversion {
    name: String,
    period: usize,
    oversold: f64,
    overbought: f64,
    bars: SymbolWindows,
}

impl RsiReversion {
    pub fn new(name: impl Into<String>, period: usize, oversold: f64, overbought: f64) -> Self {
        Self {
            name: name.into(),
            period,
            oversold,
            overbought,
            bars: SymbolWindows::new(period + 1),
        }
    }
}

impl Strategy for RsiReversion {
    fn name(&self) -> &str {
        &self.name
    }

    fn strategy_type(&self) -> StrategyType {
        StrategyType::ShortTerm
    }

    fn execute(&mut self, _portfolio: &Portfolio, bar: &Bar) -> TradeSignal {
        self.bars.push(bar);
        let closes = self.bars.closes(&bar.symbol);
        let Some(value) = rsi(&closes, self.period) else {
            return TradeSignal::warming_up();
        };
        if value < self.oversold {
            TradeSignal::new(Direction::Long, 0.6, format!("RSI {value:.1} oversold"))
        } else if value > self.overbought {
            TradeSignal::new(Direction::Short, 0.6, format!("RSI {value:.1} overbought"))
        } else {
            TradeSignal::neutral("RSI in neutral zone")
        }
    }

    fn reset(&mut self) {
        self.bars.clear();
    }
}

/// Stochastic mean reversion. Inputs: highs/lows/closes. Warm-up:
/// `period+d_period-1` bars. Parameters: `period=14`, `d_period=3`.
/// Output: LONG when %K and %D both below 20, SHORT when both above 80.
pub struct StochasticReversion {
    name: String,
    period: usize,
    d_period: usize,
    bars: SymbolWindows,
}

impl StochasticReversion {
    pub fn new(name: impl Into<String>, period: usize, d_period: usize) -> Self {
        Self {
            name: name.into(),
            period,
            d_period,
            bars: SymbolWindows::new(period + d_period + 1),
        }
    }
}

impl Strategy for StochasticReversion {
    fn name(&self) -> &str {
        &self.name
    }

    fn strategy_type(&self) -> StrategyType {
        StrategyType::ShortTerm
    }

    fn execute(&mut self, _portfolio: &Portfolio, bar: &Bar) -> TradeSignal {
        self.bars.push(bar);
        let highs = self.bars.highs(&bar.symbol);
        let lows = self.bars.lows(&bar.symbol);
        let closes = self.bars.closes(&bar.symbol);
        let Some(s) = stochastic(&highs, &lows, &closes, self.period, self.d_period) else {
            return TradeSignal::warming_up();
        };
        if s.k < 20.0 && s.d < 20.0 {
            TradeSignal::new(Direction::Long, 0.6, "stochastic deeply oversold")
        } else if s.k > 80.0 && s.d > 80.0 {
            TradeSignal::new(Direction::Short, 0.6, "stochastic deeply overbought")
        } else {
            TradeSignal::neutral("stochastic in neutral range")
        }
    }

    fn reset(&mut self) {
        self.bars.clear();
    }
}

/// Pivot-point mean reversion. Inputs: prior period's high/low/close
/// (rolled once per `period_len` bars, default daily). Warm-up: one full
/// prior period. Output: LONG at/below S1, SHORT at/above R1.
pub struct PivotPointsReversion {
    name: String,
    period_len: usize,
    bars: SymbolWindows,
}

impl PivotPointsReversion {
    pub fn new(name: impl Into<String>, period_len: usize) -> Self {
        Self {
            name: name.into(),
            period_len,
            bars: SymbolWindows::new(period_len * 2 + 1),
        }
    }
}

impl Strategy for PivotPointsReversion {
    fn name(&self) -> &str {
        &self.name
    }

    fn strategy_type(&self) -> StrategyType {
        StrategyType::ShortTerm
    }

    fn execute(&mut self, _portfolio: &Portfolio, bar: &Bar) -> TradeSignal {
        self.bars.push(bar);
        let Some(window) = self.bars.window(&bar.symbol) else {
            return TradeSignal::warming_up();
        };
        if window.len() < self.period_len + 1 {
            return TradeSignal::warming_up();
        }
        let prior_period: Vec<_> = window.iter().rev().skip(1).take(self.period_len).collect();
        let prior_high = prior_period.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        let prior_low = prior_period.iter().map(|b| b.low).fold(f64::MAX, f64::min);
        let prior_close = prior_period.first().map(|b| b.close).unwrap_or(bar.close);
        let p = pivot_points(prior_high, prior_low, prior_close);
        if bar.close <= p.s1 {
            TradeSignal::new(Direction::Long, 0.6, "price at/below S1 pivot support")
        } else if bar.close >= p.r1 {
            TradeSignal::new(Direction::Short, 0.6, "price at/above R1 pivot resistance")
        } else {
            TradeSignal::neutral("price between pivot support and resistance")
        }
    }

    fn reset(&mut self) {
        self.bars.clear();
    }
}

/// ATR-channel mean reversion. Inputs: highs/lows/closes. Warm-up:
/// `period+1` bars. Parameters: `period=14`, `multiplier=2.5` around the
/// `period`-bar SMA of closes. Output: LONG below the lower channel edge,
/// SHORT above the upper edge.
pub struct AtrChannelReversion {
    name: String,
    period: usize,
    multiplier: f64,
    bars: SymbolWindows,
}

impl AtrChannelReversion {
    pub fn new(name: impl Into<String>, period: usize, multiplier: f64) -> Self {
        Self {
            name: name.into(),
            period,
            multiplier,
            bars: SymbolWindows::new(period + 1),
        }
    }
}

impl Strategy for AtrChannelReversion {
    fn name(&self) -> &str {
        &self.name
    }

    fn strategy_type(&self) -> StrategyType {
        StrategyType::ShortTerm
    }

    fn execute(&mut self, _portfolio: &Portfolio, bar: &Bar) -> TradeSignal {
        self.bars.push(bar);
        let highs = self.bars.highs(&bar.symbol);
        let lows = self.bars.lows(&bar.symbol);
        let closes = self.bars.closes(&bar.symbol);
        let (Some(a), Some(mid)) = (
            atr(&highs, &lows, &closes, self.period),
            twe_indicators::sma(&closes, self.period),
        ) else {
            return TradeSignal::warming_up();
        };
        let upper = mid + self.multiplier * a;
        let lower = mid - self.multiplier * a;
        if bar.close < lower {
            TradeSignal::new(Direction::Long, 0.6, "close below ATR channel")
        } else if bar.close > upper {
            TradeSignal::new(Direction::Short, 0.6, "close above ATR channel")
        } else {
            TradeSignal::neutral("inside ATR channel")
        }
    }

    fn reset(&mut self) {
        self.bars.clear();
    }
}
