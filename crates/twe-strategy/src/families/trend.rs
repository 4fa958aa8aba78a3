use twe_indicators::{adx, ema, sma};
use twe_schemas::{Bar, Direction, Portfolio, StrategyType, TradeSignal};

use crate::traits::Strategy;
use crate::window::SymbolWindows;

/// Moving-average crossover. Inputs: closes. Warm-up: `slow` bars.
/// Parameters: `fast=20`, `slow=60` (defaults). Output: LONG when the fast
/// SMA crosses above the slow SMA, SHORT on the reverse cross, confidence
/// scaled by the relative gap between the two averages.
pub struct MaCrossover {
    name: String,
    fast: usize,
    slow: usize,
    bars: SymbolWindows,
    prev_sign: std::collections::BTreeMap<String, i8>,
}

impl MaCrossover {
    pub fn new(name: impl Into<String>, fast: usize, slow: usize) -> Self {
        Self {
            name: name.into(),
            fast,
            slow,
            bars: SymbolWindows::new(slow + 1),
            prev_sign: Default::default(),
        }
    }
}

impl Strategy for MaCrossover {
    fn name(&self) -> &str {
        &self.name
    }

    fn strategy_type(&self) -> StrategyType {
        StrategyType::Swing
    }

    fn execute(&mut self, _portfolio: &Portfolio, bar: &Bar) -> TradeSignal {
        self.bars.push(bar);
        let closes = self.bars.closes(&bar.symbol);
        let (Some(fast_sma), Some(slow_sma)) = (sma(&closes, self.fast), sma(&closes, self.slow)) else {
            return TradeSignal::warming_up();
        };
        let sign: i8 = if fast_sma > slow_sma { 1 } else if fast_sma < slow_sma { -1 } else { 0 };
        let prev = self.prev_sign.insert(bar.symbol.clone(), sign).unwrap_or(0);
        let gap = ((fast_sma - slow_sma) / slow_sma).abs();
        let confidence = (0.5 + gap * 10.0).min(0.95);
        if prev <= 0 && sign > 0 {
            TradeSignal::new(Direction::Long, confidence, "fast SMA crossed above slow SMA")
        } else if prev >= 0 && sign < 0 {
            TradeSignal::new(Direction::Short, confidence, "fast SMA crossed below slow SMA")
        } else {
            TradeSignal::neutral("no crossover")
        }
    }

    fn reset(&mut self) {
        self.bars.clear();
        self.prev_sign.clear();
    }
}

/// Triple-EMA trend filter. Inputs: closes. Warm-up: `slow` bars.
/// Parameters: `fast=5`, `mid=13`, `slow=34`. Output: LONG when
/// `fast > mid > slow` (aligned uptrend), SHORT when aligned downtrend,
/// else NEUTRAL.
pub struct TripleEma {
    name: String,
    fast: usize,
    mid: usize,
    slow: usize,
    bars: SymbolWindows,
}

impl TripleEma {
    pub fn new(name: impl Into<String>, fast: usize, mid: usize, slow: usize) -> Self {
        Self {
            name: name.into(),
            fast,
            mid,
            slow,
            bars: SymbolWindows::new(slow + 1),
        }
    }
}

impl Strategy for TripleEma {
    fn name(&self) -> &str {
        &self.name
    }

    fn strategy_type(&self) -> StrategyType {
        StrategyType::Swing
    }

    fn execute(&mut self, _portfolio: &Portfolio, bar: &Bar) -> TradeSignal {
        self.bars.push(bar);
        let closes = self.bars.closes(&bar.symbol);
        let (Some(f), Some(m), Some(s)) = (ema(&closes, self.fast), ema(&closes, self.mid), ema(&closes, self.slow))
        else {
            return TradeSignal::warming_up();
        };
        if f > m && m > s {
            TradeSignal::new(Direction::Long, 0.65, "triple EMA aligned up")
        } else if f < m && m < s {
            TradeSignal::new(Direction::Short, 0.65, "triple EMA aligned down")
        } else {
            TradeSignal::neutral("EMAs not aligned")
        }
    }

    fn reset(&mut self) {
        self.bars.clear();
    }
}

/// ADX trend strategy. Inputs: highs/lows/closes. Warm-up: `2*period+1`
/// bars. Parameters: `period=14`, `adx_threshold=25`. Output: LONG when
/// `ADX ≥ threshold` and `DI+ > DI-`, SHORT on the reverse, else NEUTRAL.
pub struct AdxTrend {
    name: String,
    period: usize,
    adx_threshold: f64,
    bars: SymbolWindows,
}

impl AdxTrend {
    pub fn new(name: impl Into<String>, period: usize, adx_threshold: f64) -> Self {
        Self {
            name: name.into(),
            period,
            adx_threshold,
            bars: SymbolWindows::new(period * 2 + 2),
        }
    }
}

impl Strategy for AdxTrend {
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
        let closes = self.bars.closes(&bar.symbol);
        let Some(result) = adx(&highs, &lows, &closes, self.period) else {
            return TradeSignal::warming_up();
        };
        if result.adx < self.adx_threshold {
            return TradeSignal::neutral("ADX below trend threshold");
        }
        let confidence = (result.adx / 100.0).min(0.9).max(0.6);
        if result.di_plus > result.di_minus {
            TradeSignal::new(Direction::Long, confidence, "ADX trending, DI+ dominant")
        } else {
            TradeSignal::new(Direction::Short, confidence, "ADX trending, DI- dominant")
        }
    }

    fn reset(&mut self) {
        self.bars.clear();
    }
}

/// Keltner breakout. Inputs: highs/lows/closes. Warm-up: `period+1` bars.
/// Parameters: `period=20`, `atr_multiplier=2.0`. Output: LONG when close
/// breaks above the upper band, SHORT below the lower band.
pub struct KeltnerBreakout {
    name: String,
    period: usize,
    atr_multiplier: f64,
    bars: SymbolWindows,
}

impl KeltnerBreakout {
    pub fn new(name: impl Into<String>, period: usize, atr_multiplier: f64) -> Self {
        Self {
            name: name.into(),
            period,
            atr_multiplier,
            bars: SymbolWindows::new(period + 1),
        }
    }
}

impl Strategy for KeltnerBreakout {
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
        let closes = self.bars.closes(&bar.symbol);
        let Some(channel) =
            twe_indicators::keltner_channel(&highs, &lows, &closes, self.period, self.atr_multiplier)
        else {
            return TradeSignal::warming_up();
        };
        if bar.close > channel.upper {
            TradeSignal::new(Direction::Long, 0.7, "close broke above Keltner upper band")
        } else if bar.close < channel.lower {
            TradeSignal::new(Direction::Short, 0.7, "close broke below Keltner lower band")
        } else {
            TradeSignal::neutral("inside Keltner channel")
        }
    }

    fn reset(&mut self) {
        self.bars.clear();
    }
}
