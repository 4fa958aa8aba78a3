use twe_schemas::{Bar, Direction, Portfolio, StrategyType, TradeSignal};

use crate::traits::Strategy;
use crate::window::SymbolWindows;

/// VWAP reversion. Inputs: closes/volumes over a rolling session window.
/// Warm-up: `period` bars. Parameters: `period=20`, `band_pct=0.01`. Output:
/// LONG when price trades `band_pct` below the volume-weighted average
/// price, SHORT when `band_pct` above it.
pub struct VwapReversion {
    name: String,
    period: usize,
    band_pct: f64,
    bars: SymbolWindows,
}

impl VwapReversion {
    pub fn new(name: impl Into<String>, period: usize, band_pct: f64) -> Self {
        Self {
            name: name.into(),
            period,
            band_pct,
            bars: SymbolWindows::new(period),
        }
    }

    fn vwap(closes: &[f64], volumes: &[f64]) -> Option<f64> {
        if closes.is_empty() || closes.len() != volumes.len() {
            return None;
        }
        let total_volume: f64 = volumes.iter().sum();
        if total_volume <= 0.0 {
            return None;
        }
        let weighted: f64 = closes.iter().zip(volumes).map(|(p, v)| p * v).sum();
        Some(weighted / total_volume)
    }
}

impl Strategy for VwapReversion {
    fn name(&self) -> &str {
        &self.name
    }

    fn strategy_type(&self) -> StrategyType {
        StrategyType::Intraday
    }

    fn execute(&mut self, _portfolio: &Portfolio, bar: &Bar) -> TradeSignal {
        self.bars.push(bar);
        if self.bars.len(&bar.symbol) < self.period {
            return TradeSignal::warming_up();
        }
        let closes = self.bars.closes(&bar.symbol);
        let volumes = self.bars.volumes(&bar.symbol);
        let Some(vwap) = Self::vwap(&closes, &volumes) else {
            return TradeSignal::neutral("no volume to compute VWAP");
        };
        let deviation = (bar.close - vwap) / vwap;
        if deviation < -self.band_pct {
            TradeSignal::new(Direction::Long, 0.6, format!("price {:.2}% below VWAP", deviation * 100.0))
        } else if deviation > self.band_pct {
            TradeSignal::new(Direction::Short, 0.6, format!("price {:.2}% above VWAP", deviation * 100.0))
        } else {
            TradeSignal::neutral("price tracking VWAP")
        }
    }

    fn reset(&mut self) {
        self.bars.clear();
    }
}

/// TWAP drift. Inputs: closes over a rolling window, unweighted by volume.
/// Warm-up: `period` bars. Parameters: `period=20`, `band_pct=0.01`. Output:
/// LONG when price trades `band_pct` below the time-weighted average price,
/// SHORT when above it. Distinct from [`VwapReversion`] in that it ignores
/// volume entirely, matching venues or symbols with unreliable volume
/// reporting.
pub struct TwapReversion {
    name: String,
    period: usize,
    band_pct: f64,
    bars: SymbolWindows,
}

impl TwapReversion {
    pub fn new(name: impl Into<String>, period: usize, band_pct: f64) -> Self {
        Self {
            name: name.into(),
            period,
            band_pct,
            bars: SymbolWindows::new(period),
        }
    }
}

impl Strategy for TwapReversion {
    fn name(&self) -> &str {
        &self.name
    }

    fn strategy_type(&self) -> StrategyType {
        StrategyType::Intraday
    }

    fn execute(&mut self, _portfolio: &Portfolio, bar: &Bar) -> TradeSignal {
        self.bars.push(bar);
        let closes = self.bars.closes(&bar.symbol);
        if closes.len() < self.period {
            return TradeSignal::warming_up();
        }
        let twap = closes.iter().sum::<f64>() / closes.len() as f64;
        let deviation = (bar.close - twap) / twap;
        if deviation < -self.band_pct {
            TradeSignal::new(Direction::Long, 0.55, format!("price {:.2}% below TWAP", deviation * 100.0))
        } else if deviation > self.band_pct {
            TradeSignal::new(Direction::Short, 0.55, format!("price {:.2}% above TWAP", deviation * 100.0))
        } else {
            TradeSignal::neutral("price tracking TWAP")
        }
    }

    fn reset(&mut self) {
        self.bars.clear();
    }
}
