use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bar timeframe. Ordering matches (`TICK` finest, `1d` coarsest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    Tick,
    M1,
    M5,
    M15,
    M30,
    H1,
    D1,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Tick => "TICK",
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::D1 => "1d",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "TICK" => Timeframe::Tick,
            "1m" => Timeframe::M1,
            "5m" => Timeframe::M5,
            "15m" => Timeframe::M15,
            "30m" => Timeframe::M30,
            "1h" => Timeframe::H1,
            "1d" => Timeframe::D1,
            _ => return None,
        })
    }
}

/// `(symbol, timeframe, timestamp)` uniquely identifies a bar. Immutable
/// after insert; BarStore enforces strictly ascending order per
/// `(symbol, timeframe)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BarValidationError {
    NonFinitePrice,
    HighBelowLow,
    HighBelowOpenOrClose,
    LowAboveOpenOrClose,
}

impl std::fmt::Display for BarValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonFinitePrice => write!(f, "bar price is NaN or infinite"),
            Self::HighBelowLow => write!(f, "bar high < low"),
            Self::HighBelowOpenOrClose => write!(f, "bar high below open or close"),
            Self::LowAboveOpenOrClose => write!(f, "bar low above open or close"),
        }
    }
}

impl std::error::Error for BarValidationError {}

impl Bar {
    /// Construct a bar, validating OHLC consistency and finiteness.
    pub fn new(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Result<Self, BarValidationError> {
        for p in [open, high, low, close] {
            if !p.is_finite() {
                return Err(BarValidationError::NonFinitePrice);
            }
        }
        if high < low {
            return Err(BarValidationError::HighBelowLow);
        }
        if high < open || high < close {
            return Err(BarValidationError::HighBelowOpenOrClose);
        }
        if low > open || low > close {
            return Err(BarValidationError::LowAboveOpenOrClose);
        }
        Ok(Self {
            symbol: symbol.into(),
            timeframe,
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}

/// A single bid or ask price level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: f64,
    pub size: u64,
}

/// Top-N order book snapshot for a symbol. Valid only if at least one level
/// on each side is present (see `OrderBookData::imbalance`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub book: OrderBookData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookData {
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}

impl OrderBookData {
    pub fn is_valid(&self) -> bool {
        !self.bids.is_empty() && !self.asks.is_empty()
    }

    pub fn total_bid_volume(&self) -> u64 {
        self.bids.iter().map(|l| l.size).sum()
    }

    pub fn total_ask_volume(&self) -> u64 {
        self.asks.iter().map(|l| l.size).sum()
    }

    /// `(bid - ask) / (bid + ask) ∈ [-1, 1]`. `None` when invalid (one side
    /// empty) or when both sides are zero-volume.
    pub fn imbalance(&self) -> Option<f64> {
        if !self.is_valid() {
            return None;
        }
        let bid = self.total_bid_volume() as f64;
        let ask = self.total_ask_volume() as f64;
        let denom = bid + ask;
        if denom <= 0.0 {
            return None;
        }
        Some((bid - ask) / denom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_rejects_high_below_low() {
        let ts = Utc::now();
        let err = Bar::new("2330", Timeframe::D1, ts, 10.0, 9.0, 9.5, 9.8, 100).unwrap_err();
        assert_eq!(err, BarValidationError::HighBelowLow);
    }

    #[test]
    fn bar_rejects_non_finite() {
        let ts = Utc::now();
        let err = Bar::new("2330", Timeframe::D1, ts, f64::NAN, 10.0, 9.0, 9.5, 100).unwrap_err();
        assert_eq!(err, BarValidationError::NonFinitePrice);
    }

    #[test]
    fn orderbook_imbalance_requires_both_sides() {
        let ob = OrderBookData {
            bids: vec![],
            asks: vec![PriceLevel { price: 10.0, size: 5 }],
        };
        assert_eq!(ob.imbalance(), None);
    }

    #[test]
    fn orderbook_imbalance_matches_formula() {
        let ob = OrderBookData {
            bids: vec![PriceLevel { price: 10.0, size: 300 }],
            asks: vec![PriceLevel { price: 10.1, size: 100 }],
        };
        assert_eq!(ob.imbalance(), Some(0.5));
    }
}
