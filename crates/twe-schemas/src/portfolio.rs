use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `(symbol, signedQty, avgEntryPrice, entryTime, unrealizedPnL)`. Created on
/// first fill, updated on subsequent fills (weighted-average entry),
/// destroyed when qty returns to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub signed_qty: i64,
    pub avg_entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub unrealized_pnl: f64,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.signed_qty > 0
    }

    pub fn is_short(&self) -> bool {
        self.signed_qty < 0
    }
}

/// Immutable snapshot passed by value into every strategy call. Strategies
/// never mutate it — every field here is owned, not borrowed, by design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub positions: BTreeMap<String, i64>,
    pub cash_twd: f64,
    pub avg_entry_price: BTreeMap<String, f64>,
    pub realized_pnl_to_date: f64,
}

impl Portfolio {
    pub fn flat() -> Self {
        Self {
            positions: BTreeMap::new(),
            cash_twd: 0.0,
            avg_entry_price: BTreeMap::new(),
            realized_pnl_to_date: 0.0,
        }
    }

    pub fn position_qty(&self, symbol: &str) -> i64 {
        *self.positions.get(symbol).unwrap_or(&0)
    }

    pub fn is_flat(&self, symbol: &str) -> bool {
        self.position_qty(symbol) == 0
    }
}
