use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use twe_schemas::{Position, TradeSide};

#[derive(Debug, Clone, PartialEq)]
pub enum LedgerError {
    /// A fill quantity of zero carries no information and is rejected.
    ZeroQuantity,
    /// A fill price must be finite and positive.
    InvalidPrice,
}

/// A round trip closed by a reducing/reversing fill, carrying enough to feed
/// both RiskGuard's `record_pnl` and a persisted `Trade` row.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub symbol: String,
    pub qty: u64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub realized_pnl: f64,
    pub closed_at: DateTime<Utc>,
}

/// Fill-driven ledger of open [`Position`]s, keyed by symbol. The single
/// source of truth for `signedQty`/`avgEntryPrice`/`unrealizedPnL`
///.
#[derive(Debug, Clone, Default)]
pub struct PositionBook {
    positions: BTreeMap<String, Position>,
    realized_pnl_to_date: f64,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn is_flat(&self, symbol: &str) -> bool {
        !self.positions.contains_key(symbol)
    }

    pub fn open_symbols(&self) -> impl Iterator<Item = &str> {
        self.positions.keys().map(|s| s.as_str())
    }

    pub fn realized_pnl_to_date(&self) -> f64 {
        self.realized_pnl_to_date
    }

    /// Apply a fill: `side=Buy` increases `signedQty`, `side=Sell` decreases
    /// it. Same-direction fills extend the position with a weighted-average
    /// entry price; opposite-direction fills realize P&L on the closed
 /// portion first ("updated on subsequent fills
    /// (weighted-average entry)").
    pub fn apply_fill(
        &mut self,
        symbol: &str,
        side: TradeSide,
        qty: u64,
        price: f64,
        ts: DateTime<Utc>,
    ) -> Result<Option<ClosedTrade>, LedgerError> {
        if qty == 0 {
            return Err(LedgerError::ZeroQuantity);
        }
        if !price.is_finite() || price <= 0.0 {
            return Err(LedgerError::InvalidPrice);
        }

        let signed_delta = match side {
            TradeSide::Buy => qty as i64,
            TradeSide::Sell => -(qty as i64),
        };

        let existing = self.positions.get(symbol).cloned();
        match existing {
            None => {
                self.positions.insert(
                    symbol.to_string(),
                    Position {
                        symbol: symbol.to_string(),
                        signed_qty: signed_delta,
                        avg_entry_price: price,
                        entry_time: ts,
                        unrealized_pnl: 0.0,
                    },
                );
                Ok(None)
            }
            Some(mut pos) => {
                let same_direction = (pos.signed_qty > 0 && signed_delta > 0) || (pos.signed_qty < 0 && signed_delta < 0);
                if same_direction {
                    let total_qty = pos.signed_qty.unsigned_abs() + qty;
                    let weighted = pos.avg_entry_price * pos.signed_qty.unsigned_abs() as f64
                        + price * qty as f64;
                    pos.avg_entry_price = weighted / total_qty as f64;
                    pos.signed_qty += signed_delta;
                    self.positions.insert(symbol.to_string(), pos);
                    Ok(None)
                } else {
                    let closing_qty = qty.min(pos.signed_qty.unsigned_abs());
                    let entry_price = pos.avg_entry_price;
                    // Long closed by a sell: pnl = (exit - entry) * qty.
                    // Short closed by a buy: pnl = (entry - exit) * qty.
                    let realized = if pos.signed_qty > 0 {
                        (price - entry_price) * closing_qty as f64
                    } else {
                        (entry_price - price) * closing_qty as f64
                    };
                    self.realized_pnl_to_date += realized;

                    let closed = ClosedTrade {
                        symbol: symbol.to_string(),
                        qty: closing_qty,
                        entry_price,
                        exit_price: price,
                        realized_pnl: realized,
                        closed_at: ts,
                    };

                    pos.signed_qty += signed_delta;
                    let remaining_qty = qty - closing_qty;

                    if pos.signed_qty == 0 {
                        self.positions.remove(symbol);
                    } else if remaining_qty > 0 {
                        // The fill overshot the existing position and reversed it;
                        // the new side's entry price is this fill's price.
                        pos.avg_entry_price = price;
                        pos.entry_time = ts;
                        self.positions.insert(symbol.to_string(), pos);
                    } else {
                        self.positions.insert(symbol.to_string(), pos);
                    }

                    Ok(Some(closed))
                }
            }
        }
    }

    /// Refresh unrealized P&L for every open position from current marks.
    /// Positions with no mark are left unchanged.
    pub fn mark_to_market(&mut self, marks: &BTreeMap<String, f64>) {
        for (symbol, pos) in self.positions.iter_mut() {
            if let Some(&price) = marks.get(symbol) {
                pos.unrealized_pnl = (price - pos.avg_entry_price) * pos.signed_qty as f64;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 29, h, 0, 0).unwrap()
    }

    #[test]
    fn round_trip_long_then_exit_returns_to_flat() {
 //: LONG 100 then EXIT_LONG -> signedQty=0, realized P&L
        // = (exit - entry) * 100.
        let mut book = PositionBook::new();
        book.apply_fill("2330", TradeSide::Buy, 100, 100.0, ts(9)).unwrap();
        assert_eq!(book.position("2330").unwrap().signed_qty, 100);

        let closed = book
            .apply_fill("2330", TradeSide::Sell, 100, 105.0, ts(10))
            .unwrap()
            .unwrap();
        assert!(book.is_flat("2330"));
        assert_eq!(closed.realized_pnl, 500.0);
        assert_eq!(book.realized_pnl_to_date(), 500.0);
    }

    #[test]
    fn zero_qty_fill_is_an_error() {
        let mut book = PositionBook::new();
        assert_eq!(
            book.apply_fill("2330", TradeSide::Buy, 0, 100.0, ts(9)),
            Err(LedgerError::ZeroQuantity)
        );
    }

    #[test]
    fn weighted_average_entry_on_same_direction_adds() {
        let mut book = PositionBook::new();
        book.apply_fill("2330", TradeSide::Buy, 1000, 100.0, ts(9)).unwrap();
        book.apply_fill("2330", TradeSide::Buy, 1000, 110.0, ts(10)).unwrap();
        let pos = book.position("2330").unwrap();
        assert_eq!(pos.signed_qty, 2000);
        assert!((pos.avg_entry_price - 105.0).abs() < 1e-9);
    }

    #[test]
    fn partial_close_keeps_remaining_position_open() {
        let mut book = PositionBook::new();
        book.apply_fill("2330", TradeSide::Buy, 1000, 100.0, ts(9)).unwrap();
        let closed = book
            .apply_fill("2330", TradeSide::Sell, 400, 110.0, ts(10))
            .unwrap()
            .unwrap();
        assert_eq!(closed.qty, 400);
        assert_eq!(closed.realized_pnl, 4_000.0);
        let pos = book.position("2330").unwrap();
        assert_eq!(pos.signed_qty, 600);
        assert_eq!(pos.avg_entry_price, 100.0);
    }

    #[test]
    fn reversal_through_flat_sets_new_entry_price() {
        let mut book = PositionBook::new();
        book.apply_fill("2330", TradeSide::Buy, 1000, 100.0, ts(9)).unwrap();
        // Sell 1500 closes the long and opens a 500-share short at 90.
        book.apply_fill("2330", TradeSide::Sell, 1500, 90.0, ts(10)).unwrap();
        let pos = book.position("2330").unwrap();
        assert_eq!(pos.signed_qty, -500);
        assert_eq!(pos.avg_entry_price, 90.0);
    }
}
