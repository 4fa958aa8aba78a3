use std::collections::BTreeMap;

use crate::ledger::PositionBook;

/// Concentration veto stage thresholds.
pub const MAX_SINGLE_POS_PCT: f64 = 0.25;
pub const MAX_SECTOR_PCT: f64 = 0.40;

/// Gross market value of a single position and its share of the book,
/// computed against current marks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymbolWeight {
    pub market_value: f64,
    pub weight_pct: f64,
}

/// Mark every open position at `marks` and express it as a fraction of
/// total equity. Symbols with no mark are skipped (their weight is
/// indeterminate, not zero).
pub fn symbol_weights(
    book: &PositionBook,
    marks: &BTreeMap<String, f64>,
    equity_twd: f64,
) -> BTreeMap<String, SymbolWeight> {
    let mut out = BTreeMap::new();
    if equity_twd <= 0.0 {
        return out;
    }
    for symbol in book.open_symbols() {
        let pos = match book.position(symbol) {
            Some(p) => p,
            None => continue,
        };
        let price = match marks.get(symbol) {
            Some(p) => *p,
            None => continue,
        };
        let market_value = (pos.signed_qty.unsigned_abs() as f64) * price;
        out.insert(
            symbol.to_string(),
            SymbolWeight {
                market_value,
                weight_pct: market_value / equity_twd,
            },
        );
    }
    out
}

/// Sum of weights across `sector_of`'s members for the sector that
/// `candidate_symbol` belongs to, including the candidate's own existing
/// position if it has one. Used to reject an entry that would push a
/// sector over [`MAX_SECTOR_PCT`].
pub fn sector_weight_pct(
    book: &PositionBook,
    marks: &BTreeMap<String, f64>,
    equity_twd: f64,
    candidate_symbol: &str,
    sector_of: &BTreeMap<String, String>,
) -> f64 {
    let weights = symbol_weights(book, marks, equity_twd);
    let sector = match sector_of.get(candidate_symbol) {
        Some(s) => s,
        None => return 0.0,
    };
    weights
        .iter()
        .filter(|(symbol, _)| sector_of.get(*symbol) == Some(sector))
        .map(|(_, w)| w.weight_pct)
        .sum()
}

/// Would adding `additional_value_twd` to `symbol` breach the single-position
/// or sector caps? Returns `Some(reason)` when it would.
pub fn check_concentration(
    book: &PositionBook,
    marks: &BTreeMap<String, f64>,
    equity_twd: f64,
    symbol: &str,
    additional_value_twd: f64,
    sector_of: &BTreeMap<String, String>,
) -> Option<String> {
    if equity_twd <= 0.0 {
        return None;
    }
    let weights = symbol_weights(book, marks, equity_twd);
    let existing_value = weights.get(symbol).map(|w| w.market_value).unwrap_or(0.0);
    let projected_symbol_pct = (existing_value + additional_value_twd) / equity_twd;
    if projected_symbol_pct > MAX_SINGLE_POS_PCT {
        return Some(format!(
            "single-position weight {:.1}% would exceed cap {:.1}%",
            projected_symbol_pct * 100.0,
            MAX_SINGLE_POS_PCT * 100.0
        ));
    }

    let existing_sector_pct = sector_weight_pct(book, marks, equity_twd, symbol, sector_of);
    let projected_sector_pct = existing_sector_pct + additional_value_twd / equity_twd;
    if projected_sector_pct > MAX_SECTOR_PCT {
        return Some(format!(
            "sector weight {:.1}% would exceed cap {:.1}%",
            projected_sector_pct * 100.0,
            MAX_SECTOR_PCT * 100.0
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use twe_schemas::TradeSide;

    fn book_with(symbol: &str, qty: i64, price: f64) -> PositionBook {
        let mut book = PositionBook::new();
        let side = if qty >= 0 { TradeSide::Buy } else { TradeSide::Sell };
        book.apply_fill(
            symbol,
            side,
            qty.unsigned_abs(),
            price,
            Utc.with_ymd_and_hms(2026, 7, 29, 9, 0, 0).unwrap(),
        )
        .unwrap();
        book
    }

    #[test]
    fn symbol_weight_is_market_value_over_equity() {
        let book = book_with("2330", 1000, 100.0);
        let marks = BTreeMap::from([("2330".to_string(), 100.0)]);
        let weights = symbol_weights(&book, &marks, 1_000_000.0);
        let w = weights.get("2330").unwrap();
        assert_eq!(w.market_value, 100_000.0);
        assert!((w.weight_pct - 0.10).abs() < 1e-9);
    }

    #[test]
    fn single_position_cap_blocks_oversized_entry() {
        let book = book_with("2330", 1000, 100.0);
        let marks = BTreeMap::from([("2330".to_string(), 100.0)]);
        let sectors = BTreeMap::from([("2330".to_string(), "Tech".to_string())]);
        // Existing 10% + 20% more -> 30% > 25% cap.
        let reason = check_concentration(&book, &marks, 1_000_000.0, "2330", 200_000.0, &sectors);
        assert!(reason.is_some());
    }

    #[test]
    fn sector_cap_blocks_correlated_basket() {
        let mut book = book_with("2330", 1000, 100.0);
        book.apply_fill(
            "2454",
            TradeSide::Buy,
            1500,
            100.0,
            Utc.with_ymd_and_hms(2026, 7, 29, 9, 0, 0).unwrap(),
        )
        .unwrap();
        let marks = BTreeMap::from([
            ("2330".to_string(), 100.0),
            ("2454".to_string(), 100.0),
        ]);
        let sectors = BTreeMap::from([
            ("2330".to_string(), "Tech".to_string()),
            ("2454".to_string(), "Tech".to_string()),
            ("2882".to_string(), "Tech".to_string()),
        ]);
        // 10% + 15% existing = 25% sector weight, entering 2882 at 20% more -> 45% > 40%.
        let reason = check_concentration(&book, &marks, 1_000_000.0, "2882", 200_000.0, &sectors);
        assert!(reason.is_some());
    }

    #[test]
    fn within_caps_returns_none() {
        let book = book_with("2330", 100, 100.0);
        let marks = BTreeMap::from([("2330".to_string(), 100.0)]);
        let sectors = BTreeMap::from([("2330".to_string(), "Tech".to_string())]);
        let reason = check_concentration(&book, &marks, 1_000_000.0, "2330", 10_000.0, &sectors);
        assert!(reason.is_none());
    }
}
