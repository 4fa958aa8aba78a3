//! twe-compliance — ComplianceGuard (component table, veto
//! chain stages a/b).
//!
//! Owns every regulatory restriction rule so the engine's veto chain never
//! hard-wires a market-specific constant. Per open question: the
//! source mixed stock/futures assumptions (shorting, day-trade capital
//! thresholds) — this crate parameterizes `Mode` and keeps every restriction
//! behind it, so a futures book never trips a stock-only rule and vice
//! versa.
//!
//! "Day-trade" here is the regulator-recognized activity requiring minimum
//! capital (the *stricter* of the spec's two "intraday" meanings, per
//! ).

use chrono::NaiveDate;
use twe_schemas::EarningsBlackoutDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Stock,
    Futures,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComplianceConfig {
    pub mode: Mode,
 /// Minimum capital required to day-trade an odd lot.
    pub day_trade_capital_threshold_twd: f64,
    /// Taiwan board lot size; a quantity not a multiple of this is an odd lot.
    pub lot_size: u32,
    /// Trading days of lead time before an earnings date that blocks new entries.
    pub earnings_blackout_window_days: i64,
}

impl ComplianceConfig {
    pub fn stock_defaults() -> Self {
        Self {
            mode: Mode::Stock,
            day_trade_capital_threshold_twd: 2_000_000.0,
            lot_size: 1_000,
            earnings_blackout_window_days: 1,
        }
    }

    pub fn futures_defaults() -> Self {
        Self {
            mode: Mode::Futures,
            day_trade_capital_threshold_twd: 0.0,
            lot_size: 1,
            earnings_blackout_window_days: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComplianceViolation {
    /// Retail short entries are forbidden in stock mode.
    RetailShortForbidden,
    /// Odd-lot day trading requires capital at/above the threshold.
    OddLotDayTradeUnderCapital { capital_twd: f64, threshold_twd: f64 },
    /// The symbol's next earnings date falls inside the blackout window.
    EarningsBlackout { symbol: String, earnings_date: NaiveDate },
}

impl std::fmt::Display for ComplianceViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RetailShortForbidden => write!(f, "retail short entries are not permitted"),
            Self::OddLotDayTradeUnderCapital { capital_twd, threshold_twd } => write!(
                f,
                "Odd-lot day trading requires >= {threshold_twd:.0} capital (have {capital_twd:.0})"
            ),
            Self::EarningsBlackout { symbol, earnings_date } => {
                write!(f, "{symbol} earnings on {earnings_date} is within the blackout window")
            }
        }
    }
}

/// Is `qty` an odd lot under this mode's board-lot convention?
pub fn is_odd_lot(cfg: &ComplianceConfig, qty: u32) -> bool {
    cfg.lot_size > 0 && qty % cfg.lot_size != 0
}

/// ComplianceGuard's entry check (veto chain stage a, ):
/// rejects SHORT entries in stock mode, and rejects odd-lot day trades below
/// the capital threshold.
pub fn check_entry(
    cfg: &ComplianceConfig,
    is_short: bool,
    qty: u32,
    is_day_trade: bool,
    capital_twd: f64,
) -> Result<(), ComplianceViolation> {
    if is_short && cfg.mode == Mode::Stock {
        return Err(ComplianceViolation::RetailShortForbidden);
    }
    if is_day_trade && is_odd_lot(cfg, qty) && capital_twd < cfg.day_trade_capital_threshold_twd {
        return Err(ComplianceViolation::OddLotDayTradeUnderCapital {
            capital_twd,
            threshold_twd: cfg.day_trade_capital_threshold_twd,
        });
    }
    Ok(())
}

/// EarningsBlackout veto chain stage: reject any entry
/// in a symbol whose next earnings date falls within the configured window.
pub fn check_earnings_blackout(
    cfg: &ComplianceConfig,
    symbol: &str,
    today: NaiveDate,
    blackout_dates: &[EarningsBlackoutDate],
) -> Result<(), ComplianceViolation> {
    for bd in blackout_dates {
        if bd.symbol != symbol {
            continue;
        }
        let lead_days = (bd.earnings_date - today).num_days();
        if lead_days >= 0 && lead_days <= cfg.earnings_blackout_window_days {
            return Err(ComplianceViolation::EarningsBlackout {
                symbol: symbol.to_string(),
                earnings_date: bd.earnings_date,
            });
        }
    }
    Ok(())
}
