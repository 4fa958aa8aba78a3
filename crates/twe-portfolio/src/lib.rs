//! twe-portfolio — Position/Portfolio bookkeeping owned by the
//! TradingEngine ("TradingEngine owns Positions and
//! RiskState").
//!
//! [`PositionBook`] is the fill-driven ledger: every accepted fill updates a
//! weighted-average-entry [`Position`](twe_schemas::Position), realizes P&L
//! on reducing fills, and deletes the position once `signed_qty` returns to
//! zero. [`weights`] turns the book into the
//! concentration figures the veto chain's Concentration stage needs.

mod ledger;
pub mod weights;

pub use ledger::{ClosedTrade, LedgerError, PositionBook};
