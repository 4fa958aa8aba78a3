//! twe-engine — TradingEngine.
//!
//! The central control loop: routes each bar through the trading-window
//! gate, emergency gate, data-freshness check, strategy signal collection,
//! the full veto chain, position sizing, and order submission, then folds
//! fills back into the ledger and risk state it owns (
//! Ownership: "TradingEngine owns Positions and RiskState").

mod engine;
mod window;

pub use engine::{BarOutcome, EngineConfig, EntryOutcome, TradingEngine};
pub use window::is_within_trading_window;
