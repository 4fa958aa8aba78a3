//! twe-schemas
//!
//! Shared data model for the Taiwan equity trading engine. No logic lives
//! here — only the types every other crate agrees on, plus the tiny
//! validation each type can own by construction (e.g. a `Bar` cannot be
//! built with `high < low`).
//!
//! Monetary values are TWD; all timestamps are `DateTime<Utc>` at the
//! storage boundary — conversion to the configured wall-clock zone
//! (Asia/Taipei) is owned by `twe-calendar`, not by these types.

mod bar;
mod events;
mod mapping;
mod portfolio;
mod signal;

pub use bar::{Bar, BarValidationError, OrderBookData, PriceLevel, Quote, Timeframe};
pub use events::{
    BacktestResult, DailyStatistics, EarningsBlackoutDate, Trade, TradeAttempt, TradeSide,
    VetoEvent, VetoStage,
};
pub use mapping::{StrategyStockMapping, StrategyType};
pub use portfolio::{Portfolio, Position};
pub use signal::{Direction, TradeSignal, DEFAULT_ENTRY_THRESHOLD};
