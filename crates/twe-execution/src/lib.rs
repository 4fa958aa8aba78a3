//! twe-execution — OrderExecutor.
//!
//! Sits between the TradingEngine's veto chain and a venue-specific
//! [`BrokerAdapter`] (twe-bridge for live trading, twe-broker-sim for
//! simulation). Retries transport failures with exponential backoff and
//! refuses to have two orders in flight for the same symbol at once.

mod broker;
mod executor;

pub use broker::{BrokerAck, BrokerAdapter, BrokerError, OrderRequest};
pub use executor::{ExecutionOutcome, OrderExecutor, SubmitError, MAX_ATTEMPTS};
