//! twe-risk — RiskGuard.
//!
//! Tracks `dailyPnL`/`weeklyPnL`, trips `emergencyShutdown` on a daily-limit
//! breach, and rolls both counters at their respective boundaries. Pure
//! state machine: callers supply "now" (in the configured Asia/Taipei
//! wall-clock zone) on every call rather than this crate reading the system
//! clock, so midnight/Monday rollover is exercised deterministically in
//! tests.

mod engine;
mod types;

pub use engine::RiskGuard;
pub use types::{RiskState, WeeklySnapshot};
