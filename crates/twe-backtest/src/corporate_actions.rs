//! Corporate action policy.
//!
//! Corporate actions (splits, dividends, mergers) make raw price data
//! ambiguous: without adjustment a 2-for-1 split looks like an overnight
//! 50% loss. Rather than implement adjustment tables (data-source-specific
//! and easy to get subtly wrong), this module enforces an explicit choice:
//!
//! - [`CorporateActionPolicy::Allow`] — the caller guarantees adjusted
//!   data; every bar is processed.
//! - [`CorporateActionPolicy::ForbidPeriods`] — the caller declares which
//!   `(symbol, period)` pairs are unadjusted; [`BacktestEngine`] halts
//!   before running any strategy logic on one of those bars rather than
//!   silently producing a biased result.
//!
//! [`BacktestEngine`]: crate::engine::BacktestEngine

use chrono::{DateTime, Utc};

/// A single corporate-action exclusion window. Any bar for `symbol` whose
/// timestamp falls in `[start, end]` (inclusive) is excluded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForbidEntry {
    pub symbol: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ForbidEntry {
    pub fn new(symbol: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        debug_assert!(end >= start, "end must be >= start");
        Self { symbol: symbol.into(), start, end }
    }
}

/// Explicit policy for handling corporate actions in a replay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CorporateActionPolicy {
    /// No enforcement; the caller is responsible for adjusted data.
    Allow,
    /// Halt the replay on any bar falling inside a declared exclusion
    /// window, rather than process contaminated price data.
    ForbidPeriods(Vec<ForbidEntry>),
}

impl Default for CorporateActionPolicy {
    fn default() -> Self {
        CorporateActionPolicy::Allow
    }
}

impl CorporateActionPolicy {
    /// Whether this bar falls inside a declared exclusion window.
    pub fn is_excluded(&self, symbol: &str, timestamp: DateTime<Utc>) -> bool {
        match self {
            CorporateActionPolicy::Allow => false,
            CorporateActionPolicy::ForbidPeriods(entries) => entries
                .iter()
                .any(|e| e.symbol == symbol && timestamp >= e.start && timestamp <= e.end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn allow_never_excludes() {
        let policy = CorporateActionPolicy::Allow;
        assert!(!policy.is_excluded("2330", ts(1)));
    }

    #[test]
    fn forbid_periods_excludes_inside_window_only() {
        let policy = CorporateActionPolicy::ForbidPeriods(vec![ForbidEntry::new("2330", ts(5), ts(10))]);
        assert!(!policy.is_excluded("2330", ts(4)));
        assert!(policy.is_excluded("2330", ts(5)));
        assert!(policy.is_excluded("2330", ts(10)));
        assert!(!policy.is_excluded("2330", ts(11)));
        assert!(!policy.is_excluded("2454", ts(7)));
    }
}
