//! twe-correlation — CorrelationTracker.
//!
//! Caches pairwise Pearson correlations over a rolling return-series window,
//! keyed by `(symbol1, symbol2)` with symbols ordered so `(A, B)` and `(B,
//! A)` share one cache slot. Entries expire after 24h so a stale correlation
//! never silently gates a veto decision indefinitely. "Now" is always
//! supplied by the caller (TradingEngine's tick) rather than read from the
//! system clock, so cache behaviour stays deterministic under test.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

/// Correlation above this blocks new entries outright.
pub const CRITICAL_CORR: f64 = 0.85;
/// Correlation above this starts linearly scaling size down.
pub const SCALE_START_CORR: f64 = 0.70;
/// Average pairwise correlation above this raises a concentration warning
///.
pub const HIGH_CORR: f64 = 0.70;

const CACHE_TTL_HOURS: i64 = 24;
const LOOKBACK_DAYS: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq)]
struct CacheEntry {
    correlation: f64,
    computed_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct CorrelationTracker {
    cache: HashMap<(String, String), CacheEntry>,
}

fn cache_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Pearson correlation coefficient of two equal-length return series.
/// `None` if the series disagree in length, are too short, or either has
/// zero variance.
pub fn pearson_correlation(returns_a: &[f64], returns_b: &[f64]) -> Option<f64> {
    if returns_a.len() != returns_b.len() || returns_a.len() < 2 {
        return None;
    }
    let n = returns_a.len() as f64;
    let mean_a = returns_a.iter().sum::<f64>() / n;
    let mean_b = returns_b.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for i in 0..returns_a.len() {
        let da = returns_a[i] - mean_a;
        let db = returns_b[i] - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    if var_a <= 0.0 || var_b <= 0.0 {
        return None;
    }
    Some(cov / (var_a.sqrt() * var_b.sqrt()))
}

/// Daily log returns from a closing-price series, truncated to the last
/// [`LOOKBACK_DAYS`] trading days.
pub fn recent_returns(closes: &[f64]) -> Vec<f64> {
    let tail_len = LOOKBACK_DAYS.min(closes.len().saturating_sub(1)) + 1;
    if tail_len < 2 {
        return Vec::new();
    }
    let tail = &closes[closes.len() - tail_len..];
    tail.windows(2).map(|w| (w[1] / w[0]).ln()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConcentrationAnalysis {
    pub average_pairwise_correlation: f64,
    pub should_reduce_exposure: bool,
}

impl CorrelationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Correlation between two symbols, using the cache when fresh,
    /// otherwise recomputing from the provided return series and refreshing
    /// the cache entry.
    pub fn correlation(
        &mut self,
        symbol_a: &str,
        symbol_b: &str,
        returns_a: &[f64],
        returns_b: &[f64],
        now: DateTime<Utc>,
    ) -> Option<f64> {
        let key = cache_key(symbol_a, symbol_b);
        if let Some(entry) = self.cache.get(&key) {
            if now - entry.computed_at < Duration::hours(CACHE_TTL_HOURS) {
                return Some(entry.correlation);
            }
        }
        let corr = pearson_correlation(returns_a, returns_b)?;
        self.cache.insert(
            key,
            CacheEntry {
                correlation: corr,
                computed_at: now,
            },
        );
        Some(corr)
    }

    /// Average correlation of a candidate symbol against every symbol in an
 /// existing open-position set.
    pub fn average_correlation_against(
        &mut self,
        candidate: &str,
        candidate_returns: &[f64],
        existing: &[(&str, &[f64])],
        now: DateTime<Utc>,
    ) -> Option<f64> {
        if existing.is_empty() {
            return None;
        }
        let mut total = 0.0;
        let mut count = 0usize;
        for (symbol, returns) in existing {
            if *symbol == candidate {
                continue;
            }
            if let Some(c) = self.correlation(candidate, symbol, candidate_returns, returns, now) {
                total += c;
                count += 1;
            }
        }
        if count == 0 {
            return None;
        }
        Some(total / count as f64)
    }

    /// Size scale factor for a candidate entry given its average correlation
 /// against the existing book, step d: linear in
    /// `[0.5, 1.0]` over the `[SCALE_START_CORR, CRITICAL_CORR]` band, and
    /// `None` (reject) once `avg_corr > CRITICAL_CORR`.
    pub fn size_scale_factor(avg_corr: f64) -> Option<f64> {
        if avg_corr > CRITICAL_CORR {
            return None;
        }
        if avg_corr <= SCALE_START_CORR {
            return Some(1.0);
        }
        let span = CRITICAL_CORR - SCALE_START_CORR;
        let frac = (avg_corr - SCALE_START_CORR) / span;
        Some(1.0 - frac * 0.5)
    }

    /// Concentration analysis across the full set of pairwise correlations
 /// among currently open positions.
    pub fn analyze_concentration(
        &mut self,
        positions: &[(&str, &[f64])],
        now: DateTime<Utc>,
    ) -> ConcentrationAnalysis {
        let mut total = 0.0;
        let mut count = 0usize;
        for i in 0..positions.len() {
            for j in (i + 1)..positions.len() {
                let (sym_a, ret_a) = positions[i];
                let (sym_b, ret_b) = positions[j];
                if let Some(c) = self.correlation(sym_a, sym_b, ret_a, ret_b, now) {
                    total += c;
                    count += 1;
                }
            }
        }
        let avg = if count > 0 { total / count as f64 } else { 0.0 };
        ConcentrationAnalysis {
            average_pairwise_correlation: avg,
            should_reduce_exposure: avg > HIGH_CORR,
        }
    }
}
