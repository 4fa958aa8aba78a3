//! Parallel fan-out across the `(strategy, symbol)` evaluation matrix
//! ("executed in parallel with a worker pool sized to
//! hardware; each worker is pinned to a single evaluation at a time").
//!
//! Each evaluation is pure CPU-bound replay with no shared mutable state,
//! so a data-parallel pool (rayon) fits directly — one thread per
//! `(strategy, symbol)` pair in flight, rayon sizing the pool to
//! `std::thread::available_parallelism()` itself.

use rayon::prelude::*;
use twe_schemas::Bar;
use twe_strategy::Strategy;

use crate::engine::BacktestEngine;
use crate::types::{BacktestConfig, ReplayOutcome};

/// One `(strategy, symbol)` unit of work: a freshly constructed strategy
/// instance (never shared across workers) and the symbol's bar history.
pub struct BacktestJob {
    pub symbol: String,
    pub strategy: Box<dyn Strategy>,
    pub bars: Vec<Bar>,
}

/// Run every job to completion, one worker per job, and return results in
/// the same order the jobs were given (not the order workers finished in —
/// `par_iter().map()` preserves input order).
pub fn run_matrix(jobs: Vec<BacktestJob>, config: BacktestConfig) -> Vec<ReplayOutcome> {
    jobs.into_par_iter()
        .map(|job| {
            let mut engine = BacktestEngine::new(job.strategy, config.clone());
            engine.run(&job.symbol, &job.bars)
        })
        .collect()
}
