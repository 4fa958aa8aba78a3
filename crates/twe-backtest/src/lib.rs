//! twe-backtest
//!
//! Deterministic, parallel backtesting over the `(strategy, symbol)` matrix
//!. A single [`BacktestEngine::run`] replays one strategy
//! instance against one symbol's bar history in strict ascending order,
//! simulating fills at each bar's close; [`run_matrix`] fans a whole matrix
//! of such replays out across a rayon worker pool. [`walkforward`] builds
//! the rolling/anchored train-test windows used to detect overfitting.

mod corporate_actions;
mod engine;
mod loader;
mod metrics;
mod parallel;
pub mod types;
mod walkforward;

pub use corporate_actions::{CorporateActionPolicy, ForbidEntry};
pub use engine::BacktestEngine;
pub use loader::{load_csv_file, parse_csv_bars, LoadError};
pub use metrics::{
    compute_metrics, fitness, is_eligible_for_selection, FitnessWeights, MIN_TRADES_FOR_SELECTION,
};
pub use parallel::{run_matrix, BacktestJob};
pub use types::{BacktestConfig, PerformanceMetrics, ReplayOutcome, SlippageModel};
pub use walkforward::{
    evaluate_overfit, generate_windows, WalkForwardConfig, WalkForwardResult, WalkForwardWindow,
    OVERFIT_WARNING_THRESHOLD,
};
