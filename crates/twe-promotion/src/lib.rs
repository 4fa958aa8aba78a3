//! AutoSelector: ranks the most recent backtest run's
//! eligible `(strategy, symbol)` results by composite fitness and produces
//! the `SelectionPlan` an engine-side caller applies via
//! `twe_db::store::promote_mapping` and `StrategyManager`'s swap protocol
//!.

pub mod artifact_gate;
mod evaluator;
mod types;

pub use artifact_gate::{lock_artifact_from_str, ArtifactLock, LockError};
pub use evaluator::{is_eligible, rank, select};
pub use types::{AutoSelectionConfig, RankedCandidate, SelectionPlan};
