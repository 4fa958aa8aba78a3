//! Concrete strategy families. Each module groups strategies that share an
//! analytical lens (trend-following, mean reversion, momentum, ...); every
//! type in here implements [`crate::Strategy`].

pub mod execution;
pub mod long_horizon;
pub mod mean_reversion;
pub mod microstructure;
pub mod momentum;
pub mod sentiment;
pub mod trend;
