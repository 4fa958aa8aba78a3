//! Walk-forward window generation and overfit detection.
//!
//! This module is deliberately decoupled from [`crate::engine`]: it only
//! knows about date ranges and fitness numbers. The caller (a parameter
//! optimizer) runs a backtest over each window's train/test slice and
//! passes the resulting fitness scores back in to [`evaluate_overfit`].

use chrono::{DateTime, Duration, Utc};

/// `trainTestRatio` default 3.0, `windowStepDays` default 20.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WalkForwardConfig {
    pub train_test_ratio: f64,
    pub window_step_days: i64,
    /// Rolling windows slide the train start forward with each step;
    /// anchored windows keep the train start fixed at the series start and
    /// only grow the train slice.
    pub anchored: bool,
}

impl WalkForwardConfig {
    pub fn defaults() -> Self {
        Self { train_test_ratio: 3.0, window_step_days: 20, anchored: false }
    }
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WalkForwardWindow {
    pub train_start: DateTime<Utc>,
    pub train_end: DateTime<Utc>,
    pub test_start: DateTime<Utc>,
    pub test_end: DateTime<Utc>,
}

/// Generate windows covering `[start, end)`. The test slice is always
/// `window_step_days` long; the train slice is `train_test_ratio` times
/// that, either sliding (rolling) or growing from a fixed anchor.
pub fn generate_windows(start: DateTime<Utc>, end: DateTime<Utc>, cfg: &WalkForwardConfig) -> Vec<WalkForwardWindow> {
    if cfg.window_step_days <= 0 || end <= start {
        return Vec::new();
    }

    let test_len = Duration::days(cfg.window_step_days);
    let train_len = Duration::milliseconds((test_len.num_milliseconds() as f64 * cfg.train_test_ratio) as i64);

    let mut windows = Vec::new();
    let mut cursor = start;

    loop {
        let train_start = if cfg.anchored { start } else { cursor };
        let train_end = if cfg.anchored {
            start + Duration::milliseconds(train_len.num_milliseconds() + (cursor - start).num_milliseconds())
        } else {
            train_start + train_len
        };
        let test_start = train_end;
        let test_end = test_start + test_len;

        if test_end > end {
            break;
        }

        windows.push(WalkForwardWindow { train_start, train_end, test_start, test_end });
        cursor += test_len;
    }

    windows
}

/// In-sample fitness exceeding out-of-sample by more than this (absolute
/// fitness points) is reported as an overfit warning.
pub const OVERFIT_WARNING_THRESHOLD: f64 = 0.30;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WalkForwardResult {
    pub window: WalkForwardWindow,
    pub train_fitness: f64,
    pub test_fitness: f64,
    pub overfit_warning: bool,
}

pub fn evaluate_overfit(window: WalkForwardWindow, train_fitness: f64, test_fitness: f64) -> WalkForwardResult {
    let overfit_warning = train_fitness.is_finite()
        && test_fitness.is_finite()
        && (train_fitness - test_fitness) > OVERFIT_WARNING_THRESHOLD;
    WalkForwardResult { window, train_fitness, test_fitness, overfit_warning }
}
