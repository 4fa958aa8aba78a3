//! Minimum viable bar-stream orchestrator.
//!
//! Current-state contract: it deterministically tracks a bar stream and caps
//! processing at `max_bars`. Nothing from the strategy/risk/execution/
//! integrity stack is wired in yet — `twe-runtime::run_bar_loop` is the real
//! engine-driven loop; this type exists so `twe-cli`'s `run loop` diagnostic
//! and the scenario tests under `tests/` have a stable, dependency-light
//! target to assert bar-ingestion behavior against while that wiring lands.

use anyhow::Result;
use uuid::Uuid;

/// One input bar. Mirrors the OHLCV shape used elsewhere in the workspace,
/// but keeps its own type so this crate has no hard dependency on a
/// particular bar-source format.
#[derive(Clone, Debug)]
pub struct OrchestratorBar {
    pub symbol: String,
    pub end_ts: u64,
    pub open_micros: i64,
    pub high_micros: i64,
    pub low_micros: i64,
    pub close_micros: i64,
    pub volume: i64,
    pub day_id: u32,
}

/// Configuration for one orchestrator run.
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// Bar timeframe in seconds.
    pub timeframe_secs: i64,
    /// Caps how many bars from the input stream are actually processed.
    pub max_bars: usize,
}

impl OrchestratorConfig {
    pub fn test_defaults() -> Self {
        Self { timeframe_secs: 60, max_bars: usize::MAX }
    }
}

/// Run identity, carried through so a report can be correlated back to a
/// `twe-db` run row once this orchestrator grows real persistence.
#[derive(Clone, Debug)]
pub struct OrchestratorRunMeta {
    pub run_id: Uuid,
    pub engine_id: String,
    pub mode: String,
}

/// Report produced after an orchestrator run.
#[derive(Clone, Debug, Default)]
pub struct OrchestratorReport {
    pub symbol: String,
    pub bars_seen: usize,
    pub last_end_ts: Option<u64>,
    pub last_close_micros: Option<i64>,
}

pub struct Orchestrator {
    config: OrchestratorConfig,
    meta: OrchestratorRunMeta,
}

impl Orchestrator {
    pub fn new_with_meta(config: OrchestratorConfig, meta: OrchestratorRunMeta) -> Self {
        Self { config, meta }
    }

    pub fn run_id(&self) -> Uuid {
        self.meta.run_id
    }

    pub fn engine_id(&self) -> &str {
        &self.meta.engine_id
    }

    pub fn mode(&self) -> &str {
        &self.meta.mode
    }

    /// Walk `bars` in order, capped at `config.max_bars`, and report the
    /// last bar seen. Symbol is taken from the stream itself rather than
    /// asserted up front, so a caller can feed a single-symbol stream
    /// without separately declaring which symbol it is.
    pub fn run(&mut self, bars: &[OrchestratorBar]) -> Result<OrchestratorReport> {
        let mut report = OrchestratorReport::default();

        for bar in bars.iter().take(self.config.max_bars) {
            report.symbol = bar.symbol.clone();
            report.bars_seen += 1;
            report.last_end_ts = Some(bar.end_ts);
            report.last_close_micros = Some(bar.close_micros);
        }

        Ok(report)
    }
}
