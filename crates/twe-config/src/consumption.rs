//! Declares, per run mode, which config subtrees that mode is allowed to
//! consume. Used by [`crate::report_unused_keys`] so a stray key in
//! `risk.yaml` that no BACKTEST-mode code path reads gets flagged instead of
//! silently ignored.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigMode {
    Backtest,
    Paper,
    Live,
}

pub fn consumed_pointers(mode: ConfigMode) -> &'static [&'static str] {
    match mode {
        ConfigMode::Backtest => BACKTEST,
        ConfigMode::Paper => PAPER,
        ConfigMode::Live => LIVE,
    }
}

static BACKTEST: &[&str] = &[
    "/trading/window",
    "/trading/risk",
    "/auto_selection",
];

static PAPER: &[&str] = &[
    "/trading/window",
    "/trading/risk",
    "/trading/stock",
    "/trading/bridge",
    "/auto_selection",
    "/llm",
];

static LIVE: &[&str] = &[
    "/trading/window",
    "/trading/risk",
    "/trading/stock",
    "/trading/bridge",
    "/auto_selection",
    "/llm",
];
