//! Typed view over the "Configuration surface" table. Parses the
//! canonical JSON produced by [`crate::load_layered_yaml`] into strongly
//! typed values with the defaults the spec names, so callers never hand-roll
//! `config.pointer("/trading/risk/dailyLossLimit")` at a dozen call sites.

use anyhow::{Context, Result};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct TradingWindowConfig {
    /// Local time `HH:MM`, e.g. `"09:00"`.
    pub start: String,
    /// Local time `HH:MM`, e.g. `"13:30"`.
    pub end: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradingRiskConfig {
    pub daily_loss_limit_twd: f64,
    pub weekly_loss_limit_twd: f64,
    pub max_position_pct: f64,
    pub max_hold_minutes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradingStockConfig {
    pub initial_shares: u32,
    pub share_increment: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    pub url: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoSelectionConfig {
    pub min_sharpe: f64,
    pub min_return_pct: f64,
    pub min_win_rate_pct: f64,
    pub max_drawdown_pct: f64,
    pub shadow_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    pub url: String,
    pub model: String,
    pub timeout_ms: u64,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSurface {
    pub trading_window: TradingWindowConfig,
    pub trading_risk: TradingRiskConfig,
    pub trading_stock: TradingStockConfig,
    pub bridge: BridgeConfig,
    pub auto_selection: AutoSelectionConfig,
    pub llm: LlmConfig,
}

fn str_at(v: &Value, ptr: &str) -> Option<String> {
    v.pointer(ptr)?.as_str().map(|s| s.to_string())
}

fn f64_at(v: &Value, ptr: &str, default: f64) -> f64 {
    v.pointer(ptr).and_then(Value::as_f64).unwrap_or(default)
}

fn u64_at(v: &Value, ptr: &str, default: u64) -> u64 {
    v.pointer(ptr).and_then(Value::as_u64).unwrap_or(default)
}

fn bool_at(v: &Value, ptr: &str, default: bool) -> bool {
    v.pointer(ptr).and_then(Value::as_bool).unwrap_or(default)
}

impl ConfigSurface {
 /// Parse the full surface from canonical config JSON, applying the     /// defaults for every field the config file omits.
    pub fn from_json(v: &Value) -> Result<Self> {
        Ok(Self {
            trading_window: TradingWindowConfig {
                start: str_at(v, "/trading/window/start")
                    .context("trading.window.start missing")?,
                end: str_at(v, "/trading/window/end").context("trading.window.end missing")?,
            },
            trading_risk: TradingRiskConfig {
                daily_loss_limit_twd: f64_at(v, "/trading/risk/dailyLossLimit", 0.0),
                weekly_loss_limit_twd: f64_at(v, "/trading/risk/weeklyLossLimit", 0.0),
                max_position_pct: f64_at(v, "/trading/risk/maxPosition", 0.25),
                max_hold_minutes: u64_at(v, "/trading/risk/maxHoldMinutes", 0) as u32,
            },
            trading_stock: TradingStockConfig {
                initial_shares: u64_at(v, "/trading/stock/initialShares", 1000) as u32,
                share_increment: u64_at(v, "/trading/stock/shareIncrement", 1000) as u32,
            },
            bridge: BridgeConfig {
                url: str_at(v, "/trading/bridge/url")
                    .unwrap_or_else(|| "http://127.0.0.1:8787".to_string()),
                timeout_ms: u64_at(v, "/trading/bridge/timeoutMs", 3000),
            },
            auto_selection: AutoSelectionConfig {
                min_sharpe: f64_at(v, "/auto_selection/minSharpe", 0.5),
                min_return_pct: f64_at(v, "/auto_selection/minReturn", 10.0),
                min_win_rate_pct: f64_at(v, "/auto_selection/minWinRate", 50.0),
                max_drawdown_pct: f64_at(v, "/auto_selection/maxDrawdown", 20.0),
                shadow_count: u64_at(v, "/auto_selection/shadowCount", 5) as usize,
            },
            llm: LlmConfig {
                url: str_at(v, "/llm/url").unwrap_or_default(),
                model: str_at(v, "/llm/model").unwrap_or_default(),
                timeout_ms: u64_at(v, "/llm/timeoutMs", 3000),
                enabled: bool_at(v, "/llm/enabled", false),
            },
        })
    }
}
