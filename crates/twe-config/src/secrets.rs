//! Secrets & alert-transport routing.
//!
//! This module is the single source of truth for runtime secret resolution.
//!
//! # Contract
//! - Config YAML stores only **env var NAMES** (e.g. `"TWE_BRIDGE_API_KEY"`).
//! - At startup, callers invoke [`resolve_secrets_for_mode`] once.
//! - The returned [`ResolvedSecrets`] is passed into constructors; never
//!   scatter `std::env::var` calls across the codebase.
//! - `Debug` impls on all secret-containing structs **redact** values.
//! - Error messages reference the env var **NAME**, never the value.
//!
//! # Mode-aware enforcement
//! - `LIVE`:     bridge api_key is **required**.
//! - `PAPER`:    bridge api_key is **required**.
//! - `BACKTEST`: no keys required — all optional.
//!
//! Alert-transport webhooks (the external alerting transport named out of
//! scope in ) and the LLM advisor key are always optional.

use anyhow::{bail, Result};
use serde_json::Value;

#[derive(Clone)]
pub struct ResolvedAlertTransports {
    pub risk_alerts: Option<String>,
    pub veto_digest: Option<String>,
    pub heartbeat: Option<String>,
}

impl std::fmt::Debug for ResolvedAlertTransports {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedAlertTransports")
            .field("risk_alerts", &self.risk_alerts.as_ref().map(|_| "<REDACTED>"))
            .field("veto_digest", &self.veto_digest.as_ref().map(|_| "<REDACTED>"))
            .field("heartbeat", &self.heartbeat.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

/// All runtime-resolved secrets for one engine instantiation. Built **once**
/// at startup via [`resolve_secrets_for_mode`]. **Values are redacted in
/// `Debug` output.**
#[derive(Clone)]
pub struct ResolvedSecrets {
    pub bridge_api_key: Option<String>,
    pub llm_api_key: Option<String>,
    pub alerts: ResolvedAlertTransports,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("bridge_api_key", &self.bridge_api_key.as_ref().map(|_| "<REDACTED>"))
            .field("llm_api_key", &self.llm_api_key.as_ref().map(|_| "<REDACTED>"))
            .field("alerts", &self.alerts)
            .finish()
    }
}

struct SecretEnvNames {
    bridge_api_key_var: String,
    llm_api_key_var: String,
    risk_alerts_var: Option<String>,
    veto_digest_var: Option<String>,
    heartbeat_var: Option<String>,
}

fn read_str_at(config: &Value, pointer: &str) -> Option<String> {
    let s = config.pointer(pointer)?.as_str()?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Resolve a named environment variable. `None` if unset or blank. Never
/// returns the value in an error path — callers report the NAME only.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

fn parse_env_names(config_json: &Value) -> SecretEnvNames {
    SecretEnvNames {
        bridge_api_key_var: read_str_at(config_json, "/trading/bridge/keys_env/api_key")
            .unwrap_or_else(|| "TWE_BRIDGE_API_KEY".to_string()),
        llm_api_key_var: read_str_at(config_json, "/llm/keys_env/api_key")
            .unwrap_or_else(|| "TWE_LLM_API_KEY".to_string()),
        risk_alerts_var: read_str_at(config_json, "/alerts/channels/risk"),
        veto_digest_var: read_str_at(config_json, "/alerts/channels/veto_digest"),
        heartbeat_var: read_str_at(config_json, "/alerts/channels/heartbeat"),
    }
}

/// Resolve all secrets from the environment for the given `mode` string.
/// `mode` is case-insensitive: `"LIVE"`, `"PAPER"`, or `"BACKTEST"`.
///
/// # Errors
/// Returns `Err` naming the env var that is missing for the given mode. The
/// actual (absent) value is never mentioned.
pub fn resolve_secrets_for_mode(config_json: &Value, mode: &str) -> Result<ResolvedSecrets> {
    let names = parse_env_names(config_json);
    let mode_upper = mode.trim().to_ascii_uppercase();

    let bridge_api_key = resolve_env(&names.bridge_api_key_var);
    let llm_api_key = resolve_env(&names.llm_api_key_var);

    match mode_upper.as_str() {
        "LIVE" | "PAPER" => {
            if bridge_api_key.is_none() {
                bail!(
                    "SECRETS_MISSING mode={}: required env var '{}' (bridge api_key) is not set or empty",
                    mode_upper,
                    names.bridge_api_key_var,
                );
            }
        }
        "BACKTEST" => {}
        other => {
            bail!(
                "SECRETS_UNKNOWN_MODE: unrecognised mode '{}'; expected one of: LIVE | PAPER | BACKTEST",
                other,
            );
        }
    }

    let alerts = ResolvedAlertTransports {
        risk_alerts: names.risk_alerts_var.as_deref().and_then(resolve_env),
        veto_digest: names.veto_digest_var.as_deref().and_then(resolve_env),
        heartbeat: names.heartbeat_var.as_deref().and_then(resolve_env),
    };

    Ok(ResolvedSecrets {
        bridge_api_key,
        llm_api_key,
        alerts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn backtest_mode_requires_nothing() {
        let cfg = json!({});
        let secrets = resolve_secrets_for_mode(&cfg, "backtest").unwrap();
        assert!(secrets.bridge_api_key.is_none());
    }

    #[test]
    fn live_mode_errors_when_bridge_key_unset() {
        std::env::remove_var("TWE_BRIDGE_API_KEY_TEST_UNSET");
        let cfg = json!({
            "trading": { "bridge": { "keys_env": { "api_key": "TWE_BRIDGE_API_KEY_TEST_UNSET" } } }
        });
        let err = resolve_secrets_for_mode(&cfg, "live").unwrap_err();
        assert!(err.to_string().contains("TWE_BRIDGE_API_KEY_TEST_UNSET"));
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let cfg = json!({});
        assert!(resolve_secrets_for_mode(&cfg, "staging").is_err());
    }
}
