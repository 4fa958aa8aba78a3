//! Request and response types for all twe-daemon HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded
//! by Axum and decoded by tests.  No business logic lives here.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// Gate refusal (403) — Patch L1
// ---------------------------------------------------------------------------

/// Response body when a daemon route is refused due to a gate check failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateRefusedResponse {
    pub error: String,
    /// Which gate failed: "integrity_armed" | "risk_allowed" | "reconcile_clean"
    pub gate: String,
}

// ---------------------------------------------------------------------------
// /v1/integrity/arm  /v1/integrity/disarm
// ---------------------------------------------------------------------------

/// Response for integrity arm / disarm endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityResponse {
    /// true = armed (execution allowed), false = disarmed (execution blocked).
    pub armed: bool,
    /// Active run ID at the moment of the call (if any).
    pub active_run_id: Option<Uuid>,
    /// Current run-lifecycle state ("idle" | "running" | "halted").
    pub state: String,
}

// ---------------------------------------------------------------------------
// POST /v1/control/command — ControlPlane
// ---------------------------------------------------------------------------

/// One command line in the grammar documented at, e.g.
/// `"pause"`, `"changeshare 500"`, `"selectstrategy 2330.TW Pivot Points"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlCommandRequest {
    pub command: String,
}

/// Refusal body for a rejected control command — parse failures, an
/// unregistered strategy name, or a failed go-live eligibility check all
/// come back through this shape rather than a bare 500.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlCommandRefused {
    pub error: String,
}
