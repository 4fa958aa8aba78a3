//! Drains the `oms_outbox` table (twe-db PATCH 19) against a live broker
//! connection. `twe-runtime` is the only crate licensed to call
//! `outbox_claim_batch` — every other process only enqueues or reads.
//!
//! A claimed row that fails to dispatch is released back to PENDING rather
//! than left CLAIMED, so a crashed dispatcher never permanently strands an
//! order.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use twe_execution::{BrokerAdapter, OrderRequest};
use twe_schemas::TradeSide;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxOrderPayload {
    pub client_order_id: String,
    pub symbol: String,
    pub side: TradeSide,
    pub qty: u64,
}

impl From<OutboxOrderPayload> for OrderRequest {
    fn from(p: OutboxOrderPayload) -> Self {
        OrderRequest { client_order_id: p.client_order_id, symbol: p.symbol, side: p.side, qty: p.qty }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DispatchSummary {
    pub sent: u64,
    pub rejected: u64,
    pub malformed: u64,
}

/// Claim up to `batch_size` PENDING rows and submit each through `broker`.
/// A malformed `order_json` row is left CLAIMED (it will never decode
/// successfully on retry either) and logged rather than silently dropped.
pub async fn dispatch_outbox_batch<B: BrokerAdapter>(
    pool: &PgPool,
    broker: &B,
    dispatcher_id: &str,
    batch_size: i64,
) -> anyhow::Result<DispatchSummary> {
    let claimed = twe_db::outbox_claim_batch(pool, batch_size, dispatcher_id).await?;
    let mut summary = DispatchSummary::default();

    for row in claimed {
        let payload: OutboxOrderPayload = match serde_json::from_value(row.order_json.clone()) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(outbox_id = row.outbox_id, error = %e, "outbox row order_json did not decode");
                summary.malformed += 1;
                continue;
            }
        };

        let req: OrderRequest = payload.into();
        match broker.submit_order(&req).await {
            Ok(_) => {
                twe_db::outbox_mark_sent(pool, &row.idempotency_key).await?;
                summary.sent += 1;
            }
            Err(e) => {
                tracing::warn!(outbox_id = row.outbox_id, error = %e, "broker submit failed; releasing claim");
                twe_db::outbox_release_claim(pool, &row.idempotency_key).await?;
                summary.rejected += 1;
            }
        }
    }

    Ok(summary)
}
