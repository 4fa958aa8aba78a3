//! [`twe_execution::BrokerAdapter`] implementation over [`PaperBroker`].
//!
//! Fills immediately at the caller-supplied mark price (set via
//! [`SimBrokerAdapter::set_mark_price`] before each bar/tick); an order for a
//! symbol with no known mark price is rejected rather than guessed at.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use twe_execution::{BrokerAck, BrokerAdapter, BrokerError, OrderRequest};
use twe_golive::{OrderStatus, Side as GoliveSide};
use twe_schemas::TradeSide;

use crate::types::SubmitOrder;
use crate::PaperBroker;

/// Paper-trading [`BrokerAdapter`]: one in-memory order book, immediate
/// fills at a tracked mark price, no transport failures to retry.
#[derive(Default)]
pub struct SimBrokerAdapter {
    broker: Mutex<PaperBroker>,
    marks: Mutex<BTreeMap<String, f64>>,
}

impl SimBrokerAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the price new orders for `symbol` fill at. Call once per bar
    /// close before routing that bar's orders through `submit_order`.
    pub fn set_mark_price(&self, symbol: impl Into<String>, price: f64) {
        self.marks.lock().unwrap().insert(symbol.into(), price);
    }

    pub fn positions(&self) -> BTreeMap<String, i64> {
        self.broker.lock().unwrap().positions()
    }
}

fn to_golive_side(side: TradeSide) -> GoliveSide {
    match side {
        TradeSide::Buy => GoliveSide::Buy,
        TradeSide::Sell => GoliveSide::Sell,
    }
}

#[async_trait]
impl BrokerAdapter for SimBrokerAdapter {
    async fn submit_order(&self, req: &OrderRequest) -> Result<BrokerAck, BrokerError> {
        let price = {
            let marks = self.marks.lock().unwrap();
            *marks.get(&req.symbol).ok_or_else(|| {
                BrokerError(format!("no mark price set for {}", req.symbol))
            })?
        };

        let submit = SubmitOrder {
            client_order_id: req.client_order_id.clone(),
            symbol: req.symbol.clone(),
            side: to_golive_side(req.side),
            qty: req.qty as i64,
        };

        let resp = self.broker.lock().unwrap().submit(submit);

        if resp.snapshot.status == OrderStatus::Rejected {
            return Ok(BrokerAck::Rejected {
                reason: "paper broker rejected order".to_string(),
            });
        }

        let delta = match req.side {
            TradeSide::Buy => req.qty as i64,
            TradeSide::Sell => -(req.qty as i64),
        };
        {
            let mut broker = self.broker.lock().unwrap();
            let current = broker.positions().get(&req.symbol).copied().unwrap_or(0);
            broker.set_position(req.symbol.clone(), current + delta);
        }

        Ok(BrokerAck::Filled {
            broker_order_id: resp.broker_order_id,
            price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fills_immediately_at_mark_price_and_updates_position() {
        let adapter = SimBrokerAdapter::new();
        adapter.set_mark_price("2330", 600.0);

        let ack = adapter
            .submit_order(&OrderRequest {
                client_order_id: "co-1".to_string(),
                symbol: "2330".to_string(),
                side: TradeSide::Buy,
                qty: 10,
            })
            .await
            .unwrap();

        match ack {
            BrokerAck::Filled { price, .. } => assert_eq!(price, 600.0),
            other => panic!("expected Filled, got {other:?}"),
        }
        assert_eq!(adapter.positions().get("2330"), Some(&10));
    }

    #[tokio::test]
    async fn rejects_order_with_no_mark_price() {
        let adapter = SimBrokerAdapter::new();
        let err = adapter
            .submit_order(&OrderRequest {
                client_order_id: "co-2".to_string(),
                symbol: "2454".to_string(),
                side: TradeSide::Sell,
                qty: 5,
            })
            .await
            .unwrap_err();
        assert!(err.0.contains("no mark price"));
    }
}
