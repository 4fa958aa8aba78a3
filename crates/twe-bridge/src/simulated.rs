//! [`BridgeClient`] for PAPER/BACKTEST modes, grounded on the teacher's
//! paper-broker idiom (see `twe-broker-sim`): `POST /order` fills
//! synchronously at the caller-supplied price with no live process behind
//! it. Market-data endpoints (`signal`, `orderbook`, `stream_quotes`) are
//! out of scope in simulation — bar replay feeds the engine directly from
//! `twe-db`, not through this bridge — so they report
//! [`BridgeError::Unreachable`].

use async_trait::async_trait;
use twe_broker_sim::SimBrokerAdapter;
use twe_execution::{BrokerAck, BrokerAdapter, BrokerError, OrderRequest};

use crate::{
    BridgeAccount, BridgeClient, BridgeError, BridgeHealth, BridgeOrderAction, BridgeOrderBook,
    BridgeOrderRequest, BridgeOrderResult, BridgeSignal, QuoteTick,
};

/// Synchronous paper-mode bridge. Holds the same mark-price-driven
/// [`SimBrokerAdapter`] used outside the bridge abstraction so both entry
/// points share identical fill semantics.
#[derive(Default)]
pub struct SimulatedBridge {
    inner: SimBrokerAdapter,
}

impl SimulatedBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positions(&self) -> std::collections::BTreeMap<String, i64> {
        self.inner.positions()
    }
}

fn not_supported() -> BridgeError {
    BridgeError::Unreachable("market data not served by the simulated bridge".to_string())
}

#[async_trait]
impl BridgeClient for SimulatedBridge {
    async fn health(&self) -> Result<BridgeHealth, BridgeError> {
        Ok(BridgeHealth {
            status: "ok".to_string(),
            connected: true,
            mode: "stock".to_string(),
        })
    }

    async fn signal(&self, _symbol: &str) -> Result<BridgeSignal, BridgeError> {
        Err(not_supported())
    }

    async fn stream_quotes(
        &self,
        _symbol: &str,
        _limit: u32,
    ) -> Result<Vec<QuoteTick>, BridgeError> {
        Err(not_supported())
    }

    async fn orderbook(&self, _symbol: &str) -> Result<BridgeOrderBook, BridgeError> {
        Err(not_supported())
    }

    async fn submit_order(
        &self,
        order: BridgeOrderRequest,
    ) -> Result<BridgeOrderResult, BridgeError> {
        self.inner.set_mark_price(order.symbol.clone(), order.price);

        let side = match order.action {
            BridgeOrderAction::Buy => twe_schemas::TradeSide::Buy,
            BridgeOrderAction::Sell => twe_schemas::TradeSide::Sell,
        };
        let req = OrderRequest {
            client_order_id: uuid::Uuid::new_v4().to_string(),
            symbol: order.symbol,
            side,
            qty: order.quantity,
        };

        match self.inner.submit_order(&req).await {
            Ok(BrokerAck::Filled { broker_order_id, .. }) => Ok(BridgeOrderResult {
                status: "filled".to_string(),
                order_id: Some(broker_order_id),
                reason: None,
            }),
            Ok(BrokerAck::Accepted { broker_order_id }) => Ok(BridgeOrderResult {
                status: "filled".to_string(),
                order_id: Some(broker_order_id),
                reason: None,
            }),
            Ok(BrokerAck::Rejected { reason }) => Ok(BridgeOrderResult {
                status: "rejected".to_string(),
                order_id: None,
                reason: Some(reason),
            }),
            Err(e) => Ok(BridgeOrderResult {
                status: "rejected".to_string(),
                order_id: None,
                reason: Some(e.0),
            }),
        }
    }

    async fn shutdown(&self) -> Result<(), BridgeError> {
        Ok(())
    }

    async fn account(&self) -> Result<BridgeAccount, BridgeError> {
        Err(not_supported())
    }
}

/// Lets `SimulatedBridge` plug directly into `OrderExecutor` without going
/// through the `BridgeClient`/`BridgeOrderRequest` wire types.
#[async_trait]
impl BrokerAdapter for SimulatedBridge {
    async fn submit_order(&self, req: &OrderRequest) -> Result<BrokerAck, BrokerError> {
        self.inner.submit_order(req).await
    }
}
