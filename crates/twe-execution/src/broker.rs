use async_trait::async_trait;
use twe_schemas::TradeSide;

/// A single-symbol market order as handed to a broker adapter. `client_order_id`
/// is caller-assigned and stable across retries so brokers that dedupe on it
/// never double-fill a retried submission.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub client_order_id: String,
    pub symbol: String,
    pub side: TradeSide,
    pub qty: u64,
}

/// Terminal or near-terminal broker response to a submit call.
#[derive(Debug, Clone, PartialEq)]
pub enum BrokerAck {
    /// Filled immediately (or reported filled on poll) at `price`.
    Filled { broker_order_id: String, price: f64 },
    /// Broker accepted the order but it has not filled yet.
    Accepted { broker_order_id: String },
    /// Broker rejected the order outright; not worth retrying.
    Rejected { reason: String },
}

/// Errors the adapter itself can raise — transport failures, timeouts,
/// anything that is worth retrying. A [`BrokerAck::Rejected`] is NOT an
/// error: it is a successful round-trip that carries a business rejection.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokerError(pub String);

impl std::fmt::Display for BrokerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "broker error: {}", self.0)
    }
}

impl std::error::Error for BrokerError {}

/// Adapter boundary implemented once per venue connection (live bridge,
/// simulated/paper broker). [`crate::OrderExecutor`] is the only caller.
#[async_trait]
pub trait BrokerAdapter: Send + Sync {
    async fn submit_order(&self, req: &OrderRequest) -> Result<BrokerAck, BrokerError>;
}
