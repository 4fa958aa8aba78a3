//! twe-bridge — typed client for the external broker/market-data bridge
//! process. The bridge process itself is out of scope; this
//! crate only types the HTTP contract it exposes and gives
//! [`twe_execution::BrokerAdapter`] a live implementation ([`HttpBridge`])
//! plus a synchronous paper-mode one ([`SimulatedBridge`]).

mod http;
mod simulated;

pub use http::HttpBridge;
pub use simulated::SimulatedBridge;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Error taxonomy for bridge calls. Gives `OrderExecutor`'s
/// `TransientExternal` retry category a concrete shape.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeError {
    Timeout,
    Unreachable(String),
    Http { status: u16 },
    Decode(String),
}

impl std::fmt::Display for BridgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BridgeError::Timeout => write!(f, "bridge timeout"),
            BridgeError::Unreachable(msg) => write!(f, "bridge unreachable: {msg}"),
            BridgeError::Http { status } => write!(f, "bridge returned http {status}"),
            BridgeError::Decode(msg) => write!(f, "bridge response decode error: {msg}"),
        }
    }
}

impl std::error::Error for BridgeError {}

/// `GET /health` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeHealth {
    pub status: String,
    pub connected: bool,
    pub mode: String,
}

/// Directional hint carried by `GET /signal`. Distinct from
/// `twe_schemas::Direction`: this is the bridge's own wire vocabulary, not
/// the strategy contract's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BridgeDirection {
    Long,
    Short,
    Exit,
}

/// `GET /signal?symbol=S` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeSignal {
    pub current_price: f64,
    pub direction: Option<BridgeDirection>,
    pub momentum_3m: f64,
    pub momentum_5m: f64,
    pub volume_ratio: f64,
    pub exit_signal: bool,
}

/// One element of `GET /stream/quotes`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuoteTick {
    pub price: f64,
    pub volume: u64,
    pub timestamp: i64,
}

/// A single side's price level as returned by `GET /orderbook/S`. The
/// wire field is `volume`; `twe_schemas::PriceLevel` calls it `size` so we
/// keep a bridge-local type and convert at the edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BridgePriceLevel {
    pub price: f64,
    pub volume: u64,
}

/// `GET /orderbook/S` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeOrderBook {
    pub bids: Vec<BridgePriceLevel>,
    pub asks: Vec<BridgePriceLevel>,
    pub timestamp: i64,
}

impl BridgeOrderBook {
    pub fn to_order_book_data(&self) -> twe_schemas::OrderBookData {
        let to_level = |l: &BridgePriceLevel| twe_schemas::PriceLevel {
            price: l.price,
            size: l.volume,
        };
        twe_schemas::OrderBookData {
            bids: self.bids.iter().map(to_level).collect(),
            asks: self.asks.iter().map(to_level).collect(),
        }
    }
}

/// `action` values accepted by `POST /order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BridgeOrderAction {
    Buy,
    Sell,
}

impl From<twe_schemas::TradeSide> for BridgeOrderAction {
    fn from(side: twe_schemas::TradeSide) -> Self {
        match side {
            twe_schemas::TradeSide::Buy => BridgeOrderAction::Buy,
            twe_schemas::TradeSide::Sell => BridgeOrderAction::Sell,
        }
    }
}

/// `POST /order` request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeOrderRequest {
    pub symbol: String,
    pub action: BridgeOrderAction,
    pub quantity: u64,
    pub price: f64,
}

/// `POST /order` response body. `status` is `"filled"` or `"rejected"`;
/// `order_id`/`reason` are populated accordingly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeOrderResult {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl BridgeOrderResult {
    pub fn is_filled(&self) -> bool {
        self.status == "filled"
    }
}

/// `POST /shutdown` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeShutdownAck {
    pub status: String,
}

/// `GET /account` response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BridgeAccount {
    pub equity: f64,
    pub available_margin: f64,
}

/// One method bridge endpoint. Object-safe so callers can
/// hold `Box<dyn BridgeClient>` and swap `HttpBridge` for `SimulatedBridge`
/// between live and paper/backtest modes.
#[async_trait]
pub trait BridgeClient: Send + Sync {
    async fn health(&self) -> Result<BridgeHealth, BridgeError>;
    async fn signal(&self, symbol: &str) -> Result<BridgeSignal, BridgeError>;
    async fn stream_quotes(&self, symbol: &str, limit: u32) -> Result<Vec<QuoteTick>, BridgeError>;
    async fn orderbook(&self, symbol: &str) -> Result<BridgeOrderBook, BridgeError>;
    async fn submit_order(
        &self,
        order: BridgeOrderRequest,
    ) -> Result<BridgeOrderResult, BridgeError>;
    async fn shutdown(&self) -> Result<(), BridgeError>;
    async fn account(&self) -> Result<BridgeAccount, BridgeError>;
}
