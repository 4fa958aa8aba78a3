//! Live [`BridgeClient`] over HTTP, grounded on the teacher's
//! `mqk-md::TwelveDataHistoricalProvider` reqwest-client idiom: a single
//! `reqwest::Client`, a base URL, and one request builder per endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use twe_execution::{BrokerAck, BrokerAdapter, BrokerError, OrderRequest};

use crate::{
    BridgeAccount, BridgeClient, BridgeError, BridgeHealth, BridgeOrderAction, BridgeOrderBook,
    BridgeOrderRequest, BridgeOrderResult, BridgeSignal, QuoteTick,
};

/// HTTP client for the bridge process (`trading.bridge.{url,timeoutMs}`).
#[derive(Debug, Clone)]
pub struct HttpBridge {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBridge {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BridgeError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BridgeError::Unreachable(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send_json<T: for<'de> Deserialize<'de>>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T, BridgeError> {
        let resp = req.send().await.map_err(map_send_err)?;
        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "bridge returned non-success status");
            return Err(BridgeError::Http {
                status: status.as_u16(),
            });
        }
        resp.json::<T>().await.map_err(|e| {
            tracing::warn!(error = %e, "failed to decode bridge response");
            BridgeError::Decode(e.to_string())
        })
    }
}

fn map_send_err(e: reqwest::Error) -> BridgeError {
    if e.is_timeout() {
        BridgeError::Timeout
    } else {
        BridgeError::Unreachable(e.to_string())
    }
}

#[async_trait]
impl BridgeClient for HttpBridge {
    async fn health(&self) -> Result<BridgeHealth, BridgeError> {
        self.send_json(self.http.get(self.url("/health"))).await
    }

    async fn signal(&self, symbol: &str) -> Result<BridgeSignal, BridgeError> {
        self.send_json(
            self.http
                .get(self.url("/signal"))
                .query(&[("symbol", symbol)]),
        )
        .await
    }

    async fn stream_quotes(&self, symbol: &str, limit: u32) -> Result<Vec<QuoteTick>, BridgeError> {
        #[derive(Deserialize)]
        struct Resp {
            quotes: Vec<QuoteTick>,
            #[allow(dead_code)]
            count: i64,
        }
        let resp: Resp = self
            .send_json(
                self.http
                    .get(self.url("/stream/quotes"))
                    .query(&[("symbol", symbol), ("limit", &limit.to_string())]),
            )
            .await?;
        Ok(resp.quotes)
    }

    async fn orderbook(&self, symbol: &str) -> Result<BridgeOrderBook, BridgeError> {
        self.send_json(self.http.get(self.url(&format!("/orderbook/{symbol}"))))
            .await
    }

    async fn submit_order(
        &self,
        order: BridgeOrderRequest,
    ) -> Result<BridgeOrderResult, BridgeError> {
        self.send_json(self.http.post(self.url("/order")).json(&order))
            .await
    }

    async fn shutdown(&self) -> Result<(), BridgeError> {
        let _: crate::BridgeShutdownAck =
            self.send_json(self.http.post(self.url("/shutdown"))).await?;
        Ok(())
    }

    async fn account(&self) -> Result<BridgeAccount, BridgeError> {
        self.send_json(self.http.get(self.url("/account"))).await
    }
}

/// Live order submission: the bridge's `/order` contract carries a price,
/// but `twe_execution::OrderRequest` does not (the engine deals in side +
/// qty; the venue owns pricing). We ask the bridge for the current price
/// via `/signal` before submitting, matching a market order against the
/// last quote.
#[async_trait]
impl BrokerAdapter for HttpBridge {
    async fn submit_order(&self, req: &OrderRequest) -> Result<BrokerAck, BrokerError> {
        let signal = self
            .signal(&req.symbol)
            .await
            .map_err(|e| BrokerError(e.to_string()))?;

        let order = BridgeOrderRequest {
            symbol: req.symbol.clone(),
            action: req.side.into(),
            quantity: req.qty,
            price: signal.current_price,
        };

        let result = BridgeClient::submit_order(self, order)
            .await
            .map_err(|e| BrokerError(e.to_string()))?;

        if result.is_filled() {
            Ok(BrokerAck::Filled {
                broker_order_id: result.order_id.unwrap_or_else(|| req.client_order_id.clone()),
                price: signal.current_price,
            })
        } else {
            Ok(BrokerAck::Rejected {
                reason: result.reason.unwrap_or_else(|| "bridge rejected order".to_string()),
            })
        }
    }
}
