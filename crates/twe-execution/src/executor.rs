use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::broker::{BrokerAck, BrokerAdapter, BrokerError, OrderRequest};

/// Number of submit attempts before giving up on a single order
/// ("3 retries, exponential backoff").
pub const MAX_ATTEMPTS: u32 = 3;

/// Outcome of [`OrderExecutor::submit`].
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Filled { broker_order_id: String, price: f64 },
    Accepted { broker_order_id: String },
    Rejected { reason: String },
    /// Every retry attempt raised a transport-level [`BrokerError`]; the
    /// last one is carried for logging.
    ExhaustedRetries { last_error: BrokerError },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitError {
    /// A submission for this symbol is already in flight. The caller must
 /// wait for it to resolve before issuing another (    /// "in-flight-per-symbol guard").
    AlreadyInFlight,
}

/// Retries a broker submission with exponential backoff and refuses to
/// submit a second order for a symbol while one is still in flight.
///
/// Backoff follows `2^attempt` seconds: the first retry waits 2s, the
/// second 4s. `MAX_ATTEMPTS` submissions are made in total before the
/// executor gives up and reports [`ExecutionOutcome::ExhaustedRetries`].
pub struct OrderExecutor<B: BrokerAdapter> {
    broker: Arc<B>,
    in_flight: Mutex<HashSet<String>>,
}

impl<B: BrokerAdapter> OrderExecutor<B> {
    pub fn new(broker: Arc<B>) -> Self {
        Self {
            broker,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub async fn is_in_flight(&self, symbol: &str) -> bool {
        self.in_flight.lock().await.contains(symbol)
    }

    /// Submit `req`, retrying transport errors up to [`MAX_ATTEMPTS`] times.
    /// Returns [`SubmitError::AlreadyInFlight`] without touching the broker
    /// if another order for the same symbol is still being worked.
    pub async fn submit(&self, req: OrderRequest) -> Result<ExecutionOutcome, SubmitError> {
        {
            let mut guard = self.in_flight.lock().await;
            if !guard.insert(req.symbol.clone()) {
                return Err(SubmitError::AlreadyInFlight);
            }
        }

        let outcome = self.submit_with_retry(&req).await;

        self.in_flight.lock().await.remove(&req.symbol);
        Ok(outcome)
    }

    async fn submit_with_retry(&self, req: &OrderRequest) -> ExecutionOutcome {
        let mut last_error = None;
        for attempt in 0..MAX_ATTEMPTS {
            match self.broker.submit_order(req).await {
                Ok(BrokerAck::Filled { broker_order_id, price }) => {
                    return ExecutionOutcome::Filled { broker_order_id, price }
                }
                Ok(BrokerAck::Accepted { broker_order_id }) => {
                    return ExecutionOutcome::Accepted { broker_order_id }
                }
                Ok(BrokerAck::Rejected { reason }) => return ExecutionOutcome::Rejected { reason },
                Err(err) => {
                    tracing::warn!(
                        symbol = %req.symbol,
                        attempt,
                        error = %err,
                        "broker submit failed, will retry"
                    );
                    last_error = Some(err);
                    if attempt + 1 < MAX_ATTEMPTS {
                        tokio::time::sleep(Duration::from_secs(2u64.pow(attempt + 1))).await;
                    }
                }
            }
        }
        ExecutionOutcome::ExhaustedRetries {
            last_error: last_error.expect("loop runs at least once"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use twe_schemas::TradeSide;

    fn req(symbol: &str) -> OrderRequest {
        OrderRequest {
            client_order_id: format!("{symbol}-1"),
            symbol: symbol.to_string(),
            side: TradeSide::Buy,
            qty: 1000,
        }
    }

    struct AlwaysFills;

    #[async_trait::async_trait]
    impl BrokerAdapter for AlwaysFills {
        async fn submit_order(&self, req: &OrderRequest) -> Result<BrokerAck, BrokerError> {
            Ok(BrokerAck::Filled {
                broker_order_id: format!("b-{}", req.client_order_id),
                price: 100.0,
            })
        }
    }

    struct FailsNTimesThenFills {
        remaining_failures: AtomicU32,
    }

    #[async_trait::async_trait]
    impl BrokerAdapter for FailsNTimesThenFills {
        async fn submit_order(&self, req: &OrderRequest) -> Result<BrokerAck, BrokerError> {
            if self.remaining_failures.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                if n > 0 { Some(n - 1) } else { None }
            }).is_ok() {
                return Err(BrokerError("timeout".to_string()));
            }
            Ok(BrokerAck::Filled {
                broker_order_id: format!("b-{}", req.client_order_id),
                price: 101.0,
            })
        }
    }

    struct AlwaysFails;

    #[async_trait::async_trait]
    impl BrokerAdapter for AlwaysFails {
        async fn submit_order(&self, _req: &OrderRequest) -> Result<BrokerAck, BrokerError> {
            Err(BrokerError("connection refused".to_string()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fills_on_first_attempt() {
        let executor = OrderExecutor::new(Arc::new(AlwaysFills));
        let outcome = executor.submit(req("2330")).await.unwrap();
        assert_eq!(
            outcome,
            ExecutionOutcome::Filled {
                broker_order_id: "b-2330-1".to_string(),
                price: 100.0
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_failures_then_fills() {
        let broker = Arc::new(FailsNTimesThenFills {
            remaining_failures: AtomicU32::new(2),
        });
        let executor = OrderExecutor::new(broker);
        let outcome = executor.submit(req("2330")).await.unwrap();
        assert_eq!(
            outcome,
            ExecutionOutcome::Filled {
                broker_order_id: "b-2330-1".to_string(),
                price: 101.0
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_retries_and_reports_last_error() {
        let executor = OrderExecutor::new(Arc::new(AlwaysFails));
        let outcome = executor.submit(req("2330")).await.unwrap();
        match outcome {
            ExecutionOutcome::ExhaustedRetries { last_error } => {
                assert_eq!(last_error, BrokerError("connection refused".to_string()));
            }
            other => panic!("expected ExhaustedRetries, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rejection_is_not_retried() {
        struct RejectsImmediately;
        #[async_trait::async_trait]
        impl BrokerAdapter for RejectsImmediately {
            async fn submit_order(&self, _req: &OrderRequest) -> Result<BrokerAck, BrokerError> {
                Ok(BrokerAck::Rejected {
                    reason: "insufficient buying power".to_string(),
                })
            }
        }
        let executor = OrderExecutor::new(Arc::new(RejectsImmediately));
        let outcome = executor.submit(req("2330")).await.unwrap();
        assert_eq!(
            outcome,
            ExecutionOutcome::Rejected {
                reason: "insufficient buying power".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn second_submit_for_same_symbol_is_refused_while_in_flight() {
        use tokio::sync::Notify;

        struct HangsUntilReleased {
            notify: Arc<Notify>,
        }
        #[async_trait::async_trait]
        impl BrokerAdapter for HangsUntilReleased {
            async fn submit_order(&self, req: &OrderRequest) -> Result<BrokerAck, BrokerError> {
                self.notify.notified().await;
                Ok(BrokerAck::Filled {
                    broker_order_id: format!("b-{}", req.client_order_id),
                    price: 100.0,
                })
            }
        }

        let notify = Arc::new(Notify::new());
        let broker = Arc::new(HangsUntilReleased { notify: notify.clone() });
        let executor = Arc::new(OrderExecutor::new(broker));

        let first = tokio::spawn({
            let executor = executor.clone();
            async move { executor.submit(req("2330")).await }
        });

        // Give the spawned task a chance to register the in-flight guard.
        tokio::task::yield_now().await;
        assert!(executor.is_in_flight("2330").await);

        let second = executor.submit(req("2330")).await;
        assert_eq!(second, Err(SubmitError::AlreadyInFlight));

        notify.notify_one();
        first.await.unwrap().unwrap();
        assert!(!executor.is_in_flight("2330").await);
    }
}
