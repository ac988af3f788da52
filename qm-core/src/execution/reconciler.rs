//! `OrderReconciler` (spec.md §4.8): the in-memory registry of orders this
//! process believes are resting at the exchange, keyed by
//! `client_order_id`. Grounded on the teacher's `Executor` trait
//! (`execution::mod::Executor`) for the place/cancel/fills shape, replacing
//! its object-pool fill queue (not needed at this engine's order rate)
//! with a plain `HashMap` registry, and generalizing single-order
//! place/cancel into the batched `update_quote` spec.md calls the central
//! operation.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{error, warn};
use uuid::Uuid;

use crate::core::clock::Clock;
use crate::core::errors::ReconcileError;
use crate::core::types::{Action, ManagedOrder, OrderStatus, Quote, Side, Size, TimestampMs};
use std::sync::Arc;

use super::types::{CancelResult, CreateResult, NewOrderInput};

/// The exchange-facing boundary `OrderReconciler` drives. Implemented by
/// `exchange::rest::RestClient` in production and by an in-memory fake in
/// tests.
#[async_trait]
pub trait ExchangeOrders: Send + Sync {
    async fn create_order(&self, input: &NewOrderInput, client_order_id: &str) -> CreateResult;
    async fn cancel_order(&self, exchange_id: &str, client_order_id: &str) -> CancelResult;

    /// Single-call batch create; default falls back to sequential
    /// per-order calls for implementations that don't support batching.
    async fn batch_create(&self, inputs: &[(NewOrderInput, String)]) -> Vec<CreateResult> {
        let mut results = Vec::with_capacity(inputs.len());
        for (input, client_order_id) in inputs {
            results.push(self.create_order(input, client_order_id).await);
        }
        results
    }

    /// Single-call batch cancel; default falls back to sequential
    /// per-order calls.
    async fn batch_cancel(&self, ids: &[(String, String)]) -> Vec<CancelResult> {
        let mut results = Vec::with_capacity(ids.len());
        for (exchange_id, client_order_id) in ids {
            results.push(self.cancel_order(exchange_id, client_order_id).await);
        }
        results
    }
}

pub struct OrderReconciler<E: ExchangeOrders> {
    exchange: E,
    clock: Arc<dyn Clock>,
    orders: HashMap<String, ManagedOrder>,
}

impl<E: ExchangeOrders> OrderReconciler<E> {
    pub fn new(exchange: E, clock: Arc<dyn Clock>) -> Self {
        Self {
            exchange,
            clock,
            orders: HashMap::new(),
        }
    }

    fn new_client_order_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Place a single order: generate a `client_order_id`, store a Pending
    /// record, then call the exchange and transition the record on the
    /// result.
    pub async fn place(&mut self, input: NewOrderInput) -> String {
        let client_order_id = Self::new_client_order_id();
        let now = self.clock.now_ms();
        self.orders.insert(
            client_order_id.clone(),
            ManagedOrder {
                client_order_id: client_order_id.clone(),
                exchange_id: None,
                ticker: input.ticker.clone(),
                side: input.side,
                action: input.action,
                price: input.price,
                count: input.count,
                filled_count: 0,
                status: OrderStatus::Pending,
                created_ts: now,
            },
        );

        let result = self.exchange.create_order(&input, &client_order_id).await;
        self.apply_create_result(result);
        client_order_id
    }

    fn apply_create_result(&mut self, result: CreateResult) {
        let Some(order) = self.orders.get_mut(&result.client_order_id) else {
            return;
        };
        if let Some(reason) = result.error {
            let err = ReconcileError::ExchangeReject {
                ticker: order.ticker.clone(),
                reason,
            };
            warn!(client_order_id = %result.client_order_id, %err, "order create failed");
            order.status = OrderStatus::Failed;
        } else {
            order.exchange_id = result.exchange_id;
            order.status = OrderStatus::Open;
        }
    }

    pub async fn batch_create(&mut self, inputs: Vec<NewOrderInput>) -> Vec<String> {
        let prepared = self.insert_pending(inputs);
        let results = self.exchange.batch_create(&prepared).await;
        let ids: Vec<String> = prepared.iter().map(|(_, id)| id.clone()).collect();
        for result in results {
            self.apply_create_result(result);
        }
        ids
    }

    /// Cancel a batch of orders by client_order_id; orders with no
    /// exchange_id yet (still Pending) are skipped rather than sent.
    pub async fn batch_cancel(&mut self, client_order_ids: &[String]) -> usize {
        let mut pairs = Vec::new();
        for id in client_order_ids {
            if let Some(order) = self.orders.get(id) {
                if let Some(exchange_id) = &order.exchange_id {
                    pairs.push((exchange_id.clone(), id.clone()));
                }
            }
        }
        if pairs.is_empty() {
            return 0;
        }
        let results = self.exchange.batch_cancel(&pairs).await;
        self.apply_cancel_results(results)
    }

    fn resting_order_ids(&self, ticker: &str) -> Vec<String> {
        self.orders
            .values()
            .filter(|o| o.ticker == ticker && o.is_resting())
            .map(|o| o.client_order_id.clone())
            .collect()
    }

    fn quote_to_inputs(ticker: &str, quote: &Quote) -> Vec<NewOrderInput> {
        let mut inputs = Vec::new();
        if quote.bid_size > 0 && (1..=99).contains(&quote.bid_price) {
            inputs.push(NewOrderInput {
                ticker: ticker.to_string(),
                side: Side::Yes,
                action: Action::Buy,
                price: quote.bid_price,
                count: quote.bid_size,
            });
        }
        if quote.ask_size > 0 && (1..=99).contains(&quote.ask_price) {
            inputs.push(NewOrderInput {
                ticker: ticker.to_string(),
                side: Side::Yes,
                action: Action::Sell,
                price: quote.ask_price,
                count: quote.ask_size,
            });
        }
        inputs
    }

    /// The central reconciler operation: cancel the ticker's resting
    /// orders and place the new quote's orders concurrently, minimizing
    /// the naked window during which neither side is live. The two
    /// exchange calls share only an immutable borrow of `self.exchange`;
    /// local-state mutation (Pending inserts, status transitions) happens
    /// before and after, never during, the concurrent await.
    pub async fn update_quote(&mut self, ticker: &str, quote: &Quote) -> (usize, Vec<String>) {
        let old = self.resting_order_ids(ticker);
        let cancel_pairs: Vec<(String, String)> = old
            .iter()
            .filter_map(|id| self.orders.get(id).and_then(|o| o.exchange_id.clone().map(|eid| (eid, id.clone()))))
            .collect();

        let new_inputs = Self::quote_to_inputs(ticker, quote);
        let prepared = self.insert_pending(new_inputs);

        let (cancel_results, create_results) =
            tokio::join!(self.exchange.batch_cancel(&cancel_pairs), self.exchange.batch_create(&prepared));

        let cancelled = self.apply_cancel_results(cancel_results);
        let ids: Vec<String> = prepared.iter().map(|(_, id)| id.clone()).collect();
        for result in create_results {
            self.apply_create_result(result);
        }
        (cancelled, ids)
    }

    /// Insert Pending records for a batch of new orders and return the
    /// `(input, client_order_id)` pairs the exchange call needs.
    fn insert_pending(&mut self, inputs: Vec<NewOrderInput>) -> Vec<(NewOrderInput, String)> {
        let now = self.clock.now_ms();
        let mut prepared = Vec::with_capacity(inputs.len());
        for input in inputs {
            let client_order_id = Self::new_client_order_id();
            self.orders.insert(
                client_order_id.clone(),
                ManagedOrder {
                    client_order_id: client_order_id.clone(),
                    exchange_id: None,
                    ticker: input.ticker.clone(),
                    side: input.side,
                    action: input.action,
                    price: input.price,
                    count: input.count,
                    filled_count: 0,
                    status: OrderStatus::Pending,
                    created_ts: now,
                },
            );
            prepared.push((input, client_order_id));
        }
        prepared
    }

    fn apply_cancel_results(&mut self, results: Vec<CancelResult>) -> usize {
        let attempted = results.len();
        let mut cancelled = 0;
        for result in results {
            if result.error.is_none() {
                if let Some(order) = self.orders.get_mut(&result.client_order_id) {
                    order.status = OrderStatus::Cancelled;
                }
                cancelled += 1;
            } else {
                error!(client_order_id = %result.client_order_id, "cancel failed");
            }
        }
        let failed = attempted - cancelled;
        if failed > 0 {
            let err = ReconcileError::PartialBatchCancel { attempted, failed };
            error!(%err, "batch cancel did not fully succeed");
        }
        cancelled
    }

    /// Alternative ordering: place new orders before cancelling old ones,
    /// for callers that would rather risk double exposure than a naked
    /// window.
    pub async fn update_quote_atomic(&mut self, ticker: &str, quote: &Quote) -> (Vec<String>, usize) {
        let old = self.resting_order_ids(ticker);
        let new_inputs = Self::quote_to_inputs(ticker, quote);

        let placed = self.batch_create(new_inputs).await;
        let cancelled = self.batch_cancel(&old).await;
        (placed, cancelled)
    }

    pub async fn cancel_all(&mut self, ticker: Option<&str>) -> usize {
        let ids: Vec<String> = self
            .orders
            .values()
            .filter(|o| o.is_resting() && ticker.map(|t| o.ticker == t).unwrap_or(true))
            .map(|o| o.client_order_id.clone())
            .collect();
        self.batch_cancel(&ids).await
    }

    pub fn get_active(&self, ticker: Option<&str>) -> Vec<&ManagedOrder> {
        self.orders
            .values()
            .filter(|o| o.is_resting() && ticker.map(|t| o.ticker == t).unwrap_or(true))
            .collect()
    }

    pub fn get(&self, client_order_id: &str) -> Option<&ManagedOrder> {
        self.orders.get(client_order_id)
    }

    /// Apply a fill report keyed by the exchange-assigned order id: update
    /// `filled_count` and transition `Open -> Partial -> Filled`.
    pub fn on_fill(&mut self, exchange_order_id: &str, count: Size) {
        let Some(order) = self.orders.values_mut().find(|o| o.exchange_id.as_deref() == Some(exchange_order_id)) else {
            let err = ReconcileError::UnknownOrder(exchange_order_id.to_string());
            warn!(%err, "fill for unknown order");
            return;
        };
        order.filled_count += count;
        order.status = if order.filled_count >= order.count {
            OrderStatus::Filled
        } else {
            OrderStatus::Partial
        };
    }

    pub fn get_stale_orders(&self, now: TimestampMs, age_ms: i64) -> Vec<&ManagedOrder> {
        self.orders
            .values()
            .filter(|o| o.is_resting() && now - o.created_ts > age_ms)
            .collect()
    }

    pub fn get_off_price_orders(&self, ticker: &str, fair_value: f64, max_distance: f64) -> Vec<&ManagedOrder> {
        self.orders
            .values()
            .filter(|o| o.ticker == ticker && o.is_resting() && (o.price as f64 - fair_value).abs() > max_distance)
            .collect()
    }

    /// Evict terminal orders older than `max_age_ms`.
    pub fn cleanup(&mut self, now: TimestampMs, max_age_ms: i64) {
        self.orders.retain(|_, o| !o.status.is_terminal() || now - o.created_ts <= max_age_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    struct FakeExchange {
        next_exchange_id: AtomicU64,
        fail_creates: Mutex<bool>,
    }

    impl FakeExchange {
        fn new() -> Self {
            Self {
                next_exchange_id: AtomicU64::new(1),
                fail_creates: Mutex::new(false),
            }
        }
    }

    #[async_trait]
    impl ExchangeOrders for FakeExchange {
        async fn create_order(&self, _input: &NewOrderInput, client_order_id: &str) -> CreateResult {
            if *self.fail_creates.lock().unwrap() {
                return CreateResult {
                    client_order_id: client_order_id.to_string(),
                    exchange_id: None,
                    error: Some("rejected".into()),
                };
            }
            let id = self.next_exchange_id.fetch_add(1, Ordering::SeqCst);
            CreateResult {
                client_order_id: client_order_id.to_string(),
                exchange_id: Some(format!("ex-{id}")),
                error: None,
            }
        }

        async fn cancel_order(&self, _exchange_id: &str, client_order_id: &str) -> CancelResult {
            CancelResult {
                client_order_id: client_order_id.to_string(),
                error: None,
            }
        }
    }

    fn quote() -> Quote {
        Quote {
            bid_price: 49,
            bid_size: 5,
            ask_price: 51,
            ask_size: 5,
        }
    }

    #[tokio::test]
    async fn place_marks_open_on_success() {
        let clock = Arc::new(ManualClock::new(0));
        let mut rec = OrderReconciler::new(FakeExchange::new(), clock);
        let id = rec
            .place(NewOrderInput {
                ticker: "T".into(),
                side: Side::Yes,
                action: Action::Buy,
                price: 50,
                count: 5,
            })
            .await;
        assert_eq!(rec.get(&id).unwrap().status, OrderStatus::Open);
    }

    #[tokio::test]
    async fn update_quote_skips_out_of_range_sides() {
        let clock = Arc::new(ManualClock::new(0));
        let mut rec = OrderReconciler::new(FakeExchange::new(), clock);
        let q = Quote {
            bid_price: 49,
            bid_size: 5,
            ask_price: 0,
            ask_size: 0,
        };
        let (cancelled, placed) = rec.update_quote("T", &q).await;
        assert_eq!(cancelled, 0);
        assert_eq!(placed.len(), 1);
    }

    #[tokio::test]
    async fn update_quote_cancels_old_and_places_new() {
        let clock = Arc::new(ManualClock::new(0));
        let mut rec = OrderReconciler::new(FakeExchange::new(), clock);
        rec.update_quote("T", &quote()).await;
        assert_eq!(rec.get_active(Some("T")).len(), 2);

        let (cancelled, placed) = rec.update_quote("T", &quote()).await;
        assert_eq!(cancelled, 2);
        assert_eq!(placed.len(), 2);
    }

    #[tokio::test]
    async fn on_fill_transitions_open_to_partial_to_filled() {
        let clock = Arc::new(ManualClock::new(0));
        let mut rec = OrderReconciler::new(FakeExchange::new(), clock);
        let id = rec
            .place(NewOrderInput {
                ticker: "T".into(),
                side: Side::Yes,
                action: Action::Buy,
                price: 50,
                count: 10,
            })
            .await;
        let exchange_id = rec.get(&id).unwrap().exchange_id.clone().unwrap();

        rec.on_fill(&exchange_id, 4);
        assert_eq!(rec.get(&id).unwrap().status, OrderStatus::Partial);

        rec.on_fill(&exchange_id, 6);
        assert_eq!(rec.get(&id).unwrap().status, OrderStatus::Filled);
    }

    #[tokio::test]
    async fn cleanup_evicts_old_terminal_orders() {
        let clock = Arc::new(ManualClock::new(0));
        let mut rec = OrderReconciler::new(FakeExchange::new(), clock);
        let id = rec
            .place(NewOrderInput {
                ticker: "T".into(),
                side: Side::Yes,
                action: Action::Buy,
                price: 50,
                count: 5,
            })
            .await;
        rec.batch_cancel(&[id.clone()]).await;
        rec.cleanup(100_000, 1_000);
        assert!(rec.get(&id).is_none());
    }
}
