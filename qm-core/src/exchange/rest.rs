//! Exchange REST client (spec.md §6: Markets, Portfolio, Orders).
//!
//! `RestClient` implements both `ExchangeRest` (read-only market/portfolio
//! surface) and `execution::ExchangeOrders` (the order-mutation surface
//! `OrderReconciler` drives), mirroring the teacher's split between the
//! `Executor` trait's order methods and its separate metadata queries.
//! Request signing (RSA-PSS, per spec.md §1 Non-goals) is delegated to an
//! injected `Signer`, matching the teacher's `LighterExecutor` stub
//! pattern of logging the would-be request shape behind a narrow trait
//! rather than embedding a credential scheme here.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::Serialize;
use tracing::{debug, warn};

use crate::core::types::{now_ms, Action, Side, Ticker};
use crate::execution::{CancelResult, CreateResult, ExchangeOrders, NewOrderInput};

use super::types::{Balance, MarketRecord, OrderRecord, Page, PositionRecord};

/// Produces the auth headers for a signed REST or WS handshake request.
/// The signature scheme itself is out of scope; implementations plug in
/// whatever the exchange's credential format requires.
pub trait Signer: Send + Sync {
    fn sign(&self, method: &str, path: &str, timestamp_ms: i64) -> Vec<(String, String)>;
}

/// A `Signer` that attaches no headers, for talking to an unauthenticated
/// demo endpoint or a local test server.
pub struct NoopSigner;

impl Signer for NoopSigner {
    fn sign(&self, _method: &str, _path: &str, _timestamp_ms: i64) -> Vec<(String, String)> {
        Vec::new()
    }
}

#[async_trait]
pub trait ExchangeRest: Send + Sync {
    async fn get_markets(&self, cursor: Option<&str>, limit: u32) -> Result<Page<MarketRecord>>;
    async fn get_market(&self, ticker: &str) -> Result<MarketRecord>;
    async fn get_positions(
        &self,
        cursor: Option<&str>,
        limit: u32,
        count_filter: Option<&str>,
    ) -> Result<Page<PositionRecord>>;
    async fn get_balance(&self) -> Result<Balance>;
    /// Resting orders still open at the exchange, optionally filtered to
    /// one ticker. Used only at startup to find orphans from a prior run.
    async fn get_orders(&self, ticker: Option<&str>) -> Result<Page<OrderRecord>>;
}

#[derive(Clone)]
pub struct RestClient {
    http: Client,
    base_url: String,
    signer: Arc<dyn Signer>,
    timeout: Duration,
}

impl RestClient {
    pub fn new(base_url: impl Into<String>, signer: Arc<dyn Signer>) -> Self {
        Self {
            http: Client::builder().build().expect("reqwest client builder"),
            base_url: base_url.into(),
            signer,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn signed(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let now = now_ms();
        let headers = self.signer.sign(method.as_str(), path, now);
        let mut req = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .timeout(self.timeout);
        for (name, value) in headers {
            req = req.header(name, value);
        }
        req
    }
}

#[async_trait]
impl ExchangeRest for RestClient {
    async fn get_markets(&self, cursor: Option<&str>, limit: u32) -> Result<Page<MarketRecord>> {
        let mut req = self.signed(Method::GET, "/markets").query(&[("limit", limit.to_string())]);
        if let Some(cursor) = cursor {
            req = req.query(&[("cursor", cursor)]);
        }
        req.send()
            .await
            .context("get_markets request")?
            .error_for_status()
            .context("get_markets status")?
            .json()
            .await
            .context("get_markets body")
    }

    async fn get_market(&self, ticker: &str) -> Result<MarketRecord> {
        self.signed(Method::GET, &format!("/markets/{ticker}"))
            .send()
            .await
            .context("get_market request")?
            .error_for_status()
            .context("get_market status")?
            .json()
            .await
            .context("get_market body")
    }

    async fn get_positions(
        &self,
        cursor: Option<&str>,
        limit: u32,
        count_filter: Option<&str>,
    ) -> Result<Page<PositionRecord>> {
        let mut req = self.signed(Method::GET, "/portfolio/positions").query(&[("limit", limit.to_string())]);
        if let Some(cursor) = cursor {
            req = req.query(&[("cursor", cursor)]);
        }
        if let Some(count_filter) = count_filter {
            req = req.query(&[("count_filter", count_filter)]);
        }
        req.send()
            .await
            .context("get_positions request")?
            .error_for_status()
            .context("get_positions status")?
            .json()
            .await
            .context("get_positions body")
    }

    async fn get_balance(&self) -> Result<Balance> {
        self.signed(Method::GET, "/portfolio/balance")
            .send()
            .await
            .context("get_balance request")?
            .error_for_status()
            .context("get_balance status")?
            .json()
            .await
            .context("get_balance body")
    }

    async fn get_orders(&self, ticker: Option<&str>) -> Result<Page<OrderRecord>> {
        let mut req = self.signed(Method::GET, "/portfolio/orders").query(&[("status", "resting")]);
        if let Some(ticker) = ticker {
            req = req.query(&[("ticker", ticker)]);
        }
        req.send()
            .await
            .context("get_orders request")?
            .error_for_status()
            .context("get_orders status")?
            .json()
            .await
            .context("get_orders body")
    }
}

#[derive(Debug, Serialize)]
struct CreateOrderBody {
    ticker: Ticker,
    #[serde(rename = "type")]
    order_type: &'static str,
    side: Side,
    action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    yes_price: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    no_price: Option<u32>,
    count: u32,
    client_order_id: String,
}

impl CreateOrderBody {
    fn from_input(input: &NewOrderInput, client_order_id: &str) -> Self {
        let (yes_price, no_price) = match input.side {
            Side::Yes => (Some(input.price), None),
            Side::No => (None, Some(input.price)),
        };
        Self {
            ticker: input.ticker.clone(),
            order_type: "limit",
            side: input.side,
            action: input.action,
            yes_price,
            no_price,
            count: input.count,
            client_order_id: client_order_id.to_string(),
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct OrderEnvelope {
    order: OrderAck,
}

#[derive(Debug, serde::Deserialize)]
struct OrderAck {
    order_id: String,
}

#[async_trait]
impl ExchangeOrders for RestClient {
    async fn create_order(&self, input: &NewOrderInput, client_order_id: &str) -> CreateResult {
        let body = CreateOrderBody::from_input(input, client_order_id);
        let response = self.signed(Method::POST, "/portfolio/orders").json(&body).send().await;

        match response {
            Ok(resp) if resp.status().is_success() => match resp.json::<OrderEnvelope>().await {
                Ok(env) => CreateResult {
                    client_order_id: client_order_id.to_string(),
                    exchange_id: Some(env.order.order_id),
                    error: None,
                },
                Err(err) => CreateResult {
                    client_order_id: client_order_id.to_string(),
                    exchange_id: None,
                    error: Some(format!("malformed create response: {err}")),
                },
            },
            Ok(resp) => {
                let status = resp.status();
                let text = resp.text().await.unwrap_or_default();
                warn!(%status, body = %text, "order create rejected");
                CreateResult {
                    client_order_id: client_order_id.to_string(),
                    exchange_id: None,
                    error: Some(format!("{status}: {text}")),
                }
            }
            Err(err) => CreateResult {
                client_order_id: client_order_id.to_string(),
                exchange_id: None,
                error: Some(err.to_string()),
            },
        }
    }

    async fn cancel_order(&self, exchange_id: &str, client_order_id: &str) -> CancelResult {
        let response = self.signed(Method::DELETE, &format!("/portfolio/orders/{exchange_id}")).send().await;
        match response {
            Ok(resp) if resp.status().is_success() => CancelResult {
                client_order_id: client_order_id.to_string(),
                error: None,
            },
            Ok(resp) => {
                let status = resp.status();
                CancelResult {
                    client_order_id: client_order_id.to_string(),
                    error: Some(format!("cancel rejected: {status}")),
                }
            }
            Err(err) => CancelResult {
                client_order_id: client_order_id.to_string(),
                error: Some(err.to_string()),
            },
        }
    }

    async fn batch_create(&self, inputs: &[(NewOrderInput, String)]) -> Vec<CreateResult> {
        debug!(count = inputs.len(), "batch_create_orders");
        let orders: Vec<CreateOrderBody> = inputs.iter().map(|(i, id)| CreateOrderBody::from_input(i, id)).collect();
        let response = self
            .signed(Method::POST, "/batch_create_orders")
            .json(&serde_json::json!({ "orders": orders }))
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                #[derive(serde::Deserialize)]
                struct Entry {
                    order: Option<OrderAck>,
                    error: Option<String>,
                }
                #[derive(serde::Deserialize)]
                struct BatchEnvelope {
                    orders: Vec<Entry>,
                }
                match resp.json::<BatchEnvelope>().await {
                    Ok(env) => inputs
                        .iter()
                        .zip(env.orders)
                        .map(|((_, client_order_id), entry)| CreateResult {
                            client_order_id: client_order_id.clone(),
                            exchange_id: entry.order.map(|o| o.order_id),
                            error: entry.error,
                        })
                        .collect(),
                    Err(err) => {
                        warn!(%err, "malformed batch_create response, falling back to sequential");
                        self.fallback_sequential_create(inputs).await
                    }
                }
            }
            _ => self.fallback_sequential_create(inputs).await,
        }
    }

    async fn batch_cancel(&self, ids: &[(String, String)]) -> Vec<CancelResult> {
        debug!(count = ids.len(), "batch_cancel_orders");
        let exchange_ids: Vec<&str> = ids.iter().map(|(eid, _)| eid.as_str()).collect();
        let response = self
            .signed(Method::POST, "/batch_cancel_orders")
            .json(&serde_json::json!({ "ids": exchange_ids }))
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => ids
                .iter()
                .map(|(_, client_order_id)| CancelResult {
                    client_order_id: client_order_id.clone(),
                    error: None,
                })
                .collect(),
            _ => {
                warn!("batch_cancel_orders failed, falling back to per-order cancel");
                let mut results = Vec::with_capacity(ids.len());
                for (exchange_id, client_order_id) in ids {
                    results.push(self.cancel_order(exchange_id, client_order_id).await);
                }
                results
            }
        }
    }
}

impl RestClient {
    async fn fallback_sequential_create(&self, inputs: &[(NewOrderInput, String)]) -> Vec<CreateResult> {
        let mut results = Vec::with_capacity(inputs.len());
        for (input, client_order_id) in inputs {
            results.push(self.create_order(input, client_order_id).await);
        }
        results
    }
}
