//! Startup reconciliation (spec.md §4.11): the fixed six-step sequence
//! a fresh process runs before entering its main loop. Grounded on the
//! teacher's `main.rs` setup sequence (client construction, position
//! sync, feed connect) linearized here into one testable function
//! instead of scattered across `main`.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::core::clock::Clock;
use crate::exchange::{ExchangeRest, Feed};
use crate::execution::ExchangeOrders;
use crate::inventory::PortfolioEntry;
use crate::strategy::Strategy;
use crate::supervisor::quoting::QuotingSupervisor;

/// Runs steps 1-4 of spec.md §4.11 against an already-constructed
/// supervisor: cancel orphan resting orders for `tickers`, sync
/// positions, and fetch close-time metadata. Feed connect/subscribe
/// (steps 5-6) is the caller's responsibility since it owns the `Feed`
/// and needs to keep it for the main loop.
pub async fn reconcile<S, E, R>(
    supervisor: &mut QuotingSupervisor<S, E>,
    rest: &R,
    clock: &Arc<dyn Clock>,
    tickers: &[String],
) -> Result<()>
where
    S: Strategy,
    E: ExchangeOrders,
    R: ExchangeRest + ExchangeOrders,
{
    cancel_orphan_orders(rest, tickers).await;
    sync_positions(supervisor, rest).await?;
    refresh_metadata(supervisor, rest, clock, tickers).await;
    Ok(())
}

async fn cancel_orphan_orders<R: ExchangeRest + ExchangeOrders>(rest: &R, tickers: &[String]) {
    for ticker in tickers {
        let orders = match rest.get_orders(Some(ticker)).await {
            Ok(page) => page.data,
            Err(err) => {
                warn!(%ticker, %err, "failed to list resting orders at startup, skipping orphan cancel");
                continue;
            }
        };
        for order in orders {
            info!(ticker = %order.ticker, order_id = %order.order_id, "cancelling orphan resting order from prior session");
            let result = rest.cancel_order(&order.order_id, &order.order_id).await;
            if let Some(err) = result.error {
                warn!(order_id = %order.order_id, %err, "failed to cancel orphan order");
            }
        }
    }
}

async fn sync_positions<S: Strategy, E: ExchangeOrders, R: ExchangeRest>(
    supervisor: &mut QuotingSupervisor<S, E>,
    rest: &R,
) -> Result<()> {
    let mut entries = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = rest
            .get_positions(cursor.as_deref(), 200, None)
            .await
            .context("fetch positions at startup")?;
        for record in &page.data {
            let (yes, no) = if record.position >= 0 {
                (record.position, 0)
            } else {
                (0, -record.position)
            };
            // Per-side average entry price isn't reported separately; the
            // exchange gives only one `market_exposure` total, so the whole
            // figure is attributed to whichever side is actually held.
            let cost_basis = if yes > 0 { (record.market_exposure, 0) } else { (0, record.market_exposure) };
            entries.push(PortfolioEntry {
                ticker: record.ticker.clone(),
                yes,
                no,
                cost_basis,
            });
        }
        cursor = page.cursor;
        if cursor.is_none() {
            break;
        }
    }
    info!(count = entries.len(), "synced positions at startup");
    supervisor.inventory_mut().initialize_from_portfolio(&entries);
    Ok(())
}

async fn refresh_metadata<S: Strategy, E: ExchangeOrders, R: ExchangeRest>(
    supervisor: &mut QuotingSupervisor<S, E>,
    rest: &R,
    clock: &Arc<dyn Clock>,
    tickers: &[String],
) {
    for ticker in tickers {
        match rest.get_market(ticker).await {
            Ok(market) => {
                if let Some(close_time) = market.close_time {
                    supervisor.metadata_mut().insert(ticker, close_time);
                }
            }
            Err(err) => {
                warn!(%ticker, %err, "failed to fetch market metadata at startup");
            }
        }
    }
    let _ = clock.now_ms();
}

/// Connects the feed and subscribes the required channels (spec.md §4.11
/// steps 5-6): `orderbook_delta` (implies snapshot-on-subscribe),
/// `ticker`, and the authenticated `fill` channel.
pub async fn connect_and_subscribe<F: Feed>(feed: &mut F, tickers: Vec<String>) -> Result<()> {
    feed.connect().await.context("connect feed")?;
    feed.subscribe(
        &["orderbook_delta".to_string(), "ticker".to_string(), "fill".to_string()],
        Some(tickers),
    )
    .await
    .context("subscribe feed channels")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::exchange::{Balance, MarketRecord, OrderRecord, Page, PositionRecord};
    use crate::execution::{CancelResult, CreateResult, NewOrderInput};
    use crate::risk::{CircuitBreakerParams, DrawdownParams};
    use crate::core::types::RiskLimits;
    use crate::strategy::symmetric::{SymmetricParams, SymmetricStrategy};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeRest {
        orders: Vec<OrderRecord>,
        positions: Vec<PositionRecord>,
        cancelled: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ExchangeRest for FakeRest {
        async fn get_markets(&self, _cursor: Option<&str>, _limit: u32) -> Result<Page<MarketRecord>> {
            Ok(Page { data: vec![], cursor: None })
        }
        async fn get_market(&self, ticker: &str) -> Result<MarketRecord> {
            Ok(MarketRecord {
                ticker: ticker.to_string(),
                status: "open".into(),
                yes_bid: None,
                yes_ask: None,
                volume: 0,
                volume_24h: 0,
                open_interest: 0,
                close_time: Some(50_000),
                expiration_time: None,
                category: None,
                event_ticker: None,
                title: None,
                liquidity: None,
            })
        }
        async fn get_positions(&self, _cursor: Option<&str>, _limit: u32, _count_filter: Option<&str>) -> Result<Page<PositionRecord>> {
            Ok(Page { data: self.positions.clone(), cursor: None })
        }
        async fn get_balance(&self) -> Result<Balance> {
            Ok(Balance { balance: 0, portfolio_value: 0 })
        }
        async fn get_orders(&self, _ticker: Option<&str>) -> Result<Page<OrderRecord>> {
            Ok(Page { data: self.orders.clone(), cursor: None })
        }
    }

    #[async_trait]
    impl ExchangeOrders for FakeRest {
        async fn create_order(&self, _input: &NewOrderInput, client_order_id: &str) -> CreateResult {
            CreateResult { client_order_id: client_order_id.to_string(), exchange_id: Some("x".into()), error: None }
        }
        async fn cancel_order(&self, exchange_id: &str, client_order_id: &str) -> CancelResult {
            self.cancelled.lock().unwrap().push(exchange_id.to_string());
            CancelResult { client_order_id: client_order_id.to_string(), error: None }
        }
    }

    fn supervisor(clock: Arc<dyn Clock>) -> QuotingSupervisor<SymmetricStrategy, FakeRest> {
        QuotingSupervisor::new(
            SymmetricStrategy::new(SymmetricParams { edge_cents: 1, min_spread_cents: 2, size_per_side: 5, max_market_spread: 20 }),
            FakeRest { orders: vec![], positions: vec![], cancelled: Mutex::new(vec![]) },
            clock,
            RiskLimits { max_position_per_market: 1_000, max_total_exposure: 1_000, max_daily_loss: 100_000, max_order_size: 50, min_spread: 1 },
            DrawdownParams { scale_down_start: 10_000, half_size_drawdown: 20_000, halt_drawdown: 30_000 },
            CircuitBreakerParams { max_consecutive_losses: 5, max_losses_in_window: 5, window_ms: 60_000, cooldown_ms: 60_000 },
            crate::config::SupervisorConfig::default(),
            None,
        )
    }

    #[tokio::test]
    async fn orphan_orders_are_cancelled_and_positions_synced() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0));
        let mut sup = supervisor(clock.clone());
        let rest = FakeRest {
            orders: vec![OrderRecord { order_id: "o1".into(), ticker: "T".into(), status: "resting".into() }],
            positions: vec![PositionRecord { ticker: "T".into(), position: 10, market_exposure: 450, realized_pnl: None, total_traded: None }],
            cancelled: Mutex::new(vec![]),
        };

        reconcile(&mut sup, &rest, &clock, &["T".to_string()]).await.unwrap();

        assert_eq!(rest.cancelled.lock().unwrap().as_slice(), &["o1".to_string()]);
        assert_eq!(sup.inventory().position("T").yes_contracts, 10);
    }
}
