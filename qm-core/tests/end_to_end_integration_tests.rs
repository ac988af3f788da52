//! End-to-end scenarios driving `QuotingSupervisor` as a whole rather than
//! one subsystem at a time, analogous to the teacher's
//! `end_to_end_integration_tests.rs` and `stale_data_circuit_breaker_tests.rs`.

use std::sync::Arc;

use async_trait::async_trait;

use qm_core::config::SupervisorConfig;
use qm_core::core::types::{Action, Fill, RiskLimits, Side};
use qm_core::execution::{CancelResult, CreateResult, ExchangeOrders, NewOrderInput};
use qm_core::risk::{CircuitBreakerParams, DrawdownParams};
use qm_core::strategy::symmetric::{SymmetricParams, SymmetricStrategy};
use qm_core::supervisor::QuotingSupervisor;
use qm_core::{Clock, ManualClock};

struct FakeExchange;

#[async_trait]
impl ExchangeOrders for FakeExchange {
    async fn create_order(&self, input: &NewOrderInput, client_order_id: &str) -> CreateResult {
        CreateResult {
            client_order_id: client_order_id.to_string(),
            exchange_id: Some(format!("ex-{}-{}", input.ticker, input.price)),
            error: None,
        }
    }

    async fn cancel_order(&self, _exchange_id: &str, client_order_id: &str) -> CancelResult {
        CancelResult { client_order_id: client_order_id.to_string(), error: None }
    }
}

fn supervisor(clock: Arc<ManualClock>) -> QuotingSupervisor<SymmetricStrategy, FakeExchange> {
    QuotingSupervisor::new(
        SymmetricStrategy::new(SymmetricParams {
            edge_cents: 2,
            min_spread_cents: 1,
            size_per_side: 10,
            max_market_spread: 20,
        }),
        FakeExchange,
        clock as Arc<dyn Clock>,
        RiskLimits {
            max_position_per_market: 1_000,
            max_total_exposure: 1_000,
            max_daily_loss: 100_000,
            max_order_size: 50,
            min_spread: 1,
        },
        DrawdownParams { scale_down_start: 10_000, half_size_drawdown: 20_000, halt_drawdown: 30_000 },
        CircuitBreakerParams { max_consecutive_losses: 5, max_losses_in_window: 5, window_ms: 60_000, cooldown_ms: 60_000 },
        SupervisorConfig::default(),
        None,
    )
}

#[tokio::test]
async fn snapshot_then_price_move_replaces_resting_orders() {
    let clock = Arc::new(ManualClock::new(0));
    let mut sup = supervisor(clock.clone());

    sup.on_orderbook_snapshot("T", &[(50, 10)], &[(45, 10)]).await;
    let active = sup.reconciler().get_active(Some("T"));
    assert_eq!(active.len(), 2);
    let bid = active.iter().find(|o| o.side == Side::Yes && o.action == Action::Buy).unwrap();
    let ask = active.iter().find(|o| o.action == Action::Sell).unwrap();
    assert_eq!(bid.price, 51);
    assert_eq!(ask.price, 55);

    // Past both the global and per-ticker debounce windows, with the BBO
    // moved enough to force a fresh quote.
    clock.advance(2_000);
    sup.on_orderbook_delta("T", Side::Yes, 50, 0, None).await;
    sup.on_orderbook_delta("T", Side::Yes, 52, 10, None).await;

    let active = sup.reconciler().get_active(Some("T"));
    assert_eq!(active.len(), 2, "stale quote should have been replaced, not left resting alongside the new one");
    let bid = active.iter().find(|o| o.action == Action::Buy).unwrap();
    assert_eq!(bid.price, 52);
}

#[tokio::test]
async fn consecutive_losing_fills_trip_breaker_and_halt_future_quoting() {
    let clock = Arc::new(ManualClock::new(0));
    let mut sup = supervisor(clock.clone());

    sup.on_orderbook_snapshot("T", &[(50, 10)], &[(45, 10)]).await;
    assert!(!sup.is_paused());

    // Five consecutive losing fills: buy at 60, sell at 55 repeated, each a
    // 5-cent loss on 1 contract (`max_consecutive_losses` == 5).
    for _ in 0..5 {
        sup.on_fill(Fill { order_id: "o".into(), ticker: "T".into(), side: Side::Yes, action: Action::Buy, count: 1, price: 60, ts: clock.now_ms() }).await;
        sup.on_fill(Fill { order_id: "o".into(), ticker: "T".into(), side: Side::Yes, action: Action::Sell, count: 1, price: 55, ts: clock.now_ms() }).await;
    }

    assert!(sup.is_paused(), "five consecutive losses should trip the circuit breaker");

    let before = sup.reconciler().get_active(Some("T")).len();
    clock.advance(2_000);
    sup.on_orderbook_delta("T", Side::Yes, 52, 10, None).await;
    let after = sup.reconciler().get_active(Some("T")).len();
    assert_eq!(before, after, "a halted supervisor must not place new orders while paused");
}

#[tokio::test]
async fn quote_denied_once_total_exposure_limit_reached() {
    let clock = Arc::new(ManualClock::new(0));
    let mut sup = supervisor(clock.clone());

    // Build up contract exposure on one ticker close to the 1,000-contract
    // cap (`net_exposure` counts contracts, not cents).
    sup.on_fill(Fill { order_id: "o1".into(), ticker: "A".into(), side: Side::Yes, action: Action::Buy, count: 995, price: 60, ts: 0 }).await;
    assert_eq!(sup.inventory().net_exposure("A"), 995);

    sup.on_orderbook_snapshot("B", &[(50, 10)], &[(45, 10)]).await;
    // The new quote's size-per-side (10) added to the existing 995 would
    // push total_exposure to 1,005, past the 1,000 cap; the gate denies it
    // and no resting orders appear for "B".
    assert!(sup.reconciler().get_active(Some("B")).is_empty());
}
