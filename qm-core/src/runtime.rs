//! The single cooperative event loop (spec.md §5): one `tokio::select!`
//! driving the feed, a periodic health-check timer, and (optionally) a
//! scanner refresh, all funneled into one `QuotingSupervisor`. Grounded
//! on the teacher's `engine::generic::GenericEngine::run` main loop
//! shape, replacing its channel-fed command inbox (no control-plane
//! surface is specified here) with direct feed/timer branches.

use std::str::FromStr;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::core::errors::FeedError;
use crate::core::types::{Action, Fill, Side};
use crate::exchange::{Feed, FeedEvent};
use crate::execution::ExchangeOrders;
use crate::strategy::Strategy;
use crate::supervisor::{ConnectionSupervisor, QuotingSupervisor};

/// Runs until `feed.recv()` returns a fatal error that survives
/// reconnect attempts, or the process is signaled to stop externally
/// (not modeled here; embedders select! this future against their own
/// shutdown signal).
pub async fn run<S, E, F>(
    supervisor: &mut QuotingSupervisor<S, E>,
    connection: &mut ConnectionSupervisor,
    feed: &mut F,
) where
    S: Strategy,
    E: ExchangeOrders,
    F: Feed,
{
    let mut health_check = tokio::time::interval(Duration::from_millis(
        connection.health_check_interval_ms().max(0) as u64,
    ));
    health_check.tick().await; // first tick fires immediately; discard it

    loop {
        tokio::select! {
            event = feed.recv() => {
                match event {
                    Ok(event) => {
                        connection.record_data();
                        handle_event(supervisor, event).await;
                    }
                    Err(err) => {
                        warn!(%err, "feed recv error, treating as disconnect");
                        connection.on_disconnect(supervisor).await;
                        if !feed.is_connected() {
                            if let Err(err) = feed.force_reconnect().await {
                                error!(%err, "reconnect failed, backing off");
                            } else {
                                connection.on_connect(async {}).await;
                            }
                        }
                    }
                }
            }
            _ = health_check.tick() => {
                connection.check(supervisor, feed).await;
            }
        }
    }
}

async fn handle_event<S: Strategy, E: ExchangeOrders>(supervisor: &mut QuotingSupervisor<S, E>, event: FeedEvent) {
    match event {
        FeedEvent::OrderbookSnapshot { market_ticker, yes, no } => {
            supervisor.on_orderbook_snapshot(&market_ticker, &yes, &no).await;
        }
        FeedEvent::OrderbookDelta { market_ticker, side, price, delta } => {
            let Ok(side) = Side::from_str(&side) else {
                let err = FeedError::Malformed(format!("orderbook_delta side {side:?}"));
                warn!(%err, "discarding orderbook_delta");
                return;
            };
            supervisor.on_orderbook_delta(&market_ticker, side, price, delta, None).await;
        }
        FeedEvent::Ticker { market_ticker, yes_bid, yes_ask, .. } => {
            supervisor.on_ticker_event(&market_ticker, yes_bid, yes_ask).await;
        }
        FeedEvent::Fill { order_id, market_ticker, side, action, count, yes_price, no_price, .. } => {
            let (Ok(side), Ok(action)) = (Side::from_str(&side), Action::from_str(&action)) else {
                let err = FeedError::Malformed(format!("fill with side {side:?} action {action:?}"));
                warn!(%err, "discarding fill event");
                return;
            };
            let price = match side {
                Side::Yes => yes_price,
                Side::No => no_price,
            };
            let fill = Fill {
                order_id,
                ticker: market_ticker,
                side,
                action,
                count,
                price,
                ts: crate::core::types::now_ms(),
            };
            supervisor.on_fill(fill).await;
        }
        FeedEvent::Subscribed => {
            info!("feed subscription acknowledged");
        }
        FeedEvent::Error { code, message } => {
            warn!(code, %message, "feed reported an error");
        }
        FeedEvent::Trade => {}
    }
}

/// Graceful shutdown (spec.md §5: "stop the periodic scanner, issue
/// `cancel_all`, disconnect the feed, flushes logs, and returns").
/// Log-flushing is the `WorkerGuard`'s responsibility at drop time in
/// the embedding binary; this only handles the trading-state half.
pub async fn shutdown<S: Strategy, E: ExchangeOrders>(supervisor: &mut QuotingSupervisor<S, E>) {
    info!("shutting down: cancelling all resting orders");
    let cancelled = supervisor.cancel_all(None).await;
    info!(cancelled, "shutdown cancel_all complete");
}
