//! `ConnectionSupervisor` (spec.md §4.10): periodic health checks over
//! the streaming feed, deciding when staleness only deserves a log and
//! when it deserves a forced reconnect plus a defensive cancel-all.
//! Grounded on the teacher's `resilience::reconnect::ResilientMarketFeed`
//! for the `on_disconnect`/`on_connect` idempotent-episode bookkeeping,
//! adapted from its shared-memory staleness poll to the `Feed` trait's
//! explicit `force_reconnect`.

use tracing::{info, warn};

use crate::config::SupervisorConfig;
use crate::core::clock::Clock;
use crate::core::types::TimestampMs;
use crate::exchange::Feed;
use crate::execution::ExchangeOrders;
use crate::supervisor::quoting::QuotingSupervisor;
use crate::strategy::Strategy;
use std::sync::Arc;

pub struct ConnectionSupervisor {
    clock: Arc<dyn Clock>,
    config: SupervisorConfig,
    disconnected_since: Option<TimestampMs>,
    last_data_ts: TimestampMs,
    has_connected_once: bool,
}

impl ConnectionSupervisor {
    pub fn new(clock: Arc<dyn Clock>, config: SupervisorConfig) -> Self {
        let now = clock.now_ms();
        Self {
            clock,
            config,
            disconnected_since: None,
            last_data_ts: now,
            has_connected_once: false,
        }
    }

    /// Call on every feed event (snapshot, delta, ticker, fill) to keep
    /// the staleness clock current.
    pub fn record_data(&mut self) {
        self.last_data_ts = self.clock.now_ms();
    }

    pub fn health_check_interval_ms(&self) -> i64 {
        self.config.health_check_interval_ms
    }

    /// Call once on disconnect; idempotent within a single disconnect
    /// episode — repeated calls before the next `on_connect` are no-ops
    /// beyond the first.
    pub async fn on_disconnect<S: Strategy, E: ExchangeOrders>(&mut self, supervisor: &mut QuotingSupervisor<S, E>) {
        if self.disconnected_since.is_some() {
            return;
        }
        let now = self.clock.now_ms();
        warn!("feed disconnected, cancelling all resting orders");
        self.disconnected_since = Some(now);
        supervisor.cancel_all(None).await;
    }

    /// Call once the feed is (re)connected and resubscribed. `resync` is
    /// the caller-supplied position resync, run only on a genuine
    /// reconnect (not the very first connect).
    pub async fn on_connect<F>(&mut self, resync: F)
    where
        F: std::future::Future<Output = ()>,
    {
        let was_reconnect = self.has_connected_once;
        self.disconnected_since = None;
        self.last_data_ts = self.clock.now_ms();
        self.has_connected_once = true;
        if was_reconnect {
            info!("feed reconnected, re-syncing positions");
            resync.await;
        }
    }

    /// Tick on `health_check_interval_ms`. Returns `true` if a forced
    /// reconnect was issued.
    pub async fn check<S: Strategy, E: ExchangeOrders, Fd: Feed>(
        &mut self,
        supervisor: &mut QuotingSupervisor<S, E>,
        feed: &mut Fd,
    ) -> bool {
        let now = self.clock.now_ms();
        supervisor.enforce_order_hygiene(now).await;

        if !feed.is_connected() {
            let downtime = self.disconnected_since.map(|since| now - since).unwrap_or(0);
            if downtime > self.config.force_reconnect_threshold_ms {
                warn!(downtime, "disconnected past force-reconnect threshold, reconnecting");
                return self.force_reconnect(feed).await;
            }
            return false;
        }

        let stale_for = now - self.last_data_ts;
        if stale_for > self.config.force_reconnect_threshold_ms {
            warn!(stale_for, "feed data stale past force-reconnect threshold, cancelling and reconnecting");
            supervisor.cancel_all(None).await;
            return self.force_reconnect(feed).await;
        }

        if stale_for > self.config.stale_data_threshold_ms {
            warn!(stale_for, "feed data stale");
        }

        false
    }

    async fn force_reconnect<Fd: Feed>(&mut self, feed: &mut Fd) -> bool {
        match feed.force_reconnect().await {
            Ok(()) => {
                self.disconnected_since = None;
                self.last_data_ts = self.clock.now_ms();
                true
            }
            Err(err) => {
                warn!(%err, "forced reconnect failed");
                if self.disconnected_since.is_none() {
                    self.disconnected_since = Some(self.clock.now_ms());
                }
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::execution::{CancelResult, CreateResult, NewOrderInput};
    use crate::risk::{CircuitBreakerParams, DrawdownParams};
    use crate::core::types::RiskLimits;
    use crate::strategy::symmetric::{SymmetricParams, SymmetricStrategy};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FakeExchange;
    #[async_trait]
    impl ExchangeOrders for FakeExchange {
        async fn create_order(&self, _input: &NewOrderInput, client_order_id: &str) -> CreateResult {
            CreateResult { client_order_id: client_order_id.to_string(), exchange_id: Some("ex-1".into()), error: None }
        }
        async fn cancel_order(&self, _exchange_id: &str, client_order_id: &str) -> CancelResult {
            CancelResult { client_order_id: client_order_id.to_string(), error: None }
        }
    }

    struct FakeFeed {
        connected: bool,
        reconnect_calls: std::sync::Arc<AtomicBool>,
    }

    #[async_trait]
    impl Feed for FakeFeed {
        async fn connect(&mut self) -> anyhow::Result<()> {
            self.connected = true;
            Ok(())
        }
        async fn subscribe(&mut self, _channels: &[String], _market_tickers: Option<Vec<String>>) -> anyhow::Result<()> {
            Ok(())
        }
        async fn recv(&mut self) -> anyhow::Result<crate::exchange::FeedEvent> {
            Err(anyhow::anyhow!("unused in test"))
        }
        async fn force_reconnect(&mut self) -> anyhow::Result<()> {
            self.reconnect_calls.store(true, Ordering::SeqCst);
            self.connected = true;
            Ok(())
        }
        fn is_connected(&self) -> bool {
            self.connected
        }
    }

    fn supervisor(clock: Arc<dyn Clock>) -> QuotingSupervisor<SymmetricStrategy, FakeExchange> {
        QuotingSupervisor::new(
            SymmetricStrategy::new(SymmetricParams { edge_cents: 1, min_spread_cents: 2, size_per_side: 5, max_market_spread: 20 }),
            FakeExchange,
            clock,
            RiskLimits { max_position_per_market: 1_000, max_total_exposure: 1_000, max_daily_loss: 100_000, max_order_size: 50, min_spread: 1 },
            DrawdownParams { scale_down_start: 10_000, half_size_drawdown: 20_000, halt_drawdown: 30_000 },
            CircuitBreakerParams { max_consecutive_losses: 5, max_losses_in_window: 5, window_ms: 60_000, cooldown_ms: 60_000 },
            SupervisorConfig::default(),
            None,
        )
    }

    #[tokio::test]
    async fn scenario_7_stale_past_threshold_forces_reconnect() {
        let clock = Arc::new(ManualClock::new(0));
        let mut sup = supervisor(clock.clone());
        let mut conn = ConnectionSupervisor::new(clock.clone(), SupervisorConfig::default());
        let mut feed = FakeFeed { connected: true, reconnect_calls: std::sync::Arc::new(AtomicBool::new(false)) };

        clock.advance(SupervisorConfig::default().force_reconnect_threshold_ms + 1);
        let reconnected = conn.check(&mut sup, &mut feed).await;
        assert!(reconnected);
        assert!(feed.reconnect_calls.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn stale_below_force_threshold_only_warns() {
        let clock = Arc::new(ManualClock::new(0));
        let mut sup = supervisor(clock.clone());
        let mut conn = ConnectionSupervisor::new(clock.clone(), SupervisorConfig::default());
        let mut feed = FakeFeed { connected: true, reconnect_calls: std::sync::Arc::new(AtomicBool::new(false)) };

        clock.advance(SupervisorConfig::default().stale_data_threshold_ms + 1);
        let reconnected = conn.check(&mut sup, &mut feed).await;
        assert!(!reconnected);
        assert!(!feed.reconnect_calls.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn disconnect_is_idempotent_within_one_episode() {
        let clock = Arc::new(ManualClock::new(0));
        let mut sup = supervisor(clock.clone());
        let mut conn = ConnectionSupervisor::new(clock.clone(), SupervisorConfig::default());
        conn.on_disconnect(&mut sup).await;
        let since_first = conn.disconnected_since;
        clock.advance(1_000);
        conn.on_disconnect(&mut sup).await;
        assert_eq!(conn.disconnected_since, since_first);
    }
}
