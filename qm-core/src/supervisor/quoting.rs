//! `QuotingSupervisor` (spec.md §4.9): the central orchestrator tying the
//! orderbook replica, inventory, fair-value signals, strategy, risk gate,
//! and order reconciler together behind one debounced `update_quotes`
//! pipeline. Grounded on the teacher's `engine::generic::GenericEngine`
//! for the "one object owns every per-ticker subsystem and drives a
//! single event-handling entrypoint" shape, replacing its strategy-wrapper
//! indirection with a direct `Strategy` trait object since this engine
//! has no live strategy hot-swap requirement.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use tracing::warn;

use crate::config::{MarketMetadataCache, SupervisorConfig};
use crate::core::clock::Clock;
use crate::core::errors::RiskDenyReason;
use crate::core::types::{Bbo, Fill, OrderStatus, Price, Quote, Side, Ticker, TimestampMs};
use crate::execution::{ExchangeOrders, OrderReconciler};
use crate::fairvalue::FairValueModel;
use crate::inventory::InventoryTracker;
use crate::observability::FillsLog;
use crate::orderbook::OrderbookReplica;
use crate::risk::{BreakerState, CircuitBreaker, CircuitBreakerParams, DrawdownManager, DrawdownParams, RiskGate};
use crate::strategy::{MarketSnapshot, Strategy};
use crate::core::types::RiskLimits;

const LATENCY_WINDOW: usize = 50;
const DENY_LOG_INTERVAL_MS: i64 = 30_000;

#[derive(Default)]
struct TickerState {
    last_quote_update_ts: Option<TimestampMs>,
    last_observed_bbo: Option<Bbo>,
    last_sent_quote: Option<Quote>,
    latencies: VecDeque<i64>,
}

pub struct QuotingSupervisor<S: Strategy, E: ExchangeOrders> {
    strategy: S,
    reconciler: OrderReconciler<E>,
    risk_gate: RiskGate,
    drawdown: DrawdownManager,
    breaker: CircuitBreaker,
    replica: OrderbookReplica,
    inventory: InventoryTracker,
    fair_value: FairValueModel,
    metadata: MarketMetadataCache,
    clock: Arc<dyn Clock>,
    config: SupervisorConfig,
    fills_log: Option<FillsLog>,

    ticker_states: HashMap<Ticker, TickerState>,
    fallback_bbo: HashMap<Ticker, Bbo>,
    last_global_update_ts: Option<TimestampMs>,
    last_deny_log: HashMap<(Ticker, RiskDenyReason), TimestampMs>,
    total_realized_pnl: i64,
    paused: bool,
    operator_paused: bool,
}

impl<S: Strategy, E: ExchangeOrders> QuotingSupervisor<S, E> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        strategy: S,
        exchange: E,
        clock: Arc<dyn Clock>,
        risk_limits: RiskLimits,
        drawdown_params: DrawdownParams,
        breaker_params: CircuitBreakerParams,
        config: SupervisorConfig,
        fills_log: Option<FillsLog>,
    ) -> Self {
        let fair_value = FairValueModel::new(
            config.adverse_window_fills,
            config.adverse_window_ms,
            config.volatility_window_ticks,
        );
        Self {
            reconciler: OrderReconciler::new(exchange, clock.clone()),
            replica: OrderbookReplica::new(clock.clone()),
            strategy,
            risk_gate: RiskGate::new(risk_limits),
            drawdown: DrawdownManager::new(drawdown_params),
            breaker: CircuitBreaker::new(breaker_params),
            inventory: InventoryTracker::new(),
            fair_value,
            metadata: MarketMetadataCache::default(),
            clock,
            config,
            fills_log,
            ticker_states: HashMap::new(),
            fallback_bbo: HashMap::new(),
            last_global_update_ts: None,
            last_deny_log: HashMap::new(),
            total_realized_pnl: 0,
            paused: false,
            operator_paused: false,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Operator-initiated pause: stop sending new quotes, leave resting
    /// orders alone (callers wanting a hard stop also call `cancel_all`).
    pub fn pause(&mut self) {
        self.operator_paused = true;
        self.paused = true;
    }

    /// Clears an operator/loss-limit pause. Does not touch the circuit
    /// breaker's own cooldown, which only clears on elapse.
    pub fn resume(&mut self) {
        self.operator_paused = false;
        self.paused = false;
        self.risk_gate.resume();
    }

    pub fn reconciler(&self) -> &OrderReconciler<E> {
        &self.reconciler
    }

    pub fn reconciler_mut(&mut self) -> &mut OrderReconciler<E> {
        &mut self.reconciler
    }

    pub fn inventory(&self) -> &InventoryTracker {
        &self.inventory
    }

    pub fn inventory_mut(&mut self) -> &mut InventoryTracker {
        &mut self.inventory
    }

    pub fn metadata_mut(&mut self) -> &mut MarketMetadataCache {
        &mut self.metadata
    }

    pub async fn cancel_all(&mut self, ticker: Option<&str>) -> usize {
        self.reconciler.cancel_all(ticker).await
    }

    /// Re-derive `paused` from the halt sources that can clear themselves
    /// over time (the circuit breaker's cooldown); loss-limit halts and
    /// operator pauses only clear via an explicit `resume()`.
    fn recompute_paused(&mut self, now: TimestampMs) {
        let breaker_halted = matches!(self.breaker.refresh(now), BreakerState::Halted(_));
        let drawdown_halted = self.drawdown.position_multiplier(self.total_realized_pnl) <= 0.0;
        let risk_halted = self.risk_gate.is_halted();
        if breaker_halted || drawdown_halted || risk_halted {
            self.paused = true;
        } else if !self.operator_paused {
            self.paused = false;
        }
    }

    pub async fn on_orderbook_snapshot(&mut self, ticker: &str, yes_bids: &[(Price, u32)], no_bids: &[(Price, u32)]) {
        self.replica.apply_snapshot(ticker, yes_bids, no_bids);
        self.maybe_update(ticker).await;
    }

    pub async fn on_orderbook_delta(&mut self, ticker: &str, side: Side, price: Price, delta: u32, sequence: Option<u64>) {
        self.replica.apply_delta(ticker, side, price, delta, sequence);
        self.maybe_update(ticker).await;
    }

    /// Fallback path for when the full book isn't available: use the
    /// ticker summary's yes_bid/yes_ask directly, same debounce/update
    /// path as the orderbook path.
    pub async fn on_ticker_event(&mut self, ticker: &str, yes_bid: Price, yes_ask: Price) {
        self.fallback_bbo.insert(
            ticker.to_string(),
            Bbo {
                bid_price: yes_bid,
                bid_size: 0,
                ask_price: yes_ask,
                ask_size: 0,
            },
        );
        self.maybe_update(ticker).await;
    }

    pub async fn on_fill(&mut self, fill: Fill) {
        let now = self.clock.now_ms();
        self.reconciler.on_fill(&fill.order_id, fill.count);
        self.fair_value.adverse.record_fill(&fill.ticker, fill.side, fill.action, fill.price as f64, now);

        let delta = self.inventory.on_fill(&fill);
        self.total_realized_pnl += delta;
        self.risk_gate.on_fill(delta);
        self.drawdown.record_pnl(self.total_realized_pnl);
        self.breaker.on_fill(delta, now);

        if let Some(log) = &mut self.fills_log {
            log.record(&fill, delta);
        }

        // Position changed: the cached quote is no longer necessarily
        // still what we'd send, force a fresh compute next tick.
        if let Some(state) = self.ticker_states.get_mut(&fill.ticker) {
            state.last_sent_quote = None;
        }

        self.recompute_paused(now);
    }

    fn bbo_for(&self, ticker: &str) -> Option<Bbo> {
        self.replica.bbo(ticker).or_else(|| self.fallback_bbo.get(ticker).copied())
    }

    fn should_update(&mut self, ticker: &str, bbo: Bbo, now: TimestampMs) -> bool {
        if let Some(last) = self.last_global_update_ts {
            if now - last < self.config.min_global_interval_ms {
                return false;
            }
        }

        let state = self.ticker_states.entry(ticker.to_string()).or_default();
        let allow = match state.last_quote_update_ts {
            None => true,
            Some(last_ts) => {
                let elapsed = now - last_ts;
                let price_moved = state.last_observed_bbo.map_or(true, |last_bbo| {
                    (bbo.bid_price as i64 - last_bbo.bid_price as i64).unsigned_abs() as u32 >= self.config.min_price_change
                        || (bbo.ask_price as i64 - last_bbo.ask_price as i64).unsigned_abs() as u32 >= self.config.min_price_change
                });
                elapsed >= self.config.min_quote_interval_ms || price_moved
            }
        };

        if allow {
            self.last_global_update_ts = Some(now);
        }
        allow
    }

    async fn maybe_update(&mut self, ticker: &str) {
        let now = self.clock.now_ms();
        self.recompute_paused(now);
        if self.paused {
            return;
        }
        let Some(bbo) = self.bbo_for(ticker) else { return };
        if !self.should_update(ticker, bbo, now) {
            return;
        }

        let started = Instant::now();
        self.update_quotes(ticker, now).await;
        let latency_ms = started.elapsed().as_millis() as i64;

        let state = self.ticker_states.entry(ticker.to_string()).or_default();
        state.last_quote_update_ts = Some(now);
        state.last_observed_bbo = Some(bbo);
        state.latencies.push_back(latency_ms);
        while state.latencies.len() > LATENCY_WINDOW {
            state.latencies.pop_front();
        }
    }

    fn build_snapshot(&mut self, ticker: &str, now: TimestampMs) -> Option<MarketSnapshot> {
        let bbo = self.bbo_for(ticker)?;
        let position = self.inventory.position(ticker);
        let mid = bbo.mid_f64();

        self.fair_value.volatility.record_mid(ticker, mid);
        let is_volatile = self.fair_value.volatility.is_volatile(ticker, self.config.volatility_threshold_cents);
        let adverse = self.fair_value.adverse.is_adverse(ticker, mid, now, self.config.adverse_threshold_cents);

        Some(MarketSnapshot {
            ticker: ticker.to_string(),
            best_bid: bbo.bid_price,
            best_ask: bbo.ask_price,
            mid,
            spread: bbo.spread(),
            position: Some(position),
            microprice: self.replica.microprice(ticker),
            bid_size: Some(bbo.bid_size),
            ask_size: Some(bbo.ask_size),
            imbalance: self.replica.imbalance(ticker),
            adverse_selection: Some(adverse),
            is_volatile: Some(is_volatile),
            time_to_expiry: self.metadata.time_to_expiry_secs(ticker, now),
        })
    }

    /// Step 1-5 of spec.md §4.9's `update_quotes`.
    async fn update_quotes(&mut self, ticker: &str, now: TimestampMs) {
        if self.inventory.total_exposure() >= self.risk_gate.limits().max_total_exposure {
            return;
        }

        let Some(snapshot) = self.build_snapshot(ticker, now) else { return };
        let quotes = self.strategy.compute_quotes(&snapshot);
        let Some(quote) = quotes.into_iter().next() else { return };

        let multiplier = self.drawdown.position_multiplier(self.total_realized_pnl);
        if multiplier <= 0.0 {
            return;
        }

        let limits = *self.risk_gate.limits();
        let scaled = Quote {
            bid_price: quote.bid_price,
            bid_size: self.drawdown.scale_size(quote.bid_size, self.total_realized_pnl).min(limits.max_order_size),
            ask_price: quote.ask_price,
            ask_size: self.drawdown.scale_size(quote.ask_size, self.total_realized_pnl).min(limits.max_order_size),
        };

        self.send_quote(ticker, scaled, now).await;
    }

    async fn send_quote(&mut self, ticker: &str, quote: Quote, now: TimestampMs) {
        let already_sent = self
            .ticker_states
            .get(ticker)
            .and_then(|s| s.last_sent_quote)
            .map_or(false, |last| last == quote);
        if already_sent {
            return;
        }

        let net_exposure = self.inventory.net_exposure(ticker);
        let total_exposure = self.inventory.total_exposure();
        if let Err(reason) = self.risk_gate.check(&quote, net_exposure, total_exposure) {
            self.log_denial(ticker, reason, now);
            return;
        }

        let guarded = match self.bbo_for(ticker) {
            Some(bbo) => guard_against_crossing(quote, bbo),
            None => quote,
        };
        if guarded.is_empty() {
            return;
        }

        let (_, placed_ids) = self.reconciler.update_quote(ticker, &guarded).await;
        // Only cache once every newly placed order actually landed; a
        // rejected order is left Failed by the reconciler, and leaving the
        // cache stale here lets the next tick recompute and re-attempt it
        // (spec.md §5's retry policy, §8's last_sent_quote invariant).
        let all_placed = placed_ids.iter().all(|id| self.reconciler.get(id).is_some_and(|o| o.status != OrderStatus::Failed));
        if all_placed {
            self.ticker_states.entry(ticker.to_string()).or_default().last_sent_quote = Some(guarded);
        }
    }

    /// Periodic enforcement hook, called from `ConnectionSupervisor::check`
    /// on the health-check tick (spec.md §4.8: `get_stale_orders` and
    /// `get_off_price_orders` are "used by supervisor for enforcement").
    /// Cancels resting orders that have gone stale or drifted too far from
    /// fair value, invalidates the affected tickers' `last_sent_quote`
    /// cache so the next tick re-quotes them, then evicts terminal orders
    /// past the retention window (spec.md §3's default-24h eviction).
    pub async fn enforce_order_hygiene(&mut self, now: TimestampMs) {
        let mut to_cancel: Vec<String> = self
            .reconciler
            .get_stale_orders(now, self.config.stale_order_max_age_ms)
            .iter()
            .map(|o| o.client_order_id.clone())
            .collect();

        let tickers: std::collections::HashSet<Ticker> =
            self.reconciler.get_active(None).iter().map(|o| o.ticker.clone()).collect();
        for ticker in &tickers {
            let Some(fair_value) = self.replica.microprice(ticker).or_else(|| self.bbo_for(ticker).map(|b| b.mid_f64())) else {
                continue;
            };
            to_cancel.extend(
                self.reconciler
                    .get_off_price_orders(ticker, fair_value, self.config.off_price_max_distance_cents)
                    .iter()
                    .map(|o| o.client_order_id.clone()),
            );
        }
        to_cancel.sort();
        to_cancel.dedup();

        if !to_cancel.is_empty() {
            let affected: Vec<Ticker> = to_cancel.iter().filter_map(|id| self.reconciler.get(id).map(|o| o.ticker.clone())).collect();
            let cancelled = self.reconciler.batch_cancel(&to_cancel).await;
            warn!(cancelled, "health check cancelled stale/off-price resting orders");
            for ticker in affected {
                if let Some(state) = self.ticker_states.get_mut(&ticker) {
                    state.last_sent_quote = None;
                }
            }
        }

        self.reconciler.cleanup(now, self.config.order_cleanup_max_age_ms);
    }

    fn log_denial(&mut self, ticker: &str, reason: RiskDenyReason, now: TimestampMs) {
        let key = (ticker.to_string(), reason);
        let should_log = self.last_deny_log.get(&key).map_or(true, |&last| now - last >= DENY_LOG_INTERVAL_MS);
        if should_log {
            warn!(ticker, %reason, "quote denied by risk gate");
            self.last_deny_log.insert(key, now);
        }
    }
}

/// Re-clamp a quote against the freshest BBO so neither side crosses into
/// taker territory (spec.md §4.9 step 5's "maker-protection guard").
fn guard_against_crossing(mut quote: Quote, bbo: Bbo) -> Quote {
    if quote.bid_size > 0 && quote.bid_price >= bbo.ask_price {
        quote.bid_size = 0;
    }
    if quote.ask_size > 0 && quote.ask_price <= bbo.bid_price {
        quote.ask_size = 0;
    }
    quote
}
