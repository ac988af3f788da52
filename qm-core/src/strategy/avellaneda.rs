//! `AvellanedaStrategy` (spec.md §9 design notes): an Avellaneda-Stoikov
//! reservation-price quoting variant. Grounded directly on the teacher's
//! `strategy::inventory_based::InventoryBasedStrategy`, adapted from
//! continuous decimal prices to the integer-cent binary-outcome domain
//! (mid price already bounded in `[1, 99]`, net inventory measured in
//! contracts rather than base-asset units).

use std::collections::HashMap;

use tracing::debug;

use crate::core::types::{Fill, Quote};

use super::{clamp_price, MarketSnapshot, Strategy};

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct AvellanedaParams {
    /// Target inventory (in contracts); reservation price is computed
    /// relative to the distance from this target.
    pub target_inventory: i64,
    /// Risk aversion (gamma): higher values skew harder toward flattening.
    pub risk_aversion: f64,
    /// Volatility estimate (sigma), in cents.
    pub volatility: f64,
    /// Time horizon (T), in seconds.
    pub time_horizon_secs: f64,
    pub size_per_side: u32,
    pub min_spread_cents: f64,
    pub max_market_spread: u32,
}

impl Default for AvellanedaParams {
    fn default() -> Self {
        Self {
            target_inventory: 0,
            risk_aversion: 0.1,
            volatility: 2.0,
            time_horizon_secs: 300.0,
            size_per_side: 5,
            min_spread_cents: 1.0,
            max_market_spread: 20,
        }
    }
}

pub struct AvellanedaStrategy {
    params: AvellanedaParams,
}

impl AvellanedaStrategy {
    pub fn new(params: AvellanedaParams) -> Self {
        Self { params }
    }

    /// `r = s - q * gamma * sigma^2 * T`
    fn reservation_price(&self, mid: f64, net_exposure: i64) -> f64 {
        let q = (net_exposure - self.params.target_inventory) as f64;
        let adjustment = q * self.params.risk_aversion * self.params.volatility.powi(2) * self.params.time_horizon_secs;
        mid - adjustment
    }

    /// `delta = gamma * sigma^2 * T`, the high-frequency-limit
    /// simplification the teacher itself uses (the full Avellaneda-Stoikov
    /// formula's `(2/gamma) * ln(1 + gamma/k)` liquidity term requires a
    /// fill-intensity estimate this engine doesn't track).
    fn optimal_spread(&self) -> f64 {
        self.params.risk_aversion * self.params.volatility.powi(2) * self.params.time_horizon_secs
    }
}

impl Strategy for AvellanedaStrategy {
    fn compute_quotes(&mut self, snapshot: &MarketSnapshot) -> Vec<Quote> {
        if !snapshot.is_quotable() || snapshot.spread as u32 > self.params.max_market_spread {
            return Vec::new();
        }

        let reservation = self.reservation_price(snapshot.mid, snapshot.net_exposure());
        let half_spread = (self.optimal_spread().max(self.params.min_spread_cents)) / 2.0;

        let bid = clamp_price(reservation - half_spread);
        let ask = clamp_price(reservation + half_spread);

        if ask <= bid || (ask - bid) < self.params.min_spread_cents as u32 {
            debug!(ticker = %snapshot.ticker, "avellaneda quote collapsed below min spread, skipping");
            return Vec::new();
        }

        vec![Quote {
            bid_price: bid,
            bid_size: self.params.size_per_side,
            ask_price: ask,
            ask_size: self.params.size_per_side,
        }]
    }

    fn on_fill(&mut self, _fill: &Fill) {}

    fn update_params(&mut self, params: &HashMap<String, f64>) {
        if let Some(&v) = params.get("risk_aversion") {
            self.params.risk_aversion = v;
        }
        if let Some(&v) = params.get("volatility") {
            self.params.volatility = v;
        }
        if let Some(&v) = params.get("size_per_side") {
            self.params.size_per_side = v as u32;
        }
    }

    fn name(&self) -> &str {
        "avellaneda"
    }
}
