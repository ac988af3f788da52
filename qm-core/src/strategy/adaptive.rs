//! `AdaptiveStrategy`: the baseline quoting strategy (spec.md §4.4.1).
//!
//! Inventory-skews and adverse-selection/imbalance-protects a plain
//! edge-around-fair-value quote, with optional multi-level quoting and
//! expiry widening. Grounded on the teacher's
//! `strategy::inventory_based::InventoryBasedStrategy` for the
//! inventory-skew shape, generalized to the richer rule set spec.md asks
//! for (imbalance protection, expiry widening, multi-level quoting) that
//! the teacher's Avellaneda-Stoikov model doesn't need.

use std::collections::HashMap;

use tracing::debug;

use crate::core::types::{Fill, Quote};

use super::{clamp_price, MarketSnapshot, Strategy};

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct AdaptiveParams {
    pub edge_cents: f64,
    pub min_spread_cents: f64,
    pub size_per_side: u32,
    pub max_market_spread: u32,
    pub skew_factor: f64,
    pub max_inventory_skew: i64,
    pub use_microprice: bool,
    pub multi_level: bool,
    pub adverse_selection_multiplier: f64,
    pub dynamic_skew: bool,
    pub imbalance_skew_multiplier: f64,
    pub extreme_imbalance_threshold: f64,
    pub reduce_risky_side_on_imbalance: bool,
    pub imbalance_size_reduction: f64,
    pub skip_risky_side_threshold: f64,
    pub expiry_widen_start_sec: f64,
    pub expiry_stop_quote_sec: f64,
    pub expiry_spread_multiplier: f64,
}

impl Default for AdaptiveParams {
    fn default() -> Self {
        Self {
            edge_cents: 1.0,
            min_spread_cents: 2.0,
            size_per_side: 5,
            max_market_spread: 20,
            skew_factor: 0.5,
            max_inventory_skew: 30,
            use_microprice: true,
            multi_level: false,
            adverse_selection_multiplier: 2.0,
            dynamic_skew: false,
            imbalance_skew_multiplier: 0.0,
            extreme_imbalance_threshold: 0.6,
            reduce_risky_side_on_imbalance: true,
            imbalance_size_reduction: 0.5,
            skip_risky_side_threshold: 0.9,
            expiry_widen_start_sec: 300.0,
            expiry_stop_quote_sec: 30.0,
            expiry_spread_multiplier: 3.0,
        }
    }
}

pub struct AdaptiveStrategy {
    params: AdaptiveParams,
}

impl AdaptiveStrategy {
    pub fn new(params: AdaptiveParams) -> Self {
        Self { params }
    }

    fn expiry_multiplier(&self, time_to_expiry: Option<f64>) -> Option<f64> {
        let Some(tte) = time_to_expiry else {
            return Some(1.0);
        };
        if tte <= self.params.expiry_stop_quote_sec {
            return None;
        }
        if tte >= self.params.expiry_widen_start_sec {
            return Some(1.0);
        }
        let span = self.params.expiry_widen_start_sec - self.params.expiry_stop_quote_sec;
        let frac = (self.params.expiry_widen_start_sec - tte) / span;
        Some(1.0 + frac * (self.params.expiry_spread_multiplier - 1.0))
    }

    /// Returns `(risky_side_is_ask, |imbalance|)` — `None` if imbalance is
    /// unavailable.
    fn risky_side(snapshot: &MarketSnapshot) -> Option<(bool, f64)> {
        let imbalance = snapshot.imbalance?;
        Some((imbalance > 0.0, imbalance.abs()))
    }

    /// Size multipliers `(bid_mult, ask_mult)` from inventory caps and
    /// imbalance protection. Applied identically to every quoted level.
    fn size_multipliers(&self, snapshot: &MarketSnapshot) -> (f64, f64) {
        let mut bid_mult = 1.0;
        let mut ask_mult = 1.0;

        let net = snapshot.net_exposure();
        if net >= self.params.max_inventory_skew {
            bid_mult = 0.0;
        }
        if net <= -self.params.max_inventory_skew {
            ask_mult = 0.0;
        }

        if self.params.reduce_risky_side_on_imbalance {
            if let Some((risky_is_ask, magnitude)) = Self::risky_side(snapshot) {
                if magnitude >= self.params.skip_risky_side_threshold {
                    if risky_is_ask {
                        ask_mult = 0.0;
                    } else {
                        bid_mult = 0.0;
                    }
                } else if magnitude >= self.params.extreme_imbalance_threshold {
                    if risky_is_ask {
                        ask_mult *= self.params.imbalance_size_reduction;
                    } else {
                        bid_mult *= self.params.imbalance_size_reduction;
                    }
                }
            }
        }

        (bid_mult, ask_mult)
    }

    fn size_for(size: u32, multiplier: f64) -> u32 {
        if multiplier <= 0.0 || size == 0 {
            return 0;
        }
        ((size as f64 * multiplier).floor() as u32).max(1)
    }
}

impl Strategy for AdaptiveStrategy {
    fn compute_quotes(&mut self, snapshot: &MarketSnapshot) -> Vec<Quote> {
        if !snapshot.is_quotable() || snapshot.spread as u32 > self.params.max_market_spread {
            return Vec::new();
        }

        let Some(expiry_mult) = self.expiry_multiplier(snapshot.time_to_expiry) else {
            return Vec::new();
        };

        let _fair_value = if self.params.use_microprice {
            snapshot.microprice.unwrap_or(snapshot.mid)
        } else {
            snapshot.mid
        };

        let adverse = snapshot.adverse_selection.unwrap_or(false);
        let mut edge = self.params.edge_cents;
        let mut min_spread = self.params.min_spread_cents;
        if adverse {
            edge = 0.0;
            min_spread *= self.params.adverse_selection_multiplier;
        }

        let mut skew = snapshot.net_exposure() as f64 * self.params.skew_factor;
        if self.params.dynamic_skew {
            if let Some(imbalance) = snapshot.imbalance {
                skew += imbalance * self.params.imbalance_skew_multiplier;
            }
        }

        let required_spread = min_spread * expiry_mult;

        let mut bid = clamp_price(snapshot.best_bid as f64 + edge - skew);
        let mut ask = clamp_price(snapshot.best_ask as f64 - edge - skew);

        if (ask as f64 - bid as f64) < required_spread {
            bid = clamp_price(snapshot.best_bid as f64 - skew);
            ask = clamp_price(snapshot.best_ask as f64 - skew);
            if (snapshot.best_ask as f64 - snapshot.best_bid as f64) < required_spread {
                debug!(ticker = %snapshot.ticker, "market spread below adjusted minimum, skipping");
                return Vec::new();
            }
        }

        let (bid_mult, ask_mult) = self.size_multipliers(snapshot);
        // Tight inner level: smaller size, since it's more likely to get
        // picked off first (spec.md §4.4.1 step 7).
        let inner_size = (self.params.size_per_side / 2).max(1);
        let inner = Quote {
            bid_price: bid,
            bid_size: Self::size_for(inner_size, bid_mult),
            ask_price: ask,
            ask_size: Self::size_for(inner_size, ask_mult),
        };

        if !self.params.multi_level {
            return vec![inner];
        }

        let outer_bid = clamp_price(snapshot.best_bid as f64 - skew);
        let outer_ask = clamp_price(snapshot.best_ask as f64 - skew);
        // Wider outer level at the market: full size.
        let outer = Quote {
            bid_price: outer_bid,
            bid_size: Self::size_for(self.params.size_per_side, bid_mult),
            ask_price: outer_ask,
            ask_size: Self::size_for(self.params.size_per_side, ask_mult),
        };

        vec![inner, outer]
    }

    fn on_fill(&mut self, _fill: &Fill) {}

    fn update_params(&mut self, params: &HashMap<String, f64>) {
        if let Some(&v) = params.get("edge_cents") {
            self.params.edge_cents = v;
        }
        if let Some(&v) = params.get("min_spread_cents") {
            self.params.min_spread_cents = v;
        }
        if let Some(&v) = params.get("skew_factor") {
            self.params.skew_factor = v;
        }
        if let Some(&v) = params.get("size_per_side") {
            self.params.size_per_side = v as u32;
        }
    }

    fn name(&self) -> &str {
        "adaptive"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Position;

    fn base_snapshot() -> MarketSnapshot {
        MarketSnapshot {
            ticker: "T".into(),
            best_bid: 50,
            best_ask: 55,
            mid: 52.5,
            spread: 5,
            position: None,
            microprice: None,
            bid_size: None,
            ask_size: None,
            imbalance: None,
            adverse_selection: None,
            is_volatile: None,
            time_to_expiry: None,
        }
    }

    fn params() -> AdaptiveParams {
        AdaptiveParams {
            edge_cents: 1.0,
            min_spread_cents: 2.0,
            size_per_side: 5,
            max_market_spread: 20,
            skew_factor: 0.5,
            max_inventory_skew: 30,
            use_microprice: false,
            multi_level: false,
            adverse_selection_multiplier: 2.0,
            dynamic_skew: false,
            imbalance_skew_multiplier: 0.0,
            extreme_imbalance_threshold: 0.6,
            reduce_risky_side_on_imbalance: true,
            imbalance_size_reduction: 0.5,
            skip_risky_side_threshold: 0.9,
            expiry_widen_start_sec: 300.0,
            expiry_stop_quote_sec: 30.0,
            expiry_spread_multiplier: 3.0,
        }
    }

    #[test]
    fn scenario_2_flat_position() {
        let mut strat = AdaptiveStrategy::new(params());
        let quotes = strat.compute_quotes(&base_snapshot());
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].bid_price, 51);
        assert_eq!(quotes[0].ask_price, 54);
        assert_eq!(quotes[0].bid_size, 5);
        assert_eq!(quotes[0].ask_size, 5);
    }

    #[test]
    fn scenario_2_skewed_by_inventory() {
        let mut strat = AdaptiveStrategy::new(params());
        let mut snap = base_snapshot();
        snap.position = Some(Position {
            yes_contracts: 10,
            no_contracts: 0,
            yes_cost_basis: 0,
            no_cost_basis: 0,
        });
        let quotes = strat.compute_quotes(&snap);
        assert_eq!(quotes[0].bid_price, 46);
        assert_eq!(quotes[0].ask_price, 49);
    }

    #[test]
    fn stops_quoting_past_expiry_cutoff() {
        let mut strat = AdaptiveStrategy::new(params());
        let mut snap = base_snapshot();
        snap.time_to_expiry = Some(10.0);
        assert!(strat.compute_quotes(&snap).is_empty());
    }

    #[test]
    fn inventory_cap_zeros_bid_side() {
        let mut strat = AdaptiveStrategy::new(params());
        let mut snap = base_snapshot();
        snap.position = Some(Position {
            yes_contracts: 40,
            no_contracts: 0,
            yes_cost_basis: 0,
            no_cost_basis: 0,
        });
        let quotes = strat.compute_quotes(&snap);
        assert_eq!(quotes[0].bid_size, 0);
        assert!(quotes[0].ask_size > 0);
    }

    #[test]
    fn extreme_imbalance_zeros_risky_side() {
        let mut strat = AdaptiveStrategy::new(params());
        let mut snap = base_snapshot();
        snap.imbalance = Some(0.95); // positive => ask is the risky side
        let quotes = strat.compute_quotes(&snap);
        assert_eq!(quotes[0].ask_size, 0);
        assert!(quotes[0].bid_size > 0);
    }

    #[test]
    fn multi_level_applies_zero_uniformly() {
        let mut p = params();
        p.multi_level = true;
        let mut strat = AdaptiveStrategy::new(p);
        let mut snap = base_snapshot();
        snap.imbalance = Some(0.95);
        let quotes = strat.compute_quotes(&snap);
        assert_eq!(quotes.len(), 2);
        for q in &quotes {
            assert_eq!(q.ask_size, 0);
        }
    }
}
