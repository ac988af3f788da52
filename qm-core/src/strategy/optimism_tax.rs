//! `OptimismTaxStrategy` (spec.md §4.4.2): exploits the taker demand that
//! concentrates on longshot and near-certainty binary-outcome contracts by
//! quoting asymmetrically in those zones, and falls back to
//! [`super::adaptive::AdaptiveStrategy`]-style quoting with a volatility
//! gate in the mid-range. Grounded on the teacher's
//! `strategy::inventory_based::InventoryBasedStrategy` for the mid-range
//! skew/edge shape; the longshot/near-certainty zones have no teacher
//! analogue (Lighter-DEX has no binary-outcome pricing) and are built
//! directly from spec.md's worked description.

use std::collections::HashMap;

use tracing::debug;

use crate::core::types::{Fill, Quote};

use super::{clamp_price, MarketSnapshot, Strategy};

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct OptimismTaxParams {
    pub long_shot_threshold: f64,
    pub nearly_certain_threshold: f64,
    pub optimism_edge: f64,
    pub optimism_size_multiplier: f64,
    pub max_longshot_exposure: i64,
    pub size_per_side: u32,
    pub min_spread_cents: f64,
    pub skew_factor: f64,
    pub max_market_spread: u32,
}

impl Default for OptimismTaxParams {
    fn default() -> Self {
        Self {
            long_shot_threshold: 15.0,
            nearly_certain_threshold: 85.0,
            optimism_edge: 1.0,
            optimism_size_multiplier: 1.5,
            max_longshot_exposure: 20,
            size_per_side: 5,
            min_spread_cents: 2.0,
            skew_factor: 0.5,
            max_market_spread: 20,
        }
    }
}

pub struct OptimismTaxStrategy {
    params: OptimismTaxParams,
}

impl OptimismTaxStrategy {
    pub fn new(params: OptimismTaxParams) -> Self {
        Self { params }
    }

    fn longshot_quote(&self, snapshot: &MarketSnapshot) -> Option<Quote> {
        let ask_size = ((self.params.size_per_side as f64 * self.params.optimism_size_multiplier).round()) as u32;
        let bid_size = self.params.size_per_side / 2;

        let bid_price = clamp_price(snapshot.best_bid as f64 - 2.0 * self.params.optimism_edge);
        let ask_price = clamp_price(snapshot.best_ask as f64 - self.params.optimism_edge);

        let net = snapshot.net_exposure();
        let (bid_size, ask_size) = if net.abs() >= self.params.max_longshot_exposure {
            // Only the flattening side is quoted: long position flattens by
            // selling (ask), short position flattens by buying (bid).
            if net > 0 {
                (0, ask_size)
            } else {
                (bid_size, 0)
            }
        } else {
            (bid_size, ask_size)
        };

        Some(Quote {
            bid_price,
            bid_size,
            ask_price,
            ask_size,
        })
    }

    fn near_certainty_quote(&self, snapshot: &MarketSnapshot) -> Option<Quote> {
        let bid_size = ((self.params.size_per_side as f64 * self.params.optimism_size_multiplier).round()) as u32;
        let ask_size = self.params.size_per_side / 2;

        let bid_price = clamp_price(snapshot.best_bid as f64 + self.params.optimism_edge);
        let ask_price = clamp_price(snapshot.best_ask as f64 + 2.0 * self.params.optimism_edge);

        let net = snapshot.net_exposure();
        let (bid_size, ask_size) = if net.abs() >= self.params.max_longshot_exposure {
            if net > 0 {
                (0, ask_size)
            } else {
                (bid_size, 0)
            }
        } else {
            (bid_size, ask_size)
        };

        Some(Quote {
            bid_price,
            bid_size,
            ask_price,
            ask_size,
        })
    }

    fn mid_range_quote(&self, snapshot: &MarketSnapshot) -> Option<Quote> {
        let net = snapshot.net_exposure();
        let volatile = snapshot.is_volatile.unwrap_or(false);
        if volatile {
            if net == 0 {
                return None;
            }
            // Only the flattening side, at the market.
            return Some(if net > 0 {
                Quote {
                    bid_price: 0,
                    bid_size: 0,
                    ask_price: snapshot.best_ask,
                    ask_size: self.params.size_per_side,
                }
            } else {
                Quote {
                    bid_price: snapshot.best_bid,
                    bid_size: self.params.size_per_side,
                    ask_price: 0,
                    ask_size: 0,
                }
            });
        }

        let skew = net as f64 * self.params.skew_factor;
        let bid = clamp_price(snapshot.best_bid as f64 + self.params.optimism_edge - skew);
        let ask = clamp_price(snapshot.best_ask as f64 - self.params.optimism_edge - skew);
        if (ask as f64 - bid as f64) < self.params.min_spread_cents {
            return None;
        }
        Some(Quote {
            bid_price: bid,
            bid_size: self.params.size_per_side,
            ask_price: ask,
            ask_size: self.params.size_per_side,
        })
    }

    /// Re-clamp against the current BBO so neither side crosses into taker
    /// territory; drop the offending side if the spread collapses.
    fn guard_against_crossing(quote: Quote, snapshot: &MarketSnapshot) -> Quote {
        let mut q = quote;
        if q.bid_size > 0 && q.bid_price >= snapshot.best_ask {
            q.bid_size = 0;
        }
        if q.ask_size > 0 && q.ask_price <= snapshot.best_bid {
            q.ask_size = 0;
        }
        q
    }
}

impl Strategy for OptimismTaxStrategy {
    fn compute_quotes(&mut self, snapshot: &MarketSnapshot) -> Vec<Quote> {
        if !snapshot.is_quotable() || snapshot.spread as u32 > self.params.max_market_spread {
            return Vec::new();
        }

        let mid = snapshot.mid;
        let quote = if mid <= self.params.long_shot_threshold {
            self.longshot_quote(snapshot)
        } else if mid >= self.params.nearly_certain_threshold {
            self.near_certainty_quote(snapshot)
        } else {
            self.mid_range_quote(snapshot)
        };

        let Some(quote) = quote else {
            return Vec::new();
        };
        let quote = Self::guard_against_crossing(quote, snapshot);
        if quote.is_empty() {
            debug!(ticker = %snapshot.ticker, "optimism tax quote collapsed after BBO guard");
            return Vec::new();
        }
        vec![quote]
    }

    fn on_fill(&mut self, _fill: &Fill) {}

    fn update_params(&mut self, params: &HashMap<String, f64>) {
        if let Some(&v) = params.get("optimism_edge") {
            self.params.optimism_edge = v;
        }
        if let Some(&v) = params.get("size_per_side") {
            self.params.size_per_side = v as u32;
        }
        if let Some(&v) = params.get("skew_factor") {
            self.params.skew_factor = v;
        }
    }

    fn name(&self) -> &str {
        "optimism_tax"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Position;

    fn snapshot(bid: u32, ask: u32) -> MarketSnapshot {
        MarketSnapshot {
            ticker: "T".into(),
            best_bid: bid,
            best_ask: ask,
            mid: (bid + ask) as f64 / 2.0,
            spread: ask as i32 - bid as i32,
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

    #[test]
    fn scenario_3_longshot_zone_sizes() {
        let mut strat = OptimismTaxStrategy::new(OptimismTaxParams {
            optimism_size_multiplier: 1.5,
            size_per_side: 5,
            ..Default::default()
        });
        let quotes = strat.compute_quotes(&snapshot(5, 10));
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].ask_size, 8);
        assert_eq!(quotes[0].bid_size, 2);
    }

    #[test]
    fn near_certainty_mirrors_longshot() {
        let mut strat = OptimismTaxStrategy::new(OptimismTaxParams::default());
        let quotes = strat.compute_quotes(&snapshot(90, 95));
        assert_eq!(quotes[0].bid_size, 8);
        assert_eq!(quotes[0].ask_size, 2);
    }

    #[test]
    fn longshot_exposure_limit_quotes_only_flattening_side() {
        let mut strat = OptimismTaxStrategy::new(OptimismTaxParams {
            max_longshot_exposure: 10,
            ..Default::default()
        });
        let mut snap = snapshot(5, 10);
        snap.position = Some(Position {
            yes_contracts: 15,
            no_contracts: 0,
            yes_cost_basis: 0,
            no_cost_basis: 0,
        });
        let quotes = strat.compute_quotes(&snap);
        assert_eq!(quotes[0].bid_size, 0);
        assert!(quotes[0].ask_size > 0);
    }

    #[test]
    fn mid_range_behaves_like_adaptive() {
        let mut strat = OptimismTaxStrategy::new(OptimismTaxParams::default());
        let quotes = strat.compute_quotes(&snapshot(50, 55));
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].bid_price, 51);
        assert_eq!(quotes[0].ask_price, 54);
    }

    #[test]
    fn mid_range_volatile_and_flat_skips() {
        let mut strat = OptimismTaxStrategy::new(OptimismTaxParams::default());
        let mut snap = snapshot(50, 55);
        snap.is_volatile = Some(true);
        assert!(strat.compute_quotes(&snap).is_empty());
    }

    #[test]
    fn mid_range_volatile_with_position_quotes_flattening_side_only() {
        let mut strat = OptimismTaxStrategy::new(OptimismTaxParams::default());
        let mut snap = snapshot(50, 55);
        snap.is_volatile = Some(true);
        snap.position = Some(Position {
            yes_contracts: 10,
            no_contracts: 0,
            yes_cost_basis: 0,
            no_cost_basis: 0,
        });
        let quotes = strat.compute_quotes(&snap);
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].bid_size, 0);
        assert!(quotes[0].ask_size > 0);
    }
}
