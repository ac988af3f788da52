//! Simplest member of the `{Symmetric, Adaptive, OptimismTax, Avellaneda}`
//! family named in spec.md §9: a fixed edge around fair value, no inventory
//! skew, no imbalance handling. Grounded on the teacher's
//! `strategy::simple_spread::SimpleSpreadStrategy`.

use std::collections::HashMap;

use tracing::debug;

use crate::core::types::{Fill, Quote};

use super::{clamp_price, MarketSnapshot, Strategy};

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct SymmetricParams {
    pub edge_cents: u32,
    pub min_spread_cents: u32,
    pub size_per_side: u32,
    pub max_market_spread: u32,
}

pub struct SymmetricStrategy {
    params: SymmetricParams,
}

impl SymmetricStrategy {
    pub fn new(params: SymmetricParams) -> Self {
        Self { params }
    }
}

impl Strategy for SymmetricStrategy {
    fn compute_quotes(&mut self, snapshot: &MarketSnapshot) -> Vec<Quote> {
        if !snapshot.is_quotable() || snapshot.spread as u32 > self.params.max_market_spread {
            return Vec::new();
        }

        let fair_value = snapshot.mid;
        let bid = clamp_price(fair_value - self.params.edge_cents as f64);
        let ask = clamp_price(fair_value + self.params.edge_cents as f64);
        if ask <= bid || (ask - bid) < self.params.min_spread_cents {
            debug!(ticker = %snapshot.ticker, "symmetric quote collapsed below min spread, skipping");
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
        if let Some(&v) = params.get("edge_cents") {
            self.params.edge_cents = v as u32;
        }
        if let Some(&v) = params.get("min_spread_cents") {
            self.params.min_spread_cents = v as u32;
        }
        if let Some(&v) = params.get("size_per_side") {
            self.params.size_per_side = v as u32;
        }
    }

    fn name(&self) -> &str {
        "symmetric"
    }
}
