//! Quoting strategies (spec.md §4.4).
//!
//! A `Strategy` is polymorphic over one capability set: given a
//! `MarketSnapshot` it produces zero or more desired `Quote`s, and it
//! observes fills and parameter updates. Four variants are implemented,
//! named in spec.md §9's design notes: [`symmetric::SymmetricStrategy`],
//! [`adaptive::AdaptiveStrategy`], [`optimism_tax::OptimismTaxStrategy`],
//! and [`avellaneda::AvellanedaStrategy`]. Selection between them happens at
//! construction time from configuration; there is no runtime reflection.

pub mod adaptive;
pub mod avellaneda;
pub mod optimism_tax;
pub mod symmetric;

pub use adaptive::AdaptiveStrategy;
pub use avellaneda::AvellanedaStrategy;
pub use optimism_tax::OptimismTaxStrategy;
pub use symmetric::SymmetricStrategy;

use std::collections::HashMap;

use crate::core::types::{Fill, Position, Price, Quote, Size, Ticker};

/// Input to `Strategy::compute_quotes`, assembled by `QuotingSupervisor`
/// from the orderbook replica, the inventory tracker, and the fair-value
/// detectors.
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    pub ticker: Ticker,
    pub best_bid: Price,
    pub best_ask: Price,
    pub mid: f64,
    pub spread: i32,
    pub position: Option<Position>,
    pub microprice: Option<f64>,
    pub bid_size: Option<Size>,
    pub ask_size: Option<Size>,
    pub imbalance: Option<f64>,
    pub adverse_selection: Option<bool>,
    pub is_volatile: Option<bool>,
    /// Seconds until market close, if known.
    pub time_to_expiry: Option<f64>,
}

impl MarketSnapshot {
    pub fn net_exposure(&self) -> i64 {
        self.position.map(|p| p.net_exposure()).unwrap_or(0)
    }

    /// Basic sanity check shared by every strategy: prices in range and not
    /// crossed.
    pub fn is_quotable(&self) -> bool {
        (1..=99).contains(&self.best_bid)
            && (1..=99).contains(&self.best_ask)
            && self.best_bid < self.best_ask
    }
}

pub trait Strategy: Send {
    /// Compute the desired quote(s) for this market right now. An empty
    /// vec means "don't quote this ticker at all".
    fn compute_quotes(&mut self, snapshot: &MarketSnapshot) -> Vec<Quote>;

    fn on_fill(&mut self, fill: &Fill);

    fn update_params(&mut self, params: &HashMap<String, f64>);

    fn name(&self) -> &str;
}

impl Strategy for Box<dyn Strategy> {
    fn compute_quotes(&mut self, snapshot: &MarketSnapshot) -> Vec<Quote> {
        (**self).compute_quotes(snapshot)
    }

    fn on_fill(&mut self, fill: &Fill) {
        (**self).on_fill(fill)
    }

    fn update_params(&mut self, params: &HashMap<String, f64>) {
        (**self).update_params(params)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Clamp a signed price to the legal `[1, 99]` range.
pub(crate) fn clamp_price(price: f64) -> Price {
    price.round().clamp(1.0, 99.0) as Price
}
