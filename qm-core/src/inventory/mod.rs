//! Per-market position and realized P&L tracking from fills (spec.md §4.2).
//!
//! `yes_contracts` and `no_contracts` are both always non-negative. A trade
//! that would push a side negative instead closes out the *opposite* side's
//! holding first (a YES buy closes an existing NO holding — holding NO is
//! economically a short YES — before any remainder opens a fresh YES long),
//! and only the excess beyond that flips into a fresh position on the
//! traded side. `Action::Sell` mirrors this the other way: it closes the
//! same-side long first, and any excess opens the opposite side.

use std::collections::HashMap;

use tracing::debug;

use crate::core::types::{Action, Fill, PnlSummary, Position, Price, Side, Ticker};

#[derive(Debug, Clone)]
pub struct PortfolioEntry {
    pub ticker: Ticker,
    pub yes: i64,
    pub no: i64,
    /// Total cost basis in cents, split `(yes_cost, no_cost)`.
    pub cost_basis: (i64, i64),
}

#[derive(Default)]
pub struct InventoryTracker {
    positions: HashMap<Ticker, Position>,
    daily: PnlSummary,
}

impl InventoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-load positions at startup (spec.md §4.11 step 3) and reset
    /// daily counters.
    pub fn initialize_from_portfolio(&mut self, entries: &[PortfolioEntry]) {
        self.positions.clear();
        for entry in entries {
            self.positions.insert(
                entry.ticker.clone(),
                Position {
                    yes_contracts: entry.yes,
                    no_contracts: entry.no,
                    yes_cost_basis: entry.cost_basis.0,
                    no_cost_basis: entry.cost_basis.1,
                },
            );
        }
        self.reset_daily();
    }

    /// Apply a fill's P&L semantics and return the realized P&L delta for
    /// just this fill.
    pub fn on_fill(&mut self, fill: &Fill) -> i64 {
        let position = self.positions.entry(fill.ticker.clone()).or_default();
        let delta = apply_fill(position, fill.side, fill.action, fill.count as i64, fill.price);

        self.daily.realized_today += delta;
        self.daily.fills_today += 1;
        self.daily.volume_today += fill.count as u64;

        debug!(
            ticker = %fill.ticker,
            side = %fill.side,
            action = %fill.action,
            count = fill.count,
            price = fill.price,
            realized_delta = delta,
            "fill applied to inventory"
        );

        delta
    }

    pub fn position(&self, ticker: &str) -> Position {
        self.positions.get(ticker).copied().unwrap_or_default()
    }

    pub fn net_exposure(&self, ticker: &str) -> i64 {
        self.position(ticker).net_exposure()
    }

    pub fn total_exposure(&self) -> i64 {
        self.positions.values().map(|p| p.net_exposure().abs()).sum()
    }

    pub fn all_positions(&self) -> impl Iterator<Item = (&Ticker, &Position)> {
        self.positions.iter()
    }

    /// `current_prices` maps ticker -> current YES price in cents, used to
    /// value unrealized P&L (YES at `current_price`, NO at `100 -
    /// current_price`, per spec.md §4.2).
    pub fn pnl_summary(&self, current_prices: &HashMap<Ticker, Price>) -> PnlSummary {
        let mut unrealized = 0i64;
        for (ticker, position) in &self.positions {
            let Some(&price) = current_prices.get(ticker) else {
                continue;
            };
            let price = price as i64;
            unrealized += position.yes_contracts * price - position.yes_cost_basis;
            unrealized += position.no_contracts * (100 - price) - position.no_cost_basis;
        }
        PnlSummary {
            unrealized,
            ..self.daily
        }
    }

    /// Zero daily counters, preserve positions.
    pub fn reset_daily(&mut self) {
        self.daily = PnlSummary::default();
    }
}

/// Mutate `position` in place per the Fill P&L semantics in spec.md §3/§4.2,
/// returning the realized P&L delta.
fn apply_fill(position: &mut Position, side: Side, action: Action, count: i64, price: Price) -> i64 {
    let price = price as i64;
    let mut realized = 0i64;

    let (same_contracts, same_cost, mirror_contracts, mirror_cost) = match side {
        Side::Yes => (
            &mut position.yes_contracts,
            &mut position.yes_cost_basis,
            &mut position.no_contracts,
            &mut position.no_cost_basis,
        ),
        Side::No => (
            &mut position.no_contracts,
            &mut position.no_cost_basis,
            &mut position.yes_contracts,
            &mut position.yes_cost_basis,
        ),
    };

    match action {
        Action::Buy => {
            // Closing a short (held as the mirror side) comes first; the
            // close price compares against the mirror's average open cost.
            let close_count = count.min(*mirror_contracts);
            if close_count > 0 {
                let mirror_avg = *mirror_cost as f64 / *mirror_contracts as f64;
                realized += ((mirror_avg - price as f64) * close_count as f64).round() as i64;
                *mirror_cost -= (mirror_avg * close_count as f64).round() as i64;
                *mirror_contracts -= close_count;
            }
            let remainder = count - close_count;
            if remainder > 0 {
                *same_contracts += remainder;
                *same_cost += price * remainder;
            }
        }
        Action::Sell => {
            // Closing an existing long on the same side comes first.
            let close_count = count.min(*same_contracts);
            if close_count > 0 {
                let same_avg = *same_cost as f64 / *same_contracts as f64;
                realized += ((price as f64 - same_avg) * close_count as f64).round() as i64;
                *same_cost -= (same_avg * close_count as f64).round() as i64;
                *same_contracts -= close_count;
            }
            let remainder = count - close_count;
            if remainder > 0 {
                *mirror_contracts += remainder;
                *mirror_cost += price * remainder;
            }
        }
    }

    realized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(side: Side, action: Action, count: u32, price: Price) -> Fill {
        Fill {
            order_id: "o1".into(),
            ticker: "T".into(),
            side,
            action,
            count,
            price,
            ts: 0,
        }
    }

    #[test]
    fn scenario_4_round_trip_two_cycles() {
        let mut inv = InventoryTracker::new();
        assert_eq!(inv.on_fill(&fill(Side::Yes, Action::Buy, 3, 45)), 0);
        assert_eq!(inv.on_fill(&fill(Side::Yes, Action::Sell, 3, 50)), 15);
        assert_eq!(inv.on_fill(&fill(Side::Yes, Action::Buy, 3, 48)), 0);
        assert_eq!(inv.on_fill(&fill(Side::Yes, Action::Sell, 3, 46)), -6);

        let summary = inv.pnl_summary(&HashMap::new());
        assert_eq!(summary.realized_today, 9);
        assert_eq!(summary.fills_today, 4);
    }

    #[test]
    fn scenario_5_short_then_cover_with_flip() {
        let mut inv = InventoryTracker::new();
        assert_eq!(inv.on_fill(&fill(Side::Yes, Action::Sell, 3, 50)), 0);
        let p = inv.position("T");
        assert_eq!(p.no_contracts, 3);
        assert_eq!(p.yes_contracts, 0);

        assert_eq!(inv.on_fill(&fill(Side::Yes, Action::Buy, 5, 45)), 15);
        let p = inv.position("T");
        assert_eq!(p.yes_contracts, 2);
        assert_eq!(p.no_contracts, 0);
        assert!((p.yes_avg_cost() - 45.0).abs() < 1e-9);
    }

    #[test]
    fn positions_never_go_negative() {
        let mut inv = InventoryTracker::new();
        inv.on_fill(&fill(Side::No, Action::Sell, 10, 30));
        let p = inv.position("T");
        assert!(p.yes_contracts >= 0);
        assert!(p.no_contracts >= 0);
    }

    #[test]
    fn total_exposure_sums_absolute_net_exposure() {
        let mut inv = InventoryTracker::new();
        inv.on_fill(&fill(Side::Yes, Action::Buy, 10, 50));
        inv.on_fill(&{
            let mut f = fill(Side::Yes, Action::Buy, 5, 50);
            f.ticker = "T2".into();
            f
        });
        assert_eq!(inv.total_exposure(), 15);
    }

    #[test]
    fn reset_daily_preserves_positions() {
        let mut inv = InventoryTracker::new();
        inv.on_fill(&fill(Side::Yes, Action::Buy, 10, 50));
        inv.reset_daily();
        assert_eq!(inv.pnl_summary(&HashMap::new()).realized_today, 0);
        assert_eq!(inv.position("T").yes_contracts, 10);
    }

    #[test]
    fn unrealized_pnl_values_yes_and_no_sides() {
        let mut inv = InventoryTracker::new();
        inv.on_fill(&fill(Side::Yes, Action::Buy, 10, 40));
        let mut prices = HashMap::new();
        prices.insert("T".to_string(), 55u32);
        let summary = inv.pnl_summary(&prices);
        assert_eq!(summary.unrealized, 10 * 55 - 400);
    }
}
