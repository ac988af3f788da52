//! Core data model: prices, sizes, tickers, books, positions, fills, quotes,
//! and managed orders.
//!
//! All prices are integer cents in `[1, 99]`. Sizes are non-negative integer
//! contract counts. Floats are used only for the two values the domain
//! genuinely treats as continuous: microprice and imbalance.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Integer cent price, always expected in `[1, 99]` for a live market.
pub type Price = u32;

/// Non-negative contract count.
pub type Size = u32;

/// Opaque market identifier, e.g. `"INXD-24DEC31-B5000"`.
pub type Ticker = String;

/// Milliseconds since the Unix epoch.
pub type TimestampMs = i64;

pub fn now_ms() -> TimestampMs {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as TimestampMs
}

/// Which side of the binary outcome an order or position refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Yes,
    No,
}

impl Side {
    pub const fn opposite(self) -> Side {
        match self {
            Side::Yes => Side::No,
            Side::No => Side::Yes,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Yes => "yes",
            Side::No => "no",
        })
    }
}

impl std::str::FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yes" => Ok(Side::Yes),
            "no" => Ok(Side::No),
            other => Err(format!("unknown side: {other}")),
        }
    }
}

/// Buy or sell, independent of `Side`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Buy,
    Sell,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Buy => "buy",
            Action::Sell => "sell",
        })
    }
}

impl std::str::FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(Action::Buy),
            "sell" => Ok(Action::Sell),
            other => Err(format!("unknown action: {other}")),
        }
    }
}

/// A single resting level in a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderbookLevel {
    pub price: Price,
    pub quantity: Size,
}

/// Best-bid/best-ask snapshot of a market, derived from `OrderbookReplica`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bbo {
    pub bid_price: Price,
    pub bid_size: Size,
    pub ask_price: Price,
    pub ask_size: Size,
}

impl Bbo {
    pub fn spread(&self) -> i32 {
        self.ask_price as i32 - self.bid_price as i32
    }

    /// Integer mid, floor-divided (callers needing the real-valued mid use
    /// `microprice`/`mid_f64` instead).
    pub fn mid(&self) -> u32 {
        (self.bid_price + self.ask_price) / 2
    }

    pub fn mid_f64(&self) -> f64 {
        (self.bid_price as f64 + self.ask_price as f64) / 2.0
    }
}

/// Per-ticker position, tracked independently on each side of the binary
/// outcome per spec: `yes_contracts` and `no_contracts` are both always
/// non-negative; `net_exposure` is what drives inventory skew.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    pub yes_contracts: i64,
    pub no_contracts: i64,
    /// Total cents paid for the currently-held YES contracts.
    pub yes_cost_basis: i64,
    /// Total cents paid for the currently-held NO contracts.
    pub no_cost_basis: i64,
}

impl Position {
    pub fn net_exposure(&self) -> i64 {
        self.yes_contracts - self.no_contracts
    }

    pub fn yes_avg_cost(&self) -> f64 {
        if self.yes_contracts == 0 {
            0.0
        } else {
            self.yes_cost_basis as f64 / self.yes_contracts as f64
        }
    }

    pub fn no_avg_cost(&self) -> f64 {
        if self.no_contracts == 0 {
            0.0
        } else {
            self.no_cost_basis as f64 / self.no_contracts as f64
        }
    }
}

/// An execution report from the streaming feed's `fill` channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fill {
    pub order_id: String,
    pub ticker: Ticker,
    pub side: Side,
    pub action: Action,
    pub count: Size,
    pub price: Price,
    pub ts: TimestampMs,
}

/// A desired two-sided (or one-sided) quote for a market. `size == 0` on a
/// side means "suppress that side" — never round a zero up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub bid_price: Price,
    pub bid_size: Size,
    pub ask_price: Price,
    pub ask_size: Size,
}

impl Quote {
    pub fn empty() -> Self {
        Self {
            bid_price: 0,
            bid_size: 0,
            ask_price: 0,
            ask_size: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bid_size == 0 && self.ask_size == 0
    }

    /// True when both sides are live and well-formed: `bid_price < ask_price`
    /// and both in `[1, 99]`.
    pub fn is_valid(&self) -> bool {
        if self.bid_size > 0 && !(1..=99).contains(&self.bid_price) {
            return false;
        }
        if self.ask_size > 0 && !(1..=99).contains(&self.ask_price) {
            return false;
        }
        if self.bid_size > 0 && self.ask_size > 0 && self.bid_price >= self.ask_price {
            return false;
        }
        true
    }
}

/// Lifecycle state of a `ManagedOrder`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OrderStatus {
    Pending,
    Open,
    Partial,
    Filled,
    Cancelled,
    Failed,
}

impl OrderStatus {
    /// Map a case-insensitive exchange status string onto `OrderStatus`.
    pub fn from_exchange_str(s: &str) -> OrderStatus {
        match s.to_ascii_lowercase().as_str() {
            "resting" => OrderStatus::Open,
            "pending" => OrderStatus::Pending,
            "executed" => OrderStatus::Filled,
            "canceled" | "cancelled" => OrderStatus::Cancelled,
            _ => OrderStatus::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Failed
        )
    }
}

/// An order the reconciler is tracking locally, keyed by `client_order_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedOrder {
    pub client_order_id: String,
    pub exchange_id: Option<String>,
    pub ticker: Ticker,
    pub side: Side,
    pub action: Action,
    pub price: Price,
    pub count: Size,
    pub filled_count: Size,
    pub status: OrderStatus,
    pub created_ts: TimestampMs,
}

impl ManagedOrder {
    pub fn is_resting(&self) -> bool {
        matches!(self.status, OrderStatus::Open | OrderStatus::Partial)
    }
}

/// Daily P&L and activity counters. Reset on an explicit daily boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PnlSummary {
    pub realized_today: i64,
    pub unrealized: i64,
    pub fills_today: u64,
    pub volume_today: u64,
}

/// Static per-process risk limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RiskLimits {
    pub max_position_per_market: i64,
    pub max_total_exposure: i64,
    pub max_daily_loss: i64,
    pub max_order_size: u32,
    pub min_spread: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbo_spread_and_mid() {
        let bbo = Bbo {
            bid_price: 50,
            bid_size: 10,
            ask_price: 60,
            ask_size: 20,
        };
        assert_eq!(bbo.spread(), 10);
        assert_eq!(bbo.mid(), 55);
    }

    #[test]
    fn quote_validity() {
        let q = Quote {
            bid_price: 51,
            bid_size: 5,
            ask_price: 54,
            ask_size: 5,
        };
        assert!(q.is_valid());

        let crossed = Quote {
            bid_price: 54,
            bid_size: 5,
            ask_price: 51,
            ask_size: 5,
        };
        assert!(!crossed.is_valid());
    }

    #[test]
    fn order_status_from_exchange_str_is_case_insensitive() {
        assert_eq!(OrderStatus::from_exchange_str("RESTING"), OrderStatus::Open);
        assert_eq!(OrderStatus::from_exchange_str("Cancelled"), OrderStatus::Cancelled);
        assert_eq!(OrderStatus::from_exchange_str("canceled"), OrderStatus::Cancelled);
        assert_eq!(OrderStatus::from_exchange_str("executed"), OrderStatus::Filled);
        assert_eq!(OrderStatus::from_exchange_str("whatever"), OrderStatus::Pending);
    }

    #[test]
    fn position_net_exposure() {
        let p = Position {
            yes_contracts: 10,
            no_contracts: 3,
            yes_cost_basis: 450,
            no_cost_basis: 120,
        };
        assert_eq!(p.net_exposure(), 7);
        assert!((p.yes_avg_cost() - 45.0).abs() < 1e-9);
    }
}
