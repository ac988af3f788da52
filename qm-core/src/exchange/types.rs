//! Wire-adjacent types for the Exchange REST and streaming surfaces
//! (spec.md §6). Grounded on the Kalshi wire shapes in the reference
//! pack's `btcpredict-kalshi` types file, trimmed to the fields the
//! core actually consumes.

use serde::{Deserialize, Serialize};

use crate::core::types::{Price, Size, Ticker, TimestampMs};

#[derive(Debug, Clone, Deserialize)]
pub struct MarketRecord {
    pub ticker: Ticker,
    pub status: String,
    pub yes_bid: Option<Price>,
    pub yes_ask: Option<Price>,
    pub volume: u64,
    pub volume_24h: u64,
    pub open_interest: u64,
    pub close_time: Option<TimestampMs>,
    pub expiration_time: Option<TimestampMs>,
    pub category: Option<String>,
    pub event_ticker: Option<String>,
    pub title: Option<String>,
    pub liquidity: Option<u64>,
}

/// A cursor-paginated REST response.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PositionRecord {
    pub ticker: Ticker,
    /// Signed contract count: positive is YES, negative is NO.
    pub position: i64,
    pub market_exposure: i64,
    pub realized_pnl: Option<i64>,
    pub total_traded: Option<i64>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Balance {
    pub balance: i64,
    pub portfolio_value: i64,
}

/// A resting order as reported by the exchange, used only at startup to
/// find and cancel orders this process doesn't know about (spec.md
/// §4.11 step 2).
#[derive(Debug, Clone, Deserialize)]
pub struct OrderRecord {
    pub order_id: String,
    pub ticker: Ticker,
    pub status: String,
}

/// Every outbound streaming command carries a monotonically increasing
/// id (spec.md §6); `FeedClient` owns the counter this produces.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum FeedCommand {
    Subscribe {
        id: u64,
        channels: Vec<String>,
        market_tickers: Option<Vec<String>>,
    },
    Unsubscribe {
        id: u64,
        channels: Vec<String>,
    },
    UpdateSubscription {
        id: u64,
        channels: Vec<String>,
        market_tickers: Vec<String>,
        action: String,
    },
}

/// Inbound streaming messages, discriminated by `type` (spec.md §6).
/// `OrderbookDelta.delta` is an absolute quantity, not an increment — `0`
/// removes the level, per the open question in spec.md §9 resolved in
/// favor of the "absolute" reading.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedEvent {
    Subscribed,
    Error {
        code: i32,
        message: String,
    },
    OrderbookSnapshot {
        market_ticker: Ticker,
        yes: Vec<(Price, Size)>,
        no: Vec<(Price, Size)>,
    },
    OrderbookDelta {
        market_ticker: Ticker,
        side: String,
        price: Price,
        delta: Size,
    },
    Ticker {
        market_ticker: Ticker,
        yes_bid: Price,
        yes_ask: Price,
        no_bid: Price,
        no_ask: Price,
        last_price: Price,
        volume: u64,
        open_interest: u64,
    },
    Trade,
    Fill {
        order_id: String,
        market_ticker: Ticker,
        side: String,
        action: String,
        count: Size,
        yes_price: Price,
        no_price: Price,
        is_taker: Option<bool>,
    },
}
