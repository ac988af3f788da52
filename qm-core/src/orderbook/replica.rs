//! Local replica of a remote order book, built from snapshot + delta
//! messages (spec.md §4.1).
//!
//! The feed speaks one side natively (YES bids) and represents the other
//! side as symmetric NO bids: a NO bid of quantity `q` at price `p` is `q`
//! contracts available to sell YES at `100 - p`. The replica applies this
//! transform once, on ingress, so every downstream consumer (BBO,
//! microprice, imbalance, depth) only ever sees a plain YES bid / YES ask
//! book.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::clock::Clock;
use crate::core::errors::FeedError;
use crate::core::types::{Bbo, OrderbookLevel, Price, Side, Size, Ticker, TimestampMs};

#[derive(Debug, Clone, Default)]
struct Book {
    /// YES bids: price -> quantity, best is the max key.
    bids: BTreeMap<Price, Size>,
    /// YES asks (derived from NO bids on ingress): price -> quantity, best
    /// is the min key.
    asks: BTreeMap<Price, Size>,
    sequence: u64,
    last_update_ts: TimestampMs,
}

/// `NO` bid at price `p` carries the same liquidity as a YES ask at
/// `100 - p`. Both `apply_snapshot` and `apply_delta` route through this
/// single transform, per spec.md §3.
fn no_price_to_yes_ask(no_price: Price) -> Price {
    100 - no_price
}

pub struct OrderbookReplica {
    books: HashMap<Ticker, Book>,
    clock: Arc<dyn Clock>,
}

impl OrderbookReplica {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            books: HashMap::new(),
            clock,
        }
    }

    /// Atomically replace both sides of a ticker's book. Discards any
    /// deltas that arrived before this snapshot and resets `sequence`.
    pub fn apply_snapshot(
        &mut self,
        ticker: &str,
        yes_bids: &[(Price, Size)],
        no_bids: &[(Price, Size)],
    ) {
        let mut bids = BTreeMap::new();
        for &(price, qty) in yes_bids {
            if qty > 0 {
                bids.insert(price, qty);
            }
        }

        let mut asks = BTreeMap::new();
        for &(no_price, qty) in no_bids {
            if qty > 0 {
                asks.insert(no_price_to_yes_ask(no_price), qty);
            }
        }

        if let (Some((&best_bid, _)), Some((&best_ask, _))) =
            (bids.iter().next_back(), asks.iter().next())
        {
            if best_bid >= best_ask {
                let err = FeedError::CrossedBook {
                    ticker: ticker.to_string(),
                    bid: best_bid,
                    ask: best_ask,
                };
                warn!(ticker, %err, "discarding snapshot, awaiting next one");
                return;
            }
        }

        let now = self.clock.now_ms();
        self.books.insert(
            ticker.to_string(),
            Book {
                bids,
                asks,
                sequence: 0,
                last_update_ts: now,
            },
        );
        debug!(ticker, "applied orderbook snapshot");
    }

    /// Set a level to an absolute quantity (not an increment); `delta == 0`
    /// removes the level. `sequence`, if provided, must be monotonically
    /// non-decreasing or the delta is ignored as stale.
    pub fn apply_delta(
        &mut self,
        ticker: &str,
        side: Side,
        price: Price,
        delta: Size,
        sequence: Option<u64>,
    ) {
        let book = self.books.entry(ticker.to_string()).or_default();

        if let Some(seq) = sequence {
            if seq < book.sequence {
                warn!(ticker, seq, current = book.sequence, "stale delta sequence, ignoring");
                return;
            }
            book.sequence = seq;
        } else {
            book.sequence += 1;
        }

        let (map, effective_price) = match side {
            Side::Yes => (&mut book.bids, price),
            Side::No => (&mut book.asks, no_price_to_yes_ask(price)),
        };

        if delta == 0 {
            map.remove(&effective_price);
        } else {
            map.insert(effective_price, delta);
        }

        book.last_update_ts = self.clock.now_ms();
    }

    pub fn best_bid(&self, ticker: &str) -> Option<(Price, Size)> {
        self.books.get(ticker)?.bids.iter().next_back().map(|(&p, &q)| (p, q))
    }

    pub fn best_ask(&self, ticker: &str) -> Option<(Price, Size)> {
        self.books.get(ticker)?.asks.iter().next().map(|(&p, &q)| (p, q))
    }

    /// O(1) best on each side. `None` unless both sides are populated.
    pub fn bbo(&self, ticker: &str) -> Option<Bbo> {
        let (bid_price, bid_size) = self.best_bid(ticker)?;
        let (ask_price, ask_size) = self.best_ask(ticker)?;
        Some(Bbo {
            bid_price,
            bid_size,
            ask_price,
            ask_size,
        })
    }

    /// Size-weighted fair value: `(bid*ask_size + ask*bid_size) / (bid_size+ask_size)`.
    pub fn microprice(&self, ticker: &str) -> Option<f64> {
        let bbo = self.bbo(ticker)?;
        let total = bbo.bid_size + bbo.ask_size;
        if total == 0 {
            return None;
        }
        Some(
            (bbo.bid_price as f64 * bbo.ask_size as f64 + bbo.ask_price as f64 * bbo.bid_size as f64)
                / total as f64,
        )
    }

    /// `(bid_size - ask_size) / (bid_size + ask_size)` at BBO, in `[-1, 1]`.
    pub fn imbalance(&self, ticker: &str) -> Option<f64> {
        let bbo = self.bbo(ticker)?;
        let total = bbo.bid_size + bbo.ask_size;
        if total == 0 {
            return None;
        }
        Some((bbo.bid_size as f64 - bbo.ask_size as f64) / total as f64)
    }

    /// Top `n` levels of each side, best-first.
    pub fn depth(&self, ticker: &str, n: usize) -> (Vec<OrderbookLevel>, Vec<OrderbookLevel>) {
        let Some(book) = self.books.get(ticker) else {
            return (Vec::new(), Vec::new());
        };
        let bids = book
            .bids
            .iter()
            .rev()
            .take(n)
            .map(|(&price, &quantity)| OrderbookLevel { price, quantity })
            .collect();
        let asks = book
            .asks
            .iter()
            .take(n)
            .map(|(&price, &quantity)| OrderbookLevel { price, quantity })
            .collect();
        (bids, asks)
    }

    /// `true` when the ticker is unknown, or its last update is older than
    /// `threshold_ms`.
    pub fn is_stale(&self, ticker: &str, threshold_ms: i64) -> bool {
        match self.books.get(ticker) {
            Some(book) => self.clock.now_ms() - book.last_update_ts > threshold_ms,
            None => true,
        }
    }

    pub fn sequence(&self, ticker: &str) -> Option<u64> {
        self.books.get(ticker).map(|b| b.sequence)
    }
}
