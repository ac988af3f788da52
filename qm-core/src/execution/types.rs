//! Wire-adjacent types at the reconciler/exchange boundary. Grounded on
//! the teacher's `execution::types::{Order, Fill}`, trimmed to the
//! fields a binary-outcome maker actually needs (no `OrderType`/
//! `TimeInForce` variety — everything here is a resting post-only limit
//! order).

use crate::core::types::{Action, Price, Side, Size, Ticker};

/// A single new order to place, as built by `OrderReconciler::update_quote`
/// from a `Quote`.
#[derive(Debug, Clone)]
pub struct NewOrderInput {
    pub ticker: Ticker,
    pub side: Side,
    pub action: Action,
    pub price: Price,
    pub count: Size,
}

/// Result of a single create call against the exchange.
#[derive(Debug, Clone)]
pub struct CreateResult {
    pub client_order_id: String,
    pub exchange_id: Option<String>,
    pub error: Option<String>,
}

/// Result of a single cancel call against the exchange.
#[derive(Debug, Clone)]
pub struct CancelResult {
    pub client_order_id: String,
    pub error: Option<String>,
}
