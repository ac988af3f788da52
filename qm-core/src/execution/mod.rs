//! Order execution (spec.md §4.8): the reconciler that owns the
//! client_order_id-keyed order registry, and the wire-adjacent types at
//! its exchange boundary.

pub mod reconciler;
pub mod types;

pub use reconciler::{ExchangeOrders, OrderReconciler};
pub use types::{CancelResult, CreateResult, NewOrderInput};
