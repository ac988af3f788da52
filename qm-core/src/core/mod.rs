//! Zero-dependency core types shared across every other module: the data
//! model (§3 of the spec), the injectable clock, and the error taxonomy.

pub mod clock;
pub mod errors;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use types::{
    now_ms, Action, Bbo, Fill, ManagedOrder, OrderStatus, OrderbookLevel, PnlSummary, Position,
    Price, Quote, RiskLimits, Side, Size, Ticker, TimestampMs,
};
