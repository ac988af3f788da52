//! Local order book replicas, one per ticker, built from the streaming
//! feed's snapshot + delta messages.

pub mod replica;

pub use replica::OrderbookReplica;
