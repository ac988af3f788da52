//! Core library for a real-time, inventory-aware quoting engine over a
//! cents-denominated binary-outcome exchange (spec.md). Everything here
//! is exchange- and transport-agnostic aside from `exchange::rest` and
//! `exchange::feed`, which implement the concrete REST/WebSocket
//! bindings behind narrow traits the rest of the crate depends on.

pub mod config;
pub mod core;
pub mod exchange;
pub mod execution;
pub mod fairvalue;
pub mod inventory;
pub mod observability;
pub mod orderbook;
pub mod risk;
pub mod runtime;
pub mod strategy;
pub mod supervisor;

pub use config::Config;
pub use core::{Clock, ManualClock, SystemClock};
pub use supervisor::{ConnectionSupervisor, QuotingSupervisor};
