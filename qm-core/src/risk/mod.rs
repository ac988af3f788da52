//! Risk management (spec.md §4.5–4.7): a per-quote admission gate, a
//! drawdown-scaled sizing multiplier, and a loss-pattern circuit breaker.
//! Three independent layers, composed by `QuotingSupervisor` rather than
//! chained internally — matching the teacher's "defense in depth" layering
//! without its compile-time-feature-configured limits.

pub mod circuit_breaker;
pub mod drawdown;
pub mod gate;

pub use circuit_breaker::{BreakerState, CircuitBreaker, CircuitBreakerParams, HaltReason};
pub use drawdown::{DrawdownManager, DrawdownParams};
pub use gate::RiskGate;
