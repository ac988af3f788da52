//! Orchestration layer (spec.md §4.9-4.11): the objects that own the
//! per-process state machine above the individual subsystems —
//! quoting, connection health, and startup reconciliation.

pub mod connection;
pub mod quoting;
pub mod startup;

pub use connection::ConnectionSupervisor;
pub use quoting::QuotingSupervisor;
