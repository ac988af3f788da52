//! Domain-specific error types for the quoting engine.
//!
//! Transient I/O and exchange-reject errors are represented here with
//! `thiserror` so callers can match on them; the outer run-loop boundary
//! (`runtime`, `exchange::rest`) collapses everything into `anyhow::Result`
//! per spec.md's error taxonomy (§7): never-fatal, surfaced to the caller,
//! or fatal at startup.

use crate::core::types::Ticker;
use thiserror::Error;

/// Errors raised by `OrderReconciler` order placement/cancellation.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("exchange rejected order for {ticker}: {reason}")]
    ExchangeReject { ticker: Ticker, reason: String },

    #[error("no resting order with client_order_id {0}")]
    UnknownOrder(String),

    #[error("batch cancel partially failed: {failed}/{attempted} orders")]
    PartialBatchCancel { attempted: usize, failed: usize },

    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

/// Errors raised while admitting a quote or order through `RiskGate`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiskDenyReason {
    #[error("trading halted")]
    Halted,
    #[error("spread below minimum")]
    SpreadBelowMin,
    #[error("bid size above max order size")]
    BidSizeAboveMax,
    #[error("ask size above max order size")]
    AskSizeAboveMax,
    #[error("position limit exceeded")]
    PositionLimit,
    #[error("total exposure limit exceeded")]
    TotalExposureLimit,
}

/// Errors raised while processing a feed message or building a book.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("malformed feed message: {0}")]
    Malformed(String),

    #[error("snapshot for {ticker} produced a crossed book (bid {bid} >= ask {ask})")]
    CrossedBook { ticker: Ticker, bid: u32, ask: u32 },

    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

/// Configuration errors, fatal at startup per spec.md §7.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown ticker referenced in configuration: {0}")]
    UnknownTicker(String),

    #[error("invalid threshold for {field}: {reason}")]
    InvalidThreshold { field: &'static str, reason: String },
}
