//! Fair value, adverse selection, and volatility signals (spec.md §4.3).
//!
//! `FairValueModel` is a thin facade over `OrderbookReplica`'s microprice
//! and imbalance, plus the two stateful detectors every `MarketSnapshot`
//! needs: a post-fill mark-to-market tracker (`AdverseSelectionDetector`)
//! and a short-window mid-price range tracker (`VolatilityEstimator`).

use std::collections::{HashMap, VecDeque};

use crate::core::types::{Action, Side, Ticker, TimestampMs};

/// One recorded fill, kept long enough to judge whether the market moved
/// against us immediately after.
#[derive(Debug, Clone, Copy)]
struct FillRecord {
    price: f64,
    side: Side,
    action: Action,
    ts: TimestampMs,
}

/// Per-ticker sliding window of recent fills, used to flag adverse
/// selection: the market consistently moving against our fills right
/// after they land.
#[derive(Default)]
pub struct AdverseSelectionDetector {
    windows: HashMap<Ticker, VecDeque<FillRecord>>,
    max_fills: usize,
    max_age_ms: i64,
}

impl AdverseSelectionDetector {
    pub fn new(max_fills: usize, max_age_ms: i64) -> Self {
        Self {
            windows: HashMap::new(),
            max_fills,
            max_age_ms,
        }
    }

    pub fn record_fill(&mut self, ticker: &str, side: Side, action: Action, price: f64, ts: TimestampMs) {
        let window = self.windows.entry(ticker.to_string()).or_default();
        window.push_back(FillRecord { price, side, action, ts });
        while window.len() > self.max_fills {
            window.pop_front();
        }
    }

    /// Average, direction-adjusted mark-to-market of recent fills against
    /// `current_mid` (YES-denominated: a NO fill's mid reference is
    /// `100 - current_mid`). Negative means the market has moved against
    /// our recent fills.
    fn mark_to_market(&self, ticker: &str, current_mid: f64, now: TimestampMs) -> Option<f64> {
        let window = self.windows.get(ticker)?;
        let relevant: Vec<&FillRecord> = window
            .iter()
            .filter(|r| now - r.ts <= self.max_age_ms)
            .collect();
        if relevant.is_empty() {
            return None;
        }
        let sum: f64 = relevant
            .iter()
            .map(|r| {
                let reference_mid = match r.side {
                    Side::Yes => current_mid,
                    Side::No => 100.0 - current_mid,
                };
                match r.action {
                    // Bought at r.price; good if mid has since risen above it.
                    Action::Buy => reference_mid - r.price,
                    // Sold at r.price; good if mid has since fallen below it.
                    Action::Sell => r.price - reference_mid,
                }
            })
            .sum();
        Some(sum / relevant.len() as f64)
    }

    /// `true` when the mark-to-market of recent fills is negative beyond
    /// `threshold_cents`.
    pub fn is_adverse(&self, ticker: &str, current_mid: f64, now: TimestampMs, threshold_cents: f64) -> bool {
        matches!(self.mark_to_market(ticker, current_mid, now), Some(mtm) if mtm < -threshold_cents)
    }
}

/// Ring buffer of recent mid snapshots; flags a market as volatile when the
/// range over the window exceeds a cent threshold.
#[derive(Default)]
pub struct VolatilityEstimator {
    windows: HashMap<Ticker, VecDeque<f64>>,
    capacity: usize,
}

impl VolatilityEstimator {
    pub fn new(capacity: usize) -> Self {
        Self {
            windows: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn record_mid(&mut self, ticker: &str, mid: f64) {
        let window = self.windows.entry(ticker.to_string()).or_default();
        window.push_back(mid);
        while window.len() > self.capacity {
            window.pop_front();
        }
    }

    pub fn range(&self, ticker: &str) -> Option<f64> {
        let window = self.windows.get(ticker)?;
        if window.is_empty() {
            return None;
        }
        let max = window.iter().cloned().fold(f64::MIN, f64::max);
        let min = window.iter().cloned().fold(f64::MAX, f64::min);
        Some(max - min)
    }

    pub fn is_volatile(&self, ticker: &str, threshold_cents: f64) -> bool {
        matches!(self.range(ticker), Some(range) if range > threshold_cents)
    }
}

/// Facade bundling the fair-value signals a `MarketSnapshot` needs.
#[derive(Default)]
pub struct FairValueModel {
    pub adverse: AdverseSelectionDetector,
    pub volatility: VolatilityEstimator,
}

impl FairValueModel {
    pub fn new(adverse_window_fills: usize, adverse_window_ms: i64, vol_window_ticks: usize) -> Self {
        Self {
            adverse: AdverseSelectionDetector::new(adverse_window_fills, adverse_window_ms),
            volatility: VolatilityEstimator::new(vol_window_ticks),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adverse_selection_flags_consistent_post_fill_moves() {
        let mut det = AdverseSelectionDetector::new(10, 60_000);
        // Bought repeatedly at 50, market has since dropped to mid 45: bad fills.
        for i in 0..5 {
            det.record_fill("T", Side::Yes, Action::Buy, 50.0, i * 100);
        }
        assert!(det.is_adverse("T", 45.0, 1_000, 2.0));
        assert!(!det.is_adverse("T", 50.5, 1_000, 2.0));
    }

    #[test]
    fn adverse_selection_ignores_fills_outside_window() {
        let mut det = AdverseSelectionDetector::new(10, 1_000);
        det.record_fill("T", Side::Yes, Action::Buy, 50.0, 0);
        assert!(!det.is_adverse("T", 0.0, 10_000, 2.0));
    }

    #[test]
    fn volatility_range_over_window() {
        let mut vol = VolatilityEstimator::new(3);
        vol.record_mid("T", 50.0);
        vol.record_mid("T", 52.0);
        vol.record_mid("T", 48.0);
        assert_eq!(vol.range("T"), Some(4.0));
        assert!(vol.is_volatile("T", 3.0));
        assert!(!vol.is_volatile("T", 5.0));
    }

    #[test]
    fn volatility_window_is_bounded() {
        let mut vol = VolatilityEstimator::new(2);
        vol.record_mid("T", 50.0);
        vol.record_mid("T", 60.0);
        vol.record_mid("T", 50.0);
        // Only the last two mids (60, 50) remain.
        assert_eq!(vol.range("T"), Some(10.0));
    }
}
