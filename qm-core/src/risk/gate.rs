//! `RiskGate`: the per-quote/per-order admission check (spec.md §4.5).
//! Grounded on the teacher's `risk::RiskManager`, collapsed from its
//! Decimal-denominated continuous-asset position model down to integer
//! cents and per-market exposure, and from `Result<(), anyhow::Error>` to
//! the closed `RiskDenyReason` enum the quoting engine matches on.

use tracing::error;

use crate::core::errors::RiskDenyReason;
use crate::core::types::{Quote, RiskLimits};

pub struct RiskGate {
    limits: RiskLimits,
    halted: bool,
    daily_pnl: i64,
}

impl RiskGate {
    pub fn new(limits: RiskLimits) -> Self {
        Self {
            limits,
            halted: false,
            daily_pnl: 0,
        }
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn daily_pnl(&self) -> i64 {
        self.daily_pnl
    }

    /// Admission check for a two-sided quote about to be sent to the
    /// exchange. `net_exposure`/`total_exposure` are the market's and the
    /// book's current exposure *before* this quote is applied.
    pub fn check(&self, quote: &Quote, net_exposure: i64, total_exposure: i64) -> Result<(), RiskDenyReason> {
        if self.halted {
            return Err(RiskDenyReason::Halted);
        }

        if quote.bid_size > 0 && quote.ask_size > 0 {
            let spread = quote.ask_price as i64 - quote.bid_price as i64;
            if spread < self.limits.min_spread as i64 {
                return Err(RiskDenyReason::SpreadBelowMin);
            }
        }

        if quote.bid_size > self.limits.max_order_size {
            return Err(RiskDenyReason::BidSizeAboveMax);
        }
        if quote.ask_size > self.limits.max_order_size {
            return Err(RiskDenyReason::AskSizeAboveMax);
        }

        let projected_long = net_exposure + quote.bid_size as i64;
        let projected_short = net_exposure - quote.ask_size as i64;
        if projected_long.abs() > self.limits.max_position_per_market
            || projected_short.abs() > self.limits.max_position_per_market
        {
            return Err(RiskDenyReason::PositionLimit);
        }

        let worst_case_add = quote.bid_size.max(quote.ask_size) as i64;
        if total_exposure + worst_case_add > self.limits.max_total_exposure {
            return Err(RiskDenyReason::TotalExposureLimit);
        }

        Ok(())
    }

    /// Admission check for a single-sided order (`OrderReconciler::place`
    /// callers that bypass the two-sided quote path).
    pub fn check_order(&self, count: u32, net_exposure: i64, total_exposure: i64) -> Result<(), RiskDenyReason> {
        if self.halted {
            return Err(RiskDenyReason::Halted);
        }
        if count > self.limits.max_order_size {
            return Err(RiskDenyReason::BidSizeAboveMax);
        }
        if (net_exposure + count as i64).abs() > self.limits.max_position_per_market {
            return Err(RiskDenyReason::PositionLimit);
        }
        if total_exposure + count as i64 > self.limits.max_total_exposure {
            return Err(RiskDenyReason::TotalExposureLimit);
        }
        Ok(())
    }

    /// Accumulate a fill's realized P&L and auto-halt on loss-limit breach.
    pub fn on_fill(&mut self, realized_pnl: i64) {
        self.daily_pnl += realized_pnl;
        if self.daily_pnl < -self.limits.max_daily_loss {
            error!(daily_pnl = self.daily_pnl, max_daily_loss = self.limits.max_daily_loss, "daily loss limit breached, halting");
            self.halted = true;
        }
    }

    pub fn halt(&mut self) {
        self.halted = true;
    }

    pub fn resume(&mut self) {
        self.halted = false;
    }

    /// Zero the daily P&L counter. Does NOT clear an active loss-limit halt
    /// — a halt is an operator-visible event that requires an explicit
    /// `resume()`.
    pub fn reset_daily(&mut self) {
        self.daily_pnl = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> RiskLimits {
        RiskLimits {
            max_position_per_market: 100,
            max_total_exposure: 50,
            max_daily_loss: 1000,
            max_order_size: 50,
            min_spread: 1,
        }
    }

    fn quote(bid: u32, bid_size: u32, ask: u32, ask_size: u32) -> Quote {
        Quote {
            bid_price: bid,
            bid_size,
            ask_price: ask,
            ask_size,
        }
    }

    #[test]
    fn scenario_8_total_exposure_denied() {
        let gate = RiskGate::new(limits());
        let result = gate.check(&quote(49, 20, 51, 20), 0, 45);
        assert_eq!(result, Err(RiskDenyReason::TotalExposureLimit));
    }

    #[test]
    fn denies_below_min_spread() {
        let gate = RiskGate::new(limits());
        let result = gate.check(&quote(50, 5, 50, 5), 0, 0);
        assert_eq!(result, Err(RiskDenyReason::SpreadBelowMin));
    }

    #[test]
    fn denies_oversized_order() {
        let gate = RiskGate::new(limits());
        let result = gate.check(&quote(49, 60, 51, 5), 0, 0);
        assert_eq!(result, Err(RiskDenyReason::BidSizeAboveMax));
    }

    #[test]
    fn halts_on_daily_loss_breach() {
        let mut gate = RiskGate::new(limits());
        gate.on_fill(-1500);
        assert!(gate.is_halted());
        assert_eq!(gate.check(&quote(49, 5, 51, 5), 0, 0), Err(RiskDenyReason::Halted));
    }

    #[test]
    fn reset_daily_does_not_clear_halt() {
        let mut gate = RiskGate::new(limits());
        gate.on_fill(-1500);
        gate.reset_daily();
        assert!(gate.is_halted());
        assert_eq!(gate.daily_pnl(), 0);
    }

    #[test]
    fn resume_clears_halt() {
        let mut gate = RiskGate::new(limits());
        gate.halt();
        gate.resume();
        assert!(!gate.is_halted());
    }
}
