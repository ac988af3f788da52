//! `DrawdownManager` (spec.md §4.6): tracks peak P&L and exposes a
//! `position_multiplier` that linearly scales quote sizes down as the
//! current drawdown from peak widens. Grounded on the teacher's
//! `risk::RiskManager` drawdown-percentage halt, generalized from a
//! single halt threshold into the three-point linear schedule spec.md
//! calls for.

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct DrawdownParams {
    /// Drawdown (in cents) below which the multiplier stays at 1.0.
    pub scale_down_start: i64,
    /// Drawdown at which the multiplier reaches 0.5.
    pub half_size_drawdown: i64,
    /// Drawdown at which the multiplier reaches 0.0 (quoting suppressed).
    pub halt_drawdown: i64,
}

pub struct DrawdownManager {
    params: DrawdownParams,
    peak_pnl: i64,
}

impl DrawdownManager {
    pub fn new(params: DrawdownParams) -> Self {
        Self { params, peak_pnl: 0 }
    }

    pub fn record_pnl(&mut self, current_pnl: i64) {
        self.peak_pnl = self.peak_pnl.max(current_pnl);
    }

    pub fn drawdown(&self, current_pnl: i64) -> i64 {
        (self.peak_pnl - current_pnl).max(0)
    }

    /// Linear schedule: 1.0 up to `scale_down_start`, down to 0.5 at
    /// `half_size_drawdown`, down to 0.0 at `halt_drawdown`.
    pub fn position_multiplier(&self, current_pnl: i64) -> f64 {
        let dd = self.drawdown(current_pnl) as f64;
        let start = self.params.scale_down_start as f64;
        let half = self.params.half_size_drawdown as f64;
        let halt = self.params.halt_drawdown as f64;

        if dd <= start {
            1.0
        } else if dd <= half {
            let span = (half - start).max(1.0);
            1.0 - 0.5 * (dd - start) / span
        } else if dd <= halt {
            let span = (halt - half).max(1.0);
            0.5 - 0.5 * (dd - half) / span
        } else {
            0.0
        }
    }

    /// Scale a non-zero size by the current multiplier, flooring with a
    /// `max(1, ...)` guard so a non-zero side never rounds down to zero
    /// from scaling alone; zero sides are never upgraded.
    pub fn scale_size(&self, size: u32, current_pnl: i64) -> u32 {
        if size == 0 {
            return 0;
        }
        let m = self.position_multiplier(current_pnl);
        if m <= 0.0 {
            return 0;
        }
        ((size as f64 * m).floor() as u32).max(1)
    }
}
