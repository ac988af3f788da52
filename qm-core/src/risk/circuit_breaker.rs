//! `CircuitBreaker` (spec.md §4.7): trips on a pattern of realized-P&L
//! losses rather than the teacher's market-condition anomalies (spread
//! widening, price spikes). Grounded on the teacher's
//! `risk::circuit_breaker::CircuitBreaker` for the
//! `BreakerState`/cooldown-timer shape; the trigger conditions themselves
//! (consecutive losses, rolling-window loss count) are this engine's own
//! per spec.md.

use std::collections::VecDeque;

use tracing::warn;

use crate::core::types::TimestampMs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Normal,
    Halted(HaltReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    ConsecutiveLosses { count: u32 },
    RollingWindowLosses { count: u32, window_ms: i64 },
}

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct CircuitBreakerParams {
    pub max_consecutive_losses: u32,
    pub max_losses_in_window: u32,
    pub window_ms: i64,
    pub cooldown_ms: i64,
}

pub struct CircuitBreaker {
    params: CircuitBreakerParams,
    consecutive_losses: u32,
    recent_losses: VecDeque<TimestampMs>,
    state: BreakerState,
    cooldown_until: Option<TimestampMs>,
}

impl CircuitBreaker {
    pub fn new(params: CircuitBreakerParams) -> Self {
        Self {
            params,
            consecutive_losses: 0,
            recent_losses: VecDeque::new(),
            state: BreakerState::Normal,
            cooldown_until: None,
        }
    }

    pub fn state(&self) -> BreakerState {
        self.state
    }

    /// Observe a fill's realized P&L delta (negative = loss) at `now`.
    /// Auto-clears an expired cooldown before evaluating.
    pub fn on_fill(&mut self, realized_pnl: i64, now: TimestampMs) -> BreakerState {
        self.clear_expired_cooldown(now);

        if realized_pnl < 0 {
            self.consecutive_losses += 1;
            self.recent_losses.push_back(now);
            while let Some(&front) = self.recent_losses.front() {
                if now - front > self.params.window_ms {
                    self.recent_losses.pop_front();
                } else {
                    break;
                }
            }
        } else {
            // A single winning fill resets the consecutive counter but does
            // NOT clear an already-active cooldown.
            self.consecutive_losses = 0;
        }

        if self.cooldown_until.is_none() {
            if self.consecutive_losses >= self.params.max_consecutive_losses {
                self.trip(HaltReason::ConsecutiveLosses { count: self.consecutive_losses }, now);
            } else if self.recent_losses.len() as u32 >= self.params.max_losses_in_window {
                self.trip(
                    HaltReason::RollingWindowLosses {
                        count: self.recent_losses.len() as u32,
                        window_ms: self.params.window_ms,
                    },
                    now,
                );
            }
        }

        self.state
    }

    /// Clear an expired cooldown without observing a fill, so a halted
    /// market resumes quoting even if no fills arrive to drive `on_fill`.
    pub fn refresh(&mut self, now: TimestampMs) -> BreakerState {
        self.clear_expired_cooldown(now);
        self.state
    }

    fn clear_expired_cooldown(&mut self, now: TimestampMs) {
        if let Some(until) = self.cooldown_until {
            if now >= until {
                self.cooldown_until = None;
                self.state = BreakerState::Normal;
            }
        }
    }

    fn trip(&mut self, reason: HaltReason, now: TimestampMs) {
        warn!(?reason, "circuit breaker tripped");
        self.state = BreakerState::Halted(reason);
        self.cooldown_until = Some(now + self.params.cooldown_ms);
    }

    pub fn reset(&mut self) {
        self.consecutive_losses = 0;
        self.recent_losses.clear();
        self.state = BreakerState::Normal;
        self.cooldown_until = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> CircuitBreakerParams {
        CircuitBreakerParams {
            max_consecutive_losses: 5,
            max_losses_in_window: 100,
            window_ms: 60_000,
            cooldown_ms: 10_000,
        }
    }

    #[test]
    fn scenario_6_five_consecutive_losses_trip_and_next_win_does_not_clear_cooldown() {
        let mut cb = CircuitBreaker::new(params());
        for i in 0..5 {
            cb.on_fill(-1, i * 100);
        }
        assert!(matches!(cb.state(), BreakerState::Halted(HaltReason::ConsecutiveLosses { count: 5 })));

        let state = cb.on_fill(10, 500);
        assert!(matches!(state, BreakerState::Halted(_)));
    }

    #[test]
    fn cooldown_clears_after_elapsed() {
        let mut cb = CircuitBreaker::new(params());
        for i in 0..5 {
            cb.on_fill(-1, i * 100);
        }
        assert!(matches!(cb.state(), BreakerState::Halted(_)));
        // cooldown tripped at t=400, cooldown_ms=10_000 -> clears at >= 10_400
        let state = cb.on_fill(10, 20_000);
        assert_eq!(state, BreakerState::Normal);
    }

    #[test]
    fn winning_fill_resets_consecutive_counter() {
        let mut cb = CircuitBreaker::new(params());
        cb.on_fill(-1, 0);
        cb.on_fill(-1, 1);
        cb.on_fill(10, 2);
        cb.on_fill(-1, 3);
        cb.on_fill(-1, 4);
        assert_eq!(cb.state(), BreakerState::Normal);
    }

    #[test]
    fn rolling_window_trigger() {
        let mut cb = CircuitBreaker::new(CircuitBreakerParams {
            max_consecutive_losses: 100,
            max_losses_in_window: 3,
            window_ms: 1_000,
            cooldown_ms: 5_000,
        });
        cb.on_fill(10, 0); // win resets consecutive, window tracks losses only
        cb.on_fill(-1, 100);
        cb.on_fill(10, 200);
        cb.on_fill(-1, 300);
        let state = cb.on_fill(-1, 400);
        assert!(matches!(state, BreakerState::Halted(HaltReason::RollingWindowLosses { count: 3, .. })));
    }

    #[test]
    fn reset_clears_all_state() {
        let mut cb = CircuitBreaker::new(params());
        for i in 0..5 {
            cb.on_fill(-1, i * 100);
        }
        cb.reset();
        assert_eq!(cb.state(), BreakerState::Normal);
    }
}
