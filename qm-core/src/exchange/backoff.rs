//! Exponential backoff for feed reconnection. Lifted near-verbatim from
//! the teacher's `resilience::backoff::ExponentialBackoff`.

use rand::Rng;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BackoffConfig {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub max_retries: Option<usize>,
    pub jitter_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            max_retries: None,
            jitter_factor: 0.1,
        }
    }
}

pub struct ExponentialBackoff {
    config: BackoffConfig,
    current_attempt: usize,
    current_delay: Duration,
}

impl ExponentialBackoff {
    pub fn with_config(config: BackoffConfig) -> Self {
        Self {
            current_delay: config.initial_delay,
            current_attempt: 0,
            config,
        }
    }

    pub fn next_delay(&mut self) -> Option<Duration> {
        if let Some(max_retries) = self.config.max_retries {
            if self.current_attempt >= max_retries {
                return None;
            }
        }

        let delay = self.calculate_delay_with_jitter();
        self.current_attempt += 1;
        self.current_delay = std::cmp::min(
            Duration::from_secs_f64(self.current_delay.as_secs_f64() * self.config.multiplier),
            self.config.max_delay,
        );
        Some(delay)
    }

    fn calculate_delay_with_jitter(&self) -> Duration {
        if self.config.jitter_factor == 0.0 {
            return self.current_delay;
        }
        let mut rng = rand::thread_rng();
        let jitter = rng.gen::<f64>() * self.config.jitter_factor;
        let jitter_multiplier = 1.0 + (jitter - self.config.jitter_factor / 2.0);
        Duration::from_secs_f64(self.current_delay.as_secs_f64() * jitter_multiplier)
    }

    pub fn reset(&mut self) {
        self.current_attempt = 0;
        self.current_delay = self.config.initial_delay;
    }

    pub fn attempt_number(&self) -> usize {
        self.current_attempt
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::with_config(BackoffConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_and_caps() {
        let mut backoff = ExponentialBackoff::with_config(BackoffConfig {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
            multiplier: 2.0,
            max_retries: Some(20),
            jitter_factor: 0.0,
        });
        let mut last = Duration::from_secs(0);
        for _ in 0..10 {
            let d = backoff.next_delay().unwrap();
            assert!(d <= Duration::from_millis(100));
            last = d;
        }
        assert!(last >= Duration::from_millis(80));
    }

    #[test]
    fn reset_returns_to_initial_delay() {
        let mut backoff = ExponentialBackoff::with_config(BackoffConfig {
            jitter_factor: 0.0,
            ..BackoffConfig::default()
        });
        backoff.next_delay();
        backoff.next_delay();
        assert_eq!(backoff.attempt_number(), 2);
        backoff.reset();
        assert_eq!(backoff.attempt_number(), 0);
    }
}
