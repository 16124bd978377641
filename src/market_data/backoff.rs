use std::time::Duration;

use rand::Rng;

/// Fraction of the delay added as random jitter so a fleet of clients does
/// not reconnect in lockstep.
const JITTER_FRACTION: f64 = 0.1;

/// Exponential reconnect backoff: `min(cap, base * 2^attempt)` plus jitter.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    base: Duration,
    cap: Duration,
    attempt: u32,
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(60))
    }
}

impl ReconnectBackoff {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self {
            base,
            cap,
            attempt: 0,
        }
    }

    /// Delay to sleep before the next attempt; advances the attempt counter.
    pub fn next_delay(&mut self) -> Duration {
        let exp = self.base.saturating_mul(2u32.saturating_pow(self.attempt));
        let capped = exp.min(self.cap);
        self.attempt = self.attempt.saturating_add(1);

        let jitter_range = capped.as_secs_f64() * JITTER_FRACTION;
        let jitter = if jitter_range > 0.0 {
            rand::thread_rng().gen_range(0.0..=jitter_range)
        } else {
            0.0
        };
        capped + Duration::from_secs_f64(jitter)
    }

    /// Call once a session reaches a healthy state again.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_within_jitter(delay: Duration, expected_secs: f64) {
        let secs = delay.as_secs_f64();
        assert!(
            secs >= expected_secs && secs <= expected_secs * (1.0 + JITTER_FRACTION) + 1e-9,
            "delay {secs}s outside [{expected_secs}, {}]",
            expected_secs * (1.0 + JITTER_FRACTION)
        );
    }

    #[test]
    fn delay_doubles_per_attempt() {
        let mut backoff = ReconnectBackoff::new(Duration::from_secs(1), Duration::from_secs(60));
        assert_within_jitter(backoff.next_delay(), 1.0);
        assert_within_jitter(backoff.next_delay(), 2.0);
        assert_within_jitter(backoff.next_delay(), 4.0);
        assert_within_jitter(backoff.next_delay(), 8.0);
    }

    #[test]
    fn delay_is_capped() {
        let mut backoff = ReconnectBackoff::new(Duration::from_secs(1), Duration::from_secs(10));
        for _ in 0..8 {
            backoff.next_delay();
        }
        assert_within_jitter(backoff.next_delay(), 10.0);
    }

    #[test]
    fn reset_starts_the_ladder_over() {
        let mut backoff = ReconnectBackoff::default();
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_within_jitter(backoff.next_delay(), 1.0);
    }
}
