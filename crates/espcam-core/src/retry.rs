//! Reconnect policy for the WiFi association handler

use core::time::Duration;

use rand_core::RngCore;

/// Policy applied after every station disconnect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    /// Reconnect immediately, forever
    #[default]
    Unbounded,
    /// Reconnect with exponential backoff until `max_attempts` is reached
    Bounded(Backoff),
}

/// Bounded retry parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Total connect attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Bounded policy with the given limits
    pub const fn bounded(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self::Bounded(Backoff {
            max_attempts,
            base_delay,
            max_delay,
        })
    }

    /// Delay to wait before connect attempt number `attempt` (1-based).
    ///
    /// Returns `None` once the policy forbids the attempt. The first attempt
    /// is never delayed.
    pub fn delay_before<R: RngCore + ?Sized>(&self, attempt: u32, rng: &mut R) -> Option<Duration> {
        match self {
            Self::Unbounded => Some(Duration::ZERO),
            Self::Bounded(backoff) => backoff.delay_before(attempt, rng),
        }
    }
}

impl Backoff {
    fn delay_before<R: RngCore + ?Sized>(&self, attempt: u32, rng: &mut R) -> Option<Duration> {
        if attempt > self.max_attempts {
            return None;
        }
        if attempt <= 1 {
            return Some(Duration::ZERO);
        }

        let exponent = (attempt - 2).min(31);
        let base_ms = duration_ms(self.base_delay);
        let max_ms = duration_ms(self.max_delay);
        let delay_ms = base_ms.saturating_mul(1u64 << exponent).min(max_ms);

        // Equal jitter: half of the delay is fixed, the other half is random
        let half = delay_ms / 2;
        let spread = delay_ms - half;
        let random = if spread == 0 {
            0
        } else {
            rng.next_u64() % (spread + 1)
        };

        Some(Duration::from_millis(half + random))
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
