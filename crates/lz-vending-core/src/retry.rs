//! Bounded retry and polling schedules.
//!
//! Every loop in the saga (create-account polling, role assumption, stack event
//! polling, policy write conflicts) is driven by a [`RetryPolicy`]: it keeps going
//! while the observed state is transitional and gives up after `max_attempts`.

use std::time::Duration;

/// Growth of the delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay every time.
    Fixed,
    /// Delay multiplied after every attempt, capped at `max_interval`.
    Exponential {
        /// Growth factor.
        multiplier: u32,
        /// Upper bound for a single delay.
        max_interval: Duration,
    },
}

/// How often, and how long, to retry an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the second attempt.
    pub interval: Duration,
    /// Total attempts allowed, including the first.
    pub max_attempts: u32,
    /// Delay growth.
    pub backoff: Backoff,
}

/// Create-account status polling: every 10s for up to an hour.
pub const CREATE_ACCOUNT_POLL: RetryPolicy = RetryPolicy::fixed(Duration::from_secs(10), 360);

/// Role assumption in a fresh account: every 10s for up to 15 minutes.
pub const ASSUME_ROLE_RETRY: RetryPolicy = RetryPolicy::fixed(Duration::from_secs(10), 90);

/// Stack event polling: every 15s for up to two hours.
pub const STACK_EVENT_POLL: RetryPolicy = RetryPolicy::fixed(Duration::from_secs(15), 480);

/// Trust policy write conflicts: 1s doubling to 30s, five attempts.
pub const POLICY_CONFLICT_RETRY: RetryPolicy =
    RetryPolicy::exponential(Duration::from_secs(1), 2, Duration::from_secs(30), 5);

impl RetryPolicy {
    /// A fixed-interval schedule.
    #[must_use]
    pub const fn fixed(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
            backoff: Backoff::Fixed,
        }
    }

    /// An exponential schedule.
    #[must_use]
    pub const fn exponential(
        initial: Duration,
        multiplier: u32,
        max_interval: Duration,
        max_attempts: u32,
    ) -> Self {
        Self {
            interval: initial,
            max_attempts,
            backoff: Backoff::Exponential {
                multiplier,
                max_interval,
            },
        }
    }

    /// Replace the attempt budget.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Replace the base interval.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Delay to wait after attempt number `attempt` (1-based) before the next one.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.interval,
            Backoff::Exponential {
                multiplier,
                max_interval,
            } => {
                let factor = multiplier.saturating_pow(attempt.saturating_sub(1));
                self.interval.saturating_mul(factor).min(max_interval)
            }
        }
    }

    /// Whether another attempt may follow attempt number `attempt`.
    #[must_use]
    pub const fn allows_after(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}
