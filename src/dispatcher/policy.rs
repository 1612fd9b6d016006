use std::num::{NonZeroU32, NonZeroUsize};
use std::time::Duration;

/// Delay inserted after a failed attempt, before the next one for the same
/// recipient. Both variants are non-decreasing in the attempt number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// `base * 2^(attempt - 1)`: 1s, 2s, 4s, ... for a one second base.
    Exponential { base: Duration },
    /// `step * attempt`: 500ms, 1000ms, ... for a 500ms step.
    Linear { step: Duration },
}

impl Backoff {
    /// `attempt` is the 1-based number of the attempt that just failed.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        match *self {
            Self::Exponential { base } => base.saturating_mul(2u32.saturating_pow(attempt - 1)),
            Self::Linear { step } => step.saturating_mul(attempt),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct RetryPolicy {
    pub max_attempts: NonZeroU32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Three attempts, exponential backoff from one second.
    pub const fn conservative() -> Self {
        Self {
            max_attempts: NonZeroU32::MIN.saturating_add(2),
            backoff: Backoff::Exponential {
                base: Duration::from_secs(1),
            },
        }
    }

    /// Two attempts, linear backoff in 500ms steps.
    pub const fn fast() -> Self {
        Self {
            max_attempts: NonZeroU32::MIN.saturating_add(1),
            backoff: Backoff::Linear {
                step: Duration::from_millis(500),
            },
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::conservative()
    }
}

/// How recipients of one dispatch are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanOut {
    /// One recipient at a time, pausing after each recipient's attempts.
    Sequential { pause: Duration },
    /// Up to `limit` recipients in flight, each pausing after its attempts.
    Concurrent { limit: NonZeroUsize, pause: Duration },
}

impl Default for FanOut {
    fn default() -> Self {
        Self::Sequential {
            pause: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[must_use]
pub struct DispatchConfig {
    pub retry: RetryPolicy,
    pub fan_out: FanOut,
}
