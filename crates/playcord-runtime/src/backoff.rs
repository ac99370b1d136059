use std::time::Duration;

use playcord_core::config::{BackoffStrategy, ReconnectConfig};

/// Delay before each automatic reconnect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffPolicy {
    /// Same delay before every attempt.
    Fixed { delay: Duration },
    /// `base * 2^(attempt - 1)`, capped at `max`.
    Exponential { base: Duration, max: Duration },
}

impl BackoffPolicy {
    pub fn from_config(cfg: &ReconnectConfig) -> Self {
        let delay = Duration::from_secs(cfg.delay_secs);
        match cfg.strategy {
            BackoffStrategy::Fixed => Self::Fixed { delay },
            BackoffStrategy::Exponential => Self::Exponential {
                base: delay,
                max: Duration::from_secs(cfg.max_delay_secs).max(delay),
            },
        }
    }

    /// Delay before the given 1-based attempt.
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Self::Fixed { delay } => delay,
            Self::Exponential { base, max } => {
                let exp = attempt.saturating_sub(1).min(31);
                base.checked_mul(1u32 << exp).unwrap_or(max).min(max)
            }
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::Fixed {
            delay: Duration::from_secs(5),
        }
    }
}
