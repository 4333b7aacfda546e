//! Automatic reconnect policy
//!
//! Delays come from `tokio-retry` strategies so fixed and exponential backoff
//! share one code path. The attempt cap is applied with `take()`, so asking for
//! an attempt past the cap yields `None` and the caller stops retrying.

use std::time::Duration;

use tokio_retry::strategy::{ExponentialBackoff, FixedInterval};

/// Default delay before an automatic reconnect (3 seconds)
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Default number of automatic reconnect attempts
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default ceiling for exponential backoff (30 seconds)
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Shape of the delay sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every attempt
    Fixed,
    /// Delay doubles per attempt, capped at `max_delay`
    Exponential { max_delay: Duration },
}

impl std::str::FromStr for Backoff {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "exponential" => Ok(Self::Exponential {
                max_delay: DEFAULT_MAX_BACKOFF,
            }),
            _ => Err(format!("Invalid backoff: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RECONNECT_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Backoff::Fixed,
        }
    }
}

impl ReconnectPolicy {
    /// Delay sequence, one entry per permitted attempt
    pub fn delays(&self) -> Box<dyn Iterator<Item = Duration> + Send> {
        let base_ms = self.delay.as_millis().max(1) as u64;
        let attempts = self.max_attempts as usize;
        match self.backoff {
            Backoff::Fixed => Box::new(FixedInterval::from_millis(base_ms).take(attempts)),
            // ExponentialBackoff raises `base` to the attempt number; base 2 with
            // a `base_ms / 2` factor gives base_ms, 2*base_ms, 4*base_ms, ...
            Backoff::Exponential { max_delay } => Box::new(
                ExponentialBackoff::from_millis(2)
                    .factor((base_ms / 2).max(1))
                    .max_delay(max_delay)
                    .take(attempts),
            ),
        }
    }

    /// Delay before the given attempt (1-based), `None` once the cap is exceeded
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 {
            return None;
        }
        self.delays().nth(attempt as usize - 1)
    }
}
