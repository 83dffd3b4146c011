//! Retry policy for remote attempts.
//!
//! Attempt numbers are 1-based: attempt 1 is the first try and runs without
//! delay; every later attempt waits twice as long as the one before, starting
//! at the base delay (2s, 4s, 8s, 16s with the defaults).

use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BASE_DELAY_MS: u64 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts per item per run, including the first.
    pub max_attempts: u32,
    /// Delay before attempt 2, in milliseconds.
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
        }
    }
}

impl RetryPolicy {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay_ms: u64::try_from(base_delay.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Whether another attempt should follow failed attempt `attempt`.
    pub fn should_retry(&self, attempt: u32, kind: ErrorKind) -> bool {
        kind.is_transient() && attempt < self.max_attempts
    }

    /// Delay to wait before starting attempt `attempt`.
    pub fn delay_before_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exponent = (attempt - 2).min(32);
        let factor = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }

    /// Full delay schedule, one entry per attempt.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..=self.max_attempts)
            .map(|attempt| self.delay_before_attempt(attempt))
            .collect()
    }
}
