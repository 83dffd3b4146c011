//! Property-based tests for the retry schedule

use canvass::error::ErrorKind;
use canvass::retry::RetryPolicy;
use proptest::prelude::*;
use std::time::Duration;

proptest! {
    /// Each wait doubles the previous one after the first retry.
    #[test]
    fn test_delays_double(max_attempts in 2u32..12, base_ms in 1u64..10_000) {
        let policy = RetryPolicy::new(max_attempts, Duration::from_millis(base_ms));
        let schedule = policy.schedule();

        prop_assert_eq!(schedule.len(), max_attempts as usize);
        prop_assert_eq!(schedule[0], Duration::ZERO);
        prop_assert_eq!(schedule[1], Duration::from_millis(base_ms));
        for pair in schedule[1..].windows(2) {
            prop_assert_eq!(pair[1], pair[0] * 2);
        }
    }

    /// Transient failures are retried exactly until the attempt cap.
    #[test]
    fn test_retry_stops_at_cap(max_attempts in 1u32..20, attempt in 1u32..25) {
        let policy = RetryPolicy::new(max_attempts, Duration::from_millis(10));
        prop_assert_eq!(
            policy.should_retry(attempt, ErrorKind::Timeout),
            attempt < max_attempts
        );
        prop_assert!(!policy.should_retry(attempt, ErrorKind::Malformed));
        prop_assert!(!policy.should_retry(attempt, ErrorKind::Validation));
    }

    /// Large attempt numbers saturate instead of overflowing.
    #[test]
    fn test_delay_never_panics(attempt in any::<u32>(), base_ms in any::<u64>()) {
        let policy = RetryPolicy::new(u32::MAX, Duration::from_millis(base_ms));
        let _ = policy.delay_before_attempt(attempt);
    }
}
