//! Property-based tests for scheduling and naming guarantees

mod retry_schedule;
