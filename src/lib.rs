//! Canvass: resumable two-phase question batches
//!
//! Drives a subject × domain cross-product of lookups against a remote
//! answering service. Every settled answer is cached so interrupted or
//! repeated runs never ask the same question twice; transient failures are
//! retried with bounded exponential backoff and concurrency is bounded per
//! domain. Phase 2 (assessment) consumes the successful output of phase 1
//! (collection).

pub mod batch;
pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod dispatch;
pub mod error;
pub mod export;
pub mod logging;
pub mod provider;
pub mod questions;
pub mod report;
pub mod retry;
pub mod types;
pub mod validation;
pub mod workflow;
