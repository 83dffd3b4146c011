//! Answer Cache
//!
//! Durable key→record store holding every settled SUCCESS answer. One store
//! exists per domain per phase; a key present in the store is never asked again
//! unless a forced re-run overwrites it.

pub mod persistence;

pub use persistence::SledAnswerCache;

use crate::error::CacheError;
use crate::types::{AnswerRecord, Phase, WorkKey};

/// How `put` treats a key that already has a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Fail with [`CacheError::Conflict`] if the key exists.
    CreateOnly,
    /// Replace an existing record (forced re-run).
    Overwrite,
}

/// Answer cache interface
///
/// Implementations must tolerate concurrent `lookup`/`put` on distinct keys.
/// Concurrent `put` on the same key is never issued by the dispatcher.
pub trait AnswerCache: Send + Sync {
    fn lookup(&self, key: &WorkKey) -> Result<Option<AnswerRecord>, CacheError>;

    /// Commit a record under its own key.
    fn put(&self, record: &AnswerRecord, mode: WriteMode) -> Result<(), CacheError>;

    /// Number of records stored for a phase.
    fn count(&self, phase: Phase) -> Result<usize, CacheError>;

    /// All records stored for a phase, ordered by key.
    fn records(&self, phase: Phase) -> Result<Vec<AnswerRecord>, CacheError>;
}
