//! Error types for the canvass batch engine.
//!
//! Errors are layered the same way the engine is: item-level failures
//! ([`AnswerError`]) stay inside the dispatcher, store failures
//! ([`CacheError`]) and domain failures ([`DomainError`]) stop one domain,
//! and nothing crosses the batch coordinator.

use crate::types::WorkKey;
use std::path::PathBuf;
use thiserror::Error;

/// Answer cache errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to open answer cache at {path}: {message}")]
    Open { path: PathBuf, message: String },

    #[error("Answer cache I/O error: {0}")]
    Io(String),

    #[error("Corrupted cache record for {key}: {message}")]
    Corrupted { key: String, message: String },

    #[error("Answer already cached for {0}")]
    Conflict(WorkKey),
}

impl From<sled::Error> for CacheError {
    fn from(err: sled::Error) -> Self {
        CacheError::Io(err.to_string())
    }
}

/// Classification of a failed remote attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Timeout,
    RateLimited,
    Malformed,
    ServiceError,
    Validation,
}

impl ErrorKind {
    /// Transient kinds may succeed on a later attempt.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            ErrorKind::Timeout | ErrorKind::RateLimited | ErrorKind::ServiceError
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Malformed => "malformed",
            ErrorKind::ServiceError => "service_error",
            ErrorKind::Validation => "validation",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of one attempt against the answering service, or of validating its answer.
#[derive(Debug, Clone, Error)]
pub enum AnswerError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Malformed request: {0}")]
    Malformed(String),

    #[error("Answering service error: {0}")]
    ServiceError(String),

    #[error("Answer failed validation: {0}")]
    Validation(String),
}

impl AnswerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnswerError::Timeout(_) => ErrorKind::Timeout,
            AnswerError::RateLimited(_) => ErrorKind::RateLimited,
            AnswerError::Malformed(_) => ErrorKind::Malformed,
            AnswerError::ServiceError(_) => ErrorKind::ServiceError,
            AnswerError::Validation(_) => ErrorKind::Validation,
        }
    }
}

/// Errors that stop a dispatch run before every item settles.
///
/// Item failures are never reported here; they are part of the dispatch report.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Dispatcher worker aborted: {0}")]
    WorkerAborted(String),
}

/// Export errors
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write export {path}: {message}")]
    Write { path: PathBuf, message: String },
}

/// Errors that end one domain's run. Recorded in its summary, never propagated further.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Domain name {0:?} has no usable characters")]
    InvalidDomain(String),

    #[error("Cannot create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Workflow step out of order: expected {expected}, workflow is {actual}")]
    InvalidTransition {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Domain run cancelled before all items settled")]
    Cancelled,
}

impl DomainError {
    /// Short stable label recorded in a failed domain summary.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::InvalidDomain(_) => "invalid_domain",
            DomainError::OutputDir { .. } => "output_dir",
            DomainError::Cache(err) | DomainError::Dispatch(DispatchError::Cache(err)) => {
                match err {
                    CacheError::Conflict(_) => "cache_conflict",
                    CacheError::Corrupted { .. } => "cache_corrupted",
                    CacheError::Open { .. } | CacheError::Io(_) => "cache_io",
                }
            }
            DomainError::Dispatch(DispatchError::WorkerAborted(_)) => "worker_aborted",
            DomainError::Export(_) => "export",
            DomainError::InvalidTransition { .. } => "invalid_transition",
            DomainError::Cancelled => "cancelled",
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },
}

/// Errors surfaced by CLI commands before or around a batch run.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Cannot create answering service client: {0}")]
    Provider(#[from] AnswerError),

    #[error("Failed to render output: {0}")]
    Output(String),

    #[error("{0}")]
    Usage(String),
}
