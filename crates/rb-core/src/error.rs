//! # AppError
//!
//! Centralized error handling for the posting engine.
//! Every failure of a transaction is reported synchronously; nothing is retried here.

use thiserror::Error;

/// The primary error type for all rb-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (board, thread or dat). A purged dat and a thread
    /// that never existed look the same.
    #[error("{0} not found with key {1}")]
    NotFound(&'static str, String),

    /// Another thread was already created in the same second.
    #[error("thread key {0} is duplicate")]
    DuplicateThread(String),

    /// The board already holds its configured number of threads.
    #[error("{0}: no more threads can be created on this board")]
    ThreadLimitExceeded(usize),

    /// The board's write counter reached the per-period limit.
    #[error("{0}: write limit reached for this period")]
    DailyWriteLimitExceeded(u32),

    /// The dat already holds its configured number of wire bytes.
    #[error("dat is full ({0} bytes)")]
    DatCapacityExceeded(usize),

    /// Board and dat documents have diverged.
    #[error("inconsistent state: {0}")]
    InconsistentState(String),

    /// The store refused the commit because a document changed underneath.
    #[error("transaction conflict")]
    TransactionConflict,

    /// Range header not of the form `bytes=<digits>-`.
    #[error("malformed range: {0}")]
    MalformedRange(String),

    /// Resource already exists (e.g., duplicate board name)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Infrastructure failure (e.g., DB down)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl AppError {
    /// True when the caller may run the same operation again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::TransactionConflict)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(format!("{err:#}"))
    }
}

/// A specialized Result type for posting engine logic.
pub type Result<T> = std::result::Result<T, AppError>;
