//! Error taxonomy shared across the pipeline core and its consumers.
//!
//! `PipelineError` is the structural error type produced by stages and
//! terminals themselves (channel bookkeeping, cancellation, stage panics).
//! `CoreError` is the broader, application-facing taxonomy: it is what
//! `Envelope::Err` is typically filled with by user-supplied transformers,
//! so that downstream code can match on a stable set of categories instead
//! of ad-hoc string errors.

use thiserror::Error;

/// Structural error produced by the pipeline machinery itself.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("operation was cancelled")]
    Cancelled,

    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),

    #[error("{0}")]
    Core(#[from] CoreError),
}

/// Application-facing error taxonomy.
///
/// Transformers, predicates and observers fill `Envelope::Err` with one of
/// these variants (boxed behind [`CoreError`]) so callers can branch on the
/// category without depending on the concrete failure type underneath.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Input shape or value failed validation (e.g. a non-hex checksum).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A unique constraint was violated.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The current state forbids the requested operation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Opening or reading a file failed.
    #[error("failed to read {path}: {source}")]
    ReadFailure {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The governing context was cancelled or its deadline elapsed.
    #[error("cancelled")]
    Cancelled,

    /// A retryable I/O failure (connection reset, refused, timed out).
    #[error("transient failure: {0}")]
    Transient(String),

    /// A worker recovered a panic raised inside a stage callback.
    #[error("worker panicked: {0}")]
    Panic(String),
}

impl CoreError {
    pub fn read_failure(path: impl Into<std::path::PathBuf>, source: std::io::Error) -> Self {
        CoreError::ReadFailure {
            path: path.into(),
            source,
        }
    }
}
