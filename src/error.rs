//! Structured error taxonomy for the batch engine.
//!
//! Item-level failures are deliberately absent from this enum: a single
//! item's failure is folded into a `LogRecord` with `Error` status by the
//! item processor and never crosses a component boundary. The variants here
//! are the errors that abort a chunk or prevent a job from starting.

/// Errors that abort the current chunk or reject a job start.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// Required input is missing or malformed; the job never starts.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Checkpoint persistence failed; the chunk aborts and the next
    /// continuation retries from the last persisted cursor.
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// Destination container could not be resolved even after the
    /// re-resolve-by-name recovery path.
    #[error("Destination error: {0}")]
    Destination(String),

    /// Continuation scheduling failed.
    #[error("Trigger error: {0}")]
    Trigger(String),
}

pub type Result<T> = std::result::Result<T, BatchError>;
