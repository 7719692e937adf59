//! Buffer pool errors.

use thiserror::Error;

use crate::disk::DiskError;

/// Result type for buffer pool operations.
pub type BufferResult<T> = Result<T, BufferError>;

/// Errors that can occur during buffer pool operations.
#[derive(Debug, Error)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum BufferError {
    /// Every frame is pinned; no victim can be chosen.
    #[error("buffer pool exhausted, all frames are pinned")]
    PoolExhausted,

    /// I/O failure while reading or writing a page.
    #[error("disk I/O failed: {0}")]
    Disk(#[from] DiskError),

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl BufferError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns true if this is a transient error that can be retried once
    /// pins are released.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::PoolExhausted)
    }
}
