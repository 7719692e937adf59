//! Hash table errors.

use thiserror::Error;

use crate::buffer::BufferError;

/// Result type for hash table operations.
pub type HashTableResult<T> = Result<T, HashTableError>;

/// Errors that can occur during hash table operations.
#[derive(Debug, Error)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum HashTableError {
    /// The directory cannot double past its maximum depth.
    #[error("hash directory is at its maximum depth {global_depth}")]
    DirectoryFull { global_depth: u32 },

    /// An entry could not be re-homed after a bucket split.
    #[error("reinsert failed after bucket split")]
    SplitReinsert,

    /// The buffer pool failed underneath the table.
    #[error("buffer pool error: {0}")]
    Buffer(#[from] BufferError),
}

impl HashTableError {
    /// Returns true if the error leaves the table in an unusable state.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DirectoryFull { .. } | Self::SplitReinsert)
    }
}
