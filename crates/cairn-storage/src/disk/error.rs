//! I/O error types for the disk module.

use std::io;
use std::path::PathBuf;

use cairn_common::types::PageId;
use thiserror::Error;

/// Result type for disk operations.
pub type DiskResult<T> = Result<T, DiskError>;

/// Errors that can occur during disk I/O operations.
#[derive(Debug, Error)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum DiskError {
    /// Standard I/O error.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Failed to open the backing file.
    #[error("cannot open data file {path}: {source}")]
    Open { path: PathBuf, source: io::Error },

    /// A page ID outside the writable range was supplied.
    #[error("invalid page ID: {page_id}")]
    InvalidPageId { page_id: PageId },

    /// A buffer of the wrong length was supplied.
    #[error("page buffer has {actual} bytes, expected {expected}")]
    BadBufferLength { expected: usize, actual: usize },
}

impl DiskError {
    /// Creates an open error with path context.
    pub fn open(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }
}
