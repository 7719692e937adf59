//! Extendible hash index for the cairn storage core.
//!
//! The hash table keeps all persistent state inside buffer-pool pages: one
//! directory page mapping hashed keys to buckets, and one page per bucket.
//! A bucket that overflows is split; when the split needs more addressing
//! bits, the directory doubles by incrementing its global depth.
//!
//! The table supports multiple values per key; exact (key, value) duplicates
//! are rejected.

mod error;
mod table;

pub use error::{HashTableError, HashTableResult};
pub use table::ExtendibleHashTable;
