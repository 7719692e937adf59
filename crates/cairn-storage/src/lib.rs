//! # cairn-storage
//!
//! Storage core of the cairn database engine.
//!
//! This crate implements the page-level storage and access layer:
//!
//! - a fixed-size **buffer pool** mapping logical page IDs onto a bounded set
//!   of in-memory frames, with pin/dirty accounting and an
//!   oldest-unpinned-first eviction policy
//! - a **parallel buffer pool** that shards page IDs across independent
//!   instances by residue class and round-robins allocations
//! - an **extendible hash index** whose directory and bucket pages live
//!   entirely inside buffer-pool pages

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Buffer pool: frames, replacer, pool instances, parallel pool
pub mod buffer;

/// Disk manager: blocking page reader/writer
pub mod disk;

/// Extendible hash table
pub mod hash;

/// In-page layouts for hash directory and bucket pages
pub mod page;
