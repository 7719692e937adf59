//! Buffer pool manager for the cairn storage core.
//!
//! The buffer pool manages a fixed-size pool of in-memory page frames,
//! mediating all disk I/O:
//!
//! - **Page Caching**: keep resident pages in frames, mapped by a page table
//! - **Pin/Unpin**: explicit reference counting for safe concurrent access
//! - **Dirty Tracking**: modified pages are written back before frame reuse
//! - **Eviction Policy**: oldest-unpinned-first replacement
//! - **Sharding**: a parallel pool routes page IDs across instances by
//!   residue class
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │              BufferPoolInstance               │
//! │  ┌─────────────────────────────────────────┐  │
//! │  │   Page Table: HashMap<PageId, FrameId>  │  │
//! │  └─────────────────────────────────────────┘  │
//! │                      │                        │
//! │                      ▼                        │
//! │  ┌─────────────────────────────────────────┐  │
//! │  │              Frame Array                │  │
//! │  │  page_id / pin_count / dirty / data[]   │  │
//! │  └─────────────────────────────────────────┘  │
//! │        │                        │             │
//! │        ▼                        ▼             │
//! │  ┌───────────┐          ┌──────────────┐      │
//! │  │ Free List │          │ LruReplacer  │      │
//! │  └───────────┘          └──────────────┘      │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! Callers fetch or create pages, read and write the returned
//! [`PageHandle`]'s bytes while the page is pinned, and then release the pin
//! with [`BufferPool::unpin_page`], declaring whether they dirtied the page.

mod config;
mod error;
mod frame;
mod handle;
mod instance;
mod parallel;
mod replacer;

pub use config::BufferPoolConfig;
pub use error::{BufferError, BufferResult};
pub use frame::Frame;
pub use handle::PageHandle;
pub use instance::BufferPoolInstance;
pub use parallel::ParallelBufferPool;
pub use replacer::{LruReplacer, Replacer};

use cairn_common::types::PageId;

/// The buffer-pool capability consumed by page-backed structures.
///
/// Implemented both by a standalone [`BufferPoolInstance`] and by the
/// sharded [`ParallelBufferPool`].
pub trait BufferPool: Send + Sync {
    /// Allocates a fresh page and pins it (`pin_count = 1`).
    ///
    /// The page's bytes are zeroed. Fails with
    /// [`BufferError::PoolExhausted`] when every frame is pinned.
    fn new_page(&self) -> BufferResult<PageHandle>;

    /// Pins the given page, reading it from disk if it is not resident.
    fn fetch_page(&self, page_id: PageId) -> BufferResult<PageHandle>;

    /// Releases one pin on the page, OR-ing `is_dirty` into its dirty bit.
    ///
    /// Returns `false` if the page is not resident or was not pinned.
    fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool;

    /// Writes the page through to disk if it is dirty, clearing the dirty
    /// bit. Returns `false` if the page is not resident.
    fn flush_page(&self, page_id: PageId) -> BufferResult<bool>;

    /// Writes every resident dirty page through to disk.
    fn flush_all_pages(&self) -> BufferResult<()>;

    /// Drops the page from the pool, returning its frame to the free list.
    ///
    /// Returns `true` if the page is not resident, `false` if it is pinned.
    fn delete_page(&self, page_id: PageId) -> BufferResult<bool>;

    /// Total number of frames managed by this pool.
    fn pool_size(&self) -> usize;
}

/// Statistics for buffer pool monitoring.
#[derive(Debug, Clone, Default)]
pub struct BufferPoolStats {
    /// Total number of page fetches.
    pub fetches: u64,
    /// Number of fetches served from a resident frame.
    pub hits: u64,
    /// Number of fetches that required a disk read.
    pub misses: u64,
    /// Number of pages evicted to make room.
    pub evictions: u64,
    /// Number of dirty pages written back.
    pub flushes: u64,
}

impl BufferPoolStats {
    /// Returns the cache hit ratio (0.0 to 1.0).
    pub fn hit_ratio(&self) -> f64 {
        if self.fetches == 0 {
            0.0
        } else {
            self.hits as f64 / self.fetches as f64
        }
    }

    /// Merges another snapshot into this one (used by the parallel pool).
    pub fn merge(&mut self, other: &BufferPoolStats) {
        self.fetches += other.fetches;
        self.hits += other.hits;
        self.misses += other.misses;
        self.evictions += other.evictions;
        self.flushes += other.flushes;
    }
}
