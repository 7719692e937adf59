//! Single buffer-pool instance.
//!
//! An instance owns a fixed array of frames and mediates every disk access
//! for the pages it caches. One coarse mutex protects the bookkeeping (page
//! table, free list, replacer, page-ID counter); frame metadata and page
//! bytes are reached through the frames themselves, so callers never hold
//! the pool mutex while working with page data.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cairn_common::types::{FrameId, PageId};
use parking_lot::Mutex;

use super::error::{BufferError, BufferResult};
use super::frame::Frame;
use super::handle::PageHandle;
use super::replacer::{LruReplacer, Replacer};
use super::{BufferPool, BufferPoolStats};
use crate::disk::DiskManager;

/// Bookkeeping shared under the instance mutex.
struct InstanceState {
    /// Maps resident page IDs to their frames.
    page_table: HashMap<PageId, FrameId>,
    /// Frames holding no page, reused LIFO.
    free_list: Vec<FrameId>,
    /// Eviction candidates among resident, unpinned frames.
    replacer: LruReplacer,
    /// Next page ID this instance will mint.
    next_page_id: i32,
}

/// A fixed-size cache of pages backed by a disk manager.
///
/// In a parallel pool of `num_instances` shards, instance `instance_index`
/// mints exactly the page IDs congruent to its index, so every page has one
/// owning instance for its whole life.
pub struct BufferPoolInstance {
    /// Number of frames in this instance.
    pool_size: usize,
    /// Shard count of the enclosing parallel pool (1 when standalone).
    num_instances: usize,
    /// This instance's shard index.
    instance_index: usize,
    /// The frame array; stable for the pool's lifetime.
    frames: Vec<Arc<Frame>>,
    /// Disk manager performing all reads and write-backs.
    disk: Arc<dyn DiskManager>,
    /// Bookkeeping behind the coarse instance mutex.
    state: Mutex<InstanceState>,
    // Statistics counters.
    fetch_count: AtomicU64,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
    eviction_count: AtomicU64,
    flush_count: AtomicU64,
}

impl BufferPoolInstance {
    /// Creates a standalone instance with `pool_size` frames.
    pub fn new(pool_size: usize, disk: Arc<dyn DiskManager>) -> Self {
        Self::new_sharded(pool_size, 1, 0, disk)
    }

    /// Creates one shard of a parallel pool.
    ///
    /// # Panics
    ///
    /// Panics if `num_instances` is zero, `instance_index` is out of range,
    /// or `pool_size` is zero.
    pub fn new_sharded(
        pool_size: usize,
        num_instances: usize,
        instance_index: usize,
        disk: Arc<dyn DiskManager>,
    ) -> Self {
        assert!(pool_size > 0, "pool_size must be > 0");
        assert!(num_instances > 0, "num_instances must be > 0");
        assert!(
            instance_index < num_instances,
            "instance_index {instance_index} out of range for {num_instances} instances"
        );

        let frames = (0..pool_size)
            .map(|i| Arc::new(Frame::new(FrameId::new(i))))
            .collect();

        // Initially, every frame is in the free list.
        let free_list = (0..pool_size).map(FrameId::new).collect();

        Self {
            pool_size,
            num_instances,
            instance_index,
            frames,
            disk,
            state: Mutex::new(InstanceState {
                page_table: HashMap::with_capacity(pool_size),
                free_list,
                replacer: LruReplacer::new(pool_size),
                next_page_id: instance_index as i32,
            }),
            fetch_count: AtomicU64::new(0),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            eviction_count: AtomicU64::new(0),
            flush_count: AtomicU64::new(0),
        }
    }

    /// Returns this instance's shard index.
    pub fn instance_index(&self) -> usize {
        self.instance_index
    }

    /// Returns a snapshot of the instance statistics.
    pub fn stats(&self) -> BufferPoolStats {
        BufferPoolStats {
            fetches: self.fetch_count.load(Ordering::Relaxed),
            hits: self.hit_count.load(Ordering::Relaxed),
            misses: self.miss_count.load(Ordering::Relaxed),
            evictions: self.eviction_count.load(Ordering::Relaxed),
            flushes: self.flush_count.load(Ordering::Relaxed),
        }
    }

    /// Mints the next page ID owned by this shard.
    fn allocate_page_id(&self, state: &mut InstanceState) -> PageId {
        let id = state.next_page_id;
        state.next_page_id += self.num_instances as i32;
        debug_assert_eq!(
            id as usize % self.num_instances,
            self.instance_index,
            "allocated page ID must map back to this instance"
        );
        PageId::new(id)
    }

    /// Picks a reusable frame: free list first (no write-back cost), then
    /// the replacer.
    fn take_victim(state: &mut InstanceState) -> Option<FrameId> {
        state.free_list.pop().or_else(|| state.replacer.victim())
    }

    /// Detaches the frame's current page, writing it back if dirty.
    ///
    /// Must be called with the state mutex held so the page-table entry and
    /// the frame metadata change together.
    fn evict_resident_page(
        &self,
        state: &mut InstanceState,
        frame: &Frame,
    ) -> BufferResult<()> {
        let old_page_id = frame.page_id();
        if !old_page_id.is_valid() {
            return Ok(());
        }
        state.page_table.remove(&old_page_id);
        if frame.is_dirty() {
            self.disk.write_page(old_page_id, &frame.read_data())?;
            self.flush_count.fetch_add(1, Ordering::Relaxed);
            frame.set_dirty(false);
        }
        self.eviction_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl BufferPool for BufferPoolInstance {
    fn new_page(&self) -> BufferResult<PageHandle> {
        let mut state = self.state.lock();

        // If every frame is pinned, bail out before minting a page ID so
        // allocation pressure cannot burn IDs.
        if self.frames.iter().all(|f| f.pin_count() > 0) {
            tracing::debug!(instance = self.instance_index, "all frames pinned");
            return Err(BufferError::PoolExhausted);
        }

        let frame_id = Self::take_victim(&mut state).ok_or(BufferError::PoolExhausted)?;
        let frame = &self.frames[frame_id.index()];
        self.evict_resident_page(&mut state, frame)?;

        let page_id = self.allocate_page_id(&mut state);
        frame.zero_data();
        frame.set_page_id(page_id);
        frame.set_dirty(false);
        frame.pin_exclusive();
        state.page_table.insert(page_id, frame_id);

        Ok(PageHandle::new(Arc::clone(frame), page_id))
    }

    fn fetch_page(&self, page_id: PageId) -> BufferResult<PageHandle> {
        let mut state = self.state.lock();
        self.fetch_count.fetch_add(1, Ordering::Relaxed);

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            let frame = &self.frames[frame_id.index()];
            frame.pin();
            state.replacer.pin(frame_id);
            return Ok(PageHandle::new(Arc::clone(frame), page_id));
        }

        self.miss_count.fetch_add(1, Ordering::Relaxed);
        let frame_id = Self::take_victim(&mut state).ok_or_else(|| {
            tracing::warn!(page_id = %page_id, "cannot fetch page, buffer pool is full");
            BufferError::PoolExhausted
        })?;
        let frame = &self.frames[frame_id.index()];
        self.evict_resident_page(&mut state, frame)?;

        self.disk.read_page(page_id, &mut frame.write_data())?;
        frame.set_page_id(page_id);
        frame.set_dirty(false);
        frame.pin_exclusive();
        state.page_table.insert(page_id, frame_id);

        Ok(PageHandle::new(Arc::clone(frame), page_id))
    }

    fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let mut state = self.state.lock();

        let Some(&frame_id) = state.page_table.get(&page_id) else {
            tracing::warn!(page_id = %page_id, "cannot unpin page, not in buffer pool");
            return false;
        };
        let frame = &self.frames[frame_id.index()];
        if frame.pin_count() == 0 {
            tracing::warn!(page_id = %page_id, "unpin on page with zero pin count");
            return false;
        }

        if is_dirty {
            frame.set_dirty(true);
        }
        if frame.unpin() == 0 {
            state.replacer.unpin(frame_id);
        }
        true
    }

    fn flush_page(&self, page_id: PageId) -> BufferResult<bool> {
        let state = self.state.lock();

        let Some(&frame_id) = state.page_table.get(&page_id) else {
            tracing::warn!(page_id = %page_id, "cannot flush page, not in buffer pool");
            return Ok(false);
        };
        let frame = &self.frames[frame_id.index()];
        if frame.is_dirty() {
            self.disk.write_page(page_id, &frame.read_data())?;
            frame.set_dirty(false);
            self.flush_count.fetch_add(1, Ordering::Relaxed);
        }
        Ok(true)
    }

    fn flush_all_pages(&self) -> BufferResult<()> {
        let _state = self.state.lock();

        for frame in &self.frames {
            let page_id = frame.page_id();
            if page_id.is_valid() && frame.is_dirty() {
                self.disk.write_page(page_id, &frame.read_data())?;
                frame.set_dirty(false);
                self.flush_count.fetch_add(1, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    fn delete_page(&self, page_id: PageId) -> BufferResult<bool> {
        let mut state = self.state.lock();

        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return Ok(true);
        };
        let frame = &self.frames[frame_id.index()];
        if frame.pin_count() > 0 {
            tracing::warn!(
                page_id = %page_id,
                pin_count = frame.pin_count(),
                "cannot delete pinned page"
            );
            return Ok(false);
        }

        if frame.is_dirty() {
            self.disk.write_page(page_id, &frame.read_data())?;
            self.flush_count.fetch_add(1, Ordering::Relaxed);
        }
        state.page_table.remove(&page_id);
        state.replacer.pin(frame_id);
        frame.reset();
        state.free_list.push(frame_id);
        Ok(true)
    }

    fn pool_size(&self) -> usize {
        self.pool_size
    }
}

impl std::fmt::Debug for BufferPoolInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("BufferPoolInstance")
            .field("pool_size", &self.pool_size)
            .field("instance_index", &self.instance_index)
            .field("pages_resident", &state.page_table.len())
            .field("free_frames", &state.free_list.len())
            .finish()
    }
}
