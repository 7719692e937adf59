//! Buffer frame - a slot in the buffer pool that holds a page.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};

use cairn_common::constants::PAGE_SIZE;
use cairn_common::types::{FrameId, PageId};
use parking_lot::RwLock;

/// A buffer frame holds a single page in memory.
///
/// Each frame has:
/// - A data buffer for the page contents
/// - Metadata (page_id, dirty flag, pin count)
/// - A reader/writer lock on the data for concurrent access
///
/// Frames live for the pool's lifetime; the page identity held by a frame
/// changes as pages are admitted and evicted. Metadata uses atomics so the
/// pool mutex never needs to be held while callers touch page bytes — but a
/// caller must hold a pin for the whole time it reads or writes the data.
pub struct Frame {
    /// Frame ID (index in the frame array).
    frame_id: FrameId,
    /// Page data buffer.
    data: RwLock<Vec<u8>>,
    /// Page ID stored in this frame (INVALID if empty).
    page_id: AtomicI32,
    /// Pin count (number of outstanding borrows).
    pin_count: AtomicU32,
    /// Whether the page is dirty (modified since last write-back).
    dirty: AtomicBool,
}

impl Frame {
    /// Creates a new empty buffer frame.
    pub fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            data: RwLock::new(vec![0u8; PAGE_SIZE]),
            page_id: AtomicI32::new(PageId::INVALID.as_i32()),
            pin_count: AtomicU32::new(0),
            dirty: AtomicBool::new(false),
        }
    }

    /// Returns the frame ID.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Returns the page ID stored in this frame.
    #[inline]
    pub fn page_id(&self) -> PageId {
        PageId::new(self.page_id.load(Ordering::Acquire))
    }

    /// Sets the page ID for this frame.
    #[inline]
    pub fn set_page_id(&self, page_id: PageId) {
        self.page_id.store(page_id.as_i32(), Ordering::Release);
    }

    /// Returns true if this frame is empty (no page assigned).
    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.page_id().is_valid()
    }

    /// Returns the current pin count.
    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Acquire)
    }

    /// Increments the pin count and returns the new value.
    #[inline]
    pub fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Resets the pin count to exactly one (page admission).
    #[inline]
    pub fn pin_exclusive(&self) {
        self.pin_count.store(1, Ordering::Release);
    }

    /// Decrements the pin count and returns the new value.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if the pin count is already 0.
    #[inline]
    pub fn unpin(&self) -> u32 {
        let old = self.pin_count.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(old > 0, "unpinned frame with pin_count = 0");
        old - 1
    }

    /// Returns true if the frame is pinned.
    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    /// Returns true if the frame is dirty.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Marks the frame as dirty or clean.
    #[inline]
    pub fn set_dirty(&self, dirty: bool) {
        self.dirty.store(dirty, Ordering::Release);
    }

    /// Returns a read lock on the page data.
    #[inline]
    pub fn read_data(&self) -> parking_lot::RwLockReadGuard<'_, Vec<u8>> {
        self.data.read()
    }

    /// Returns a write lock on the page data.
    #[inline]
    pub fn write_data(&self) -> parking_lot::RwLockWriteGuard<'_, Vec<u8>> {
        self.data.write()
    }

    /// Zeroes the page data.
    pub fn zero_data(&self) {
        self.data.write().fill(0);
    }

    /// Resets the frame to the empty state.
    pub fn reset(&self) {
        self.page_id
            .store(PageId::INVALID.as_i32(), Ordering::Release);
        self.pin_count.store(0, Ordering::Release);
        self.dirty.store(false, Ordering::Release);
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("frame_id", &self.frame_id)
            .field("page_id", &self.page_id())
            .field("pin_count", &self.pin_count())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}
