//! Page handles for reading and writing pinned pages.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use cairn_common::types::{FrameId, PageId};

use super::frame::Frame;

/// A borrowed view of a pinned page.
///
/// A handle is returned by `new_page` and `fetch_page` while the underlying
/// frame carries a pin on the caller's behalf. The handle does **not**
/// release the pin on drop: the caller owes a matching
/// [`unpin_page`](super::BufferPool::unpin_page) that also declares whether
/// the page was dirtied. Page bytes must only be accessed while the pin is
/// held.
pub struct PageHandle {
    frame: Arc<Frame>,
    page_id: PageId,
}

impl PageHandle {
    /// Creates a new handle over a pinned frame.
    pub(crate) fn new(frame: Arc<Frame>, page_id: PageId) -> Self {
        Self { frame, page_id }
    }

    /// Returns the page ID.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Returns the frame ID.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame.frame_id()
    }

    /// Returns a read lock over the page data.
    #[inline]
    pub fn data(&self) -> impl Deref<Target = [u8]> + '_ {
        PageDataRef {
            guard: self.frame.read_data(),
        }
    }

    /// Returns a write lock over the page data and marks the frame dirty.
    #[inline]
    pub fn data_mut(&self) -> impl DerefMut<Target = [u8]> + '_ {
        self.frame.set_dirty(true);
        PageDataMut {
            guard: self.frame.write_data(),
        }
    }
}

impl std::fmt::Debug for PageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageHandle")
            .field("page_id", &self.page_id)
            .field("frame_id", &self.frame.frame_id())
            .finish()
    }
}

/// Helper struct to provide Deref for page data.
struct PageDataRef<'a> {
    guard: parking_lot::RwLockReadGuard<'a, Vec<u8>>,
}

impl<'a> Deref for PageDataRef<'a> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

/// Helper struct to provide DerefMut for page data.
struct PageDataMut<'a> {
    guard: parking_lot::RwLockWriteGuard<'a, Vec<u8>>,
}

impl<'a> Deref for PageDataMut<'a> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<'a> DerefMut for PageDataMut<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}
