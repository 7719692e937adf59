//! Hash directory page format.
//!
//! The directory page indexes every bucket of an extendible hash table.
//!
//! # Layout
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//!    0      4   global_depth (u32)
//!    4    512   local_depths (u8 per slot)
//!  516   2048   bucket_page_ids (i32 per slot, 0 = unassigned)
//! ```
//!
//! Only the first `2^global_depth` slots are live; the rest stay zeroed
//! until the directory doubles into them.

use cairn_common::constants::{DIRECTORY_ARRAY_SIZE, DIRECTORY_MAX_DEPTH};
use cairn_common::types::PageId;

const GLOBAL_DEPTH_OFFSET: usize = 0;
const LOCAL_DEPTHS_OFFSET: usize = 4;
const BUCKET_PAGE_IDS_OFFSET: usize = LOCAL_DEPTHS_OFFSET + DIRECTORY_ARRAY_SIZE;

/// Read-only view of a hash directory page.
#[derive(Debug)]
pub struct HashDirectoryPage<'a> {
    data: &'a [u8],
}

impl<'a> HashDirectoryPage<'a> {
    /// Creates a view into the given page buffer.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is smaller than the directory layout.
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        assert!(
            data.len() >= BUCKET_PAGE_IDS_OFFSET + 4 * DIRECTORY_ARRAY_SIZE,
            "buffer too small for directory page"
        );
        Self { data }
    }

    /// Returns the global depth.
    #[inline]
    pub fn global_depth(&self) -> u32 {
        u32::from_le_bytes(
            self.data[GLOBAL_DEPTH_OFFSET..GLOBAL_DEPTH_OFFSET + 4]
                .try_into()
                .unwrap(),
        )
    }

    /// Returns the mask selecting the low `global_depth` bits of a hash.
    #[inline]
    pub fn global_depth_mask(&self) -> u32 {
        (1 << self.global_depth()) - 1
    }

    /// Returns the number of live directory slots (`2^global_depth`).
    #[inline]
    pub fn size(&self) -> usize {
        1 << self.global_depth()
    }

    /// Returns the local depth recorded at the given slot.
    #[inline]
    pub fn local_depth(&self, slot: usize) -> u32 {
        debug_assert!(slot < DIRECTORY_ARRAY_SIZE);
        u32::from(self.data[LOCAL_DEPTHS_OFFSET + slot])
    }

    /// Returns the mask selecting the low `local_depth` bits at a slot.
    #[inline]
    pub fn local_depth_mask(&self, slot: usize) -> u32 {
        (1 << self.local_depth(slot)) - 1
    }

    /// Returns the bucket page ID recorded at the given slot.
    ///
    /// Page `0` means the slot has never been assigned.
    #[inline]
    pub fn bucket_page_id(&self, slot: usize) -> PageId {
        debug_assert!(slot < DIRECTORY_ARRAY_SIZE);
        let offset = BUCKET_PAGE_IDS_OFFSET + slot * 4;
        PageId::from_le_bytes(self.data[offset..offset + 4].try_into().unwrap())
    }

    /// Checks structural invariants, panicking on violation.
    ///
    /// For every live slot: the bucket assignment exists, its local depth
    /// does not exceed the global depth, and all slots sharing a bucket
    /// agree on that bucket's local depth and count to exactly
    /// `2^(global_depth - local_depth)` aliases.
    pub fn verify_integrity(&self) {
        use std::collections::HashMap;

        let mut depth_of: HashMap<PageId, u32> = HashMap::new();
        let mut aliases_of: HashMap<PageId, u32> = HashMap::new();

        for slot in 0..self.size() {
            let page_id = self.bucket_page_id(slot);
            let local_depth = self.local_depth(slot);
            assert!(
                page_id.as_i32() != 0,
                "directory slot {slot} has no bucket assigned"
            );
            assert!(
                local_depth <= self.global_depth(),
                "local depth {local_depth} at slot {slot} exceeds global depth {}",
                self.global_depth()
            );

            if let Some(&known) = depth_of.get(&page_id) {
                assert_eq!(
                    known, local_depth,
                    "bucket {page_id} has inconsistent local depths {known} and {local_depth}"
                );
            } else {
                depth_of.insert(page_id, local_depth);
            }
            *aliases_of.entry(page_id).or_insert(0) += 1;
        }

        for (page_id, local_depth) in &depth_of {
            let expected = 1u32 << (self.global_depth() - local_depth);
            let actual = aliases_of[page_id];
            assert_eq!(
                actual, expected,
                "bucket {page_id} at depth {local_depth} has {actual} aliases, expected {expected}"
            );
        }
    }

    /// Logs one row per live slot at debug level.
    pub fn dump(&self) {
        tracing::debug!(
            global_depth = self.global_depth(),
            size = self.size(),
            "directory"
        );
        for slot in 0..self.size() {
            tracing::debug!(
                slot,
                bucket_page_id = %self.bucket_page_id(slot),
                local_depth = self.local_depth(slot),
                "directory entry"
            );
        }
    }
}

/// Mutable view of a hash directory page.
///
/// A freshly zeroed page is already a valid empty directory: global depth
/// zero and every slot unassigned.
#[derive(Debug)]
pub struct HashDirectoryPageMut<'a> {
    data: &'a mut [u8],
}

impl<'a> HashDirectoryPageMut<'a> {
    /// Creates a mutable view into the given page buffer.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is smaller than the directory layout.
    #[inline]
    pub fn new(data: &'a mut [u8]) -> Self {
        assert!(
            data.len() >= BUCKET_PAGE_IDS_OFFSET + 4 * DIRECTORY_ARRAY_SIZE,
            "buffer too small for directory page"
        );
        Self { data }
    }

    /// Reborrows as a read-only view.
    #[inline]
    pub fn as_read(&self) -> HashDirectoryPage<'_> {
        HashDirectoryPage { data: self.data }
    }

    /// Returns the global depth.
    #[inline]
    pub fn global_depth(&self) -> u32 {
        self.as_read().global_depth()
    }

    /// Returns the mask selecting the low `global_depth` bits of a hash.
    #[inline]
    pub fn global_depth_mask(&self) -> u32 {
        self.as_read().global_depth_mask()
    }

    /// Returns the number of live directory slots.
    #[inline]
    pub fn size(&self) -> usize {
        self.as_read().size()
    }

    /// Returns the local depth recorded at the given slot.
    #[inline]
    pub fn local_depth(&self, slot: usize) -> u32 {
        self.as_read().local_depth(slot)
    }

    /// Returns the bucket page ID recorded at the given slot.
    #[inline]
    pub fn bucket_page_id(&self, slot: usize) -> PageId {
        self.as_read().bucket_page_id(slot)
    }

    /// Increments the global depth, doubling the live slot range.
    ///
    /// Returns `false` if the directory is already at its maximum depth;
    /// callers treat that as fatal.
    #[must_use]
    pub fn incr_global_depth(&mut self) -> bool {
        let depth = self.global_depth();
        if depth >= DIRECTORY_MAX_DEPTH {
            tracing::error!(
                global_depth = depth,
                "directory cannot grow past its maximum depth"
            );
            return false;
        }
        self.data[GLOBAL_DEPTH_OFFSET..GLOBAL_DEPTH_OFFSET + 4]
            .copy_from_slice(&(depth + 1).to_le_bytes());
        true
    }

    /// Records the local depth for a slot.
    #[inline]
    pub fn set_local_depth(&mut self, slot: usize, local_depth: u8) {
        debug_assert!(slot < DIRECTORY_ARRAY_SIZE);
        self.data[LOCAL_DEPTHS_OFFSET + slot] = local_depth;
    }

    /// Records the bucket page ID for a slot.
    #[inline]
    pub fn set_bucket_page_id(&mut self, slot: usize, page_id: PageId) {
        debug_assert!(slot < DIRECTORY_ARRAY_SIZE);
        let offset = BUCKET_PAGE_IDS_OFFSET + slot * 4;
        self.data[offset..offset + 4].copy_from_slice(&page_id.to_le_bytes());
    }
}
