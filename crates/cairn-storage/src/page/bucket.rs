//! Hash bucket page format.
//!
//! A bucket page stores up to `CAPACITY` fixed-width (key, value) slots with
//! two bitmaps in front of the slot array:
//!
//! ```text
//! Offset            Size              Field
//! ------            ----              -----
//! 0                 ceil(CAPACITY/8)  occupied  (slot has ever been written)
//! BITMAP_LEN        ceil(CAPACITY/8)  readable  (slot holds a live entry)
//! 2 * BITMAP_LEN    CAPACITY * ENTRY  slot array
//! ```
//!
//! `CAPACITY` is chosen so the bitmaps and the array together fit in one
//! page: each slot costs its payload plus two bits. A slot whose occupied
//! bit is set but whose readable bit is clear is a tombstone; inserts scan
//! for the first never-occupied slot and do not reuse tombstones.

use std::marker::PhantomData;

use cairn_common::constants::{bucket_capacity, PAGE_SIZE};
use cairn_common::types::FixedCodec;

/// Returns the byte and mask addressing bitmap bit `slot`.
#[inline]
const fn bit_addr(slot: usize) -> (usize, u8) {
    (slot / 8, 1 << (slot % 8))
}

/// Read-only view of a hash bucket page.
pub struct HashBucketPage<'a, K, V> {
    data: &'a [u8],
    _marker: PhantomData<(K, V)>,
}

impl<'a, K, V> HashBucketPage<'a, K, V>
where
    K: FixedCodec + Eq,
    V: FixedCodec + Eq,
{
    /// Bytes per (key, value) slot.
    pub const ENTRY_LEN: usize = K::ENCODED_LEN + V::ENCODED_LEN;
    /// Number of slots in a bucket page.
    pub const CAPACITY: usize = bucket_capacity(Self::ENTRY_LEN);
    /// Bytes per bitmap.
    const BITMAP_LEN: usize = (Self::CAPACITY + 7) / 8;
    /// Offset of the readable bitmap.
    const READABLE_OFFSET: usize = Self::BITMAP_LEN;
    /// Offset of the slot array.
    const ARRAY_OFFSET: usize = 2 * Self::BITMAP_LEN;

    /// Creates a view into the given page buffer.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is smaller than a page.
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        assert!(data.len() >= PAGE_SIZE, "buffer too small for bucket page");
        Self {
            data,
            _marker: PhantomData,
        }
    }

    /// Returns true if the slot has ever been written.
    #[inline]
    pub fn is_occupied(&self, slot: usize) -> bool {
        let (byte, mask) = bit_addr(slot);
        self.data[byte] & mask != 0
    }

    /// Returns true if the slot holds a live entry.
    #[inline]
    pub fn is_readable(&self, slot: usize) -> bool {
        let (byte, mask) = bit_addr(slot);
        self.data[Self::READABLE_OFFSET + byte] & mask != 0
    }

    /// Decodes the key stored at the slot.
    #[inline]
    pub fn key_at(&self, slot: usize) -> K {
        let offset = Self::ARRAY_OFFSET + slot * Self::ENTRY_LEN;
        K::decode_from(&self.data[offset..offset + K::ENCODED_LEN])
    }

    /// Decodes the value stored at the slot.
    #[inline]
    pub fn value_at(&self, slot: usize) -> V {
        let offset = Self::ARRAY_OFFSET + slot * Self::ENTRY_LEN + K::ENCODED_LEN;
        V::decode_from(&self.data[offset..offset + V::ENCODED_LEN])
    }

    /// Collects every live value stored under the key.
    pub fn get_value(&self, key: &K) -> Vec<V> {
        let mut values = Vec::new();
        for slot in 0..Self::CAPACITY {
            if self.is_readable(slot) && self.key_at(slot) == *key {
                values.push(self.value_at(slot));
            }
        }
        values
    }

    /// Returns true if any live entry has the key.
    pub fn key_exists(&self, key: &K) -> bool {
        (0..Self::CAPACITY).any(|slot| self.is_readable(slot) && self.key_at(slot) == *key)
    }

    /// Returns true if a live entry equals the (key, value) pair.
    pub fn key_value_exists(&self, key: &K, value: &V) -> bool {
        (0..Self::CAPACITY).any(|slot| {
            self.is_readable(slot) && self.key_at(slot) == *key && self.value_at(slot) == *value
        })
    }

    /// Returns true if every slot has been occupied.
    pub fn is_full(&self) -> bool {
        (0..Self::CAPACITY).all(|slot| self.is_occupied(slot))
    }

    /// Returns true if no slot has ever been occupied.
    pub fn is_empty(&self) -> bool {
        (0..Self::CAPACITY).all(|slot| !self.is_occupied(slot))
    }

    /// Counts live entries via the readable bitmap.
    pub fn num_readable(&self) -> u32 {
        self.data[Self::READABLE_OFFSET..Self::READABLE_OFFSET + Self::BITMAP_LEN]
            .iter()
            .map(|byte| byte.count_ones())
            .sum()
    }

    /// Collects every live (key, value) pair.
    pub fn get_all_elements(&self) -> Vec<(K, V)> {
        let mut elements = Vec::new();
        for slot in 0..Self::CAPACITY {
            if self.is_readable(slot) {
                elements.push((self.key_at(slot), self.value_at(slot)));
            }
        }
        elements
    }

    /// Logs an occupancy summary at debug level.
    pub fn dump(&self) {
        let occupied = (0..Self::CAPACITY).filter(|&s| self.is_occupied(s)).count();
        tracing::debug!(
            capacity = Self::CAPACITY,
            occupied,
            readable = self.num_readable(),
            "bucket"
        );
    }
}

/// Mutable view of a hash bucket page.
///
/// A freshly zeroed page is a valid empty bucket.
pub struct HashBucketPageMut<'a, K, V> {
    data: &'a mut [u8],
    _marker: PhantomData<(K, V)>,
}

impl<'a, K, V> HashBucketPageMut<'a, K, V>
where
    K: FixedCodec + Eq,
    V: FixedCodec + Eq,
{
    /// Creates a mutable view into the given page buffer.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is smaller than a page.
    #[inline]
    pub fn new(data: &'a mut [u8]) -> Self {
        assert!(data.len() >= PAGE_SIZE, "buffer too small for bucket page");
        Self {
            data,
            _marker: PhantomData,
        }
    }

    /// Reborrows as a read-only view.
    #[inline]
    pub fn as_read(&self) -> HashBucketPage<'_, K, V> {
        HashBucketPage {
            data: self.data,
            _marker: PhantomData,
        }
    }

    /// Inserts the (key, value) pair into the first never-occupied slot.
    ///
    /// Returns `false` if the bucket is full or the exact pair is already
    /// present. Tombstoned slots are not reused.
    pub fn insert(&mut self, key: &K, value: &V) -> bool {
        let read = self.as_read();
        if read.is_full() || read.key_value_exists(key, value) {
            return false;
        }

        let slot = match (0..HashBucketPage::<K, V>::CAPACITY)
            .find(|&slot| !self.as_read().is_occupied(slot))
        {
            Some(slot) => slot,
            None => {
                tracing::warn!("bucket reported free space but no unoccupied slot found");
                return false;
            }
        };

        let offset = HashBucketPage::<K, V>::ARRAY_OFFSET
            + slot * HashBucketPage::<K, V>::ENTRY_LEN;
        key.encode_into(&mut self.data[offset..offset + K::ENCODED_LEN]);
        value.encode_into(
            &mut self.data[offset + K::ENCODED_LEN..offset + K::ENCODED_LEN + V::ENCODED_LEN],
        );
        self.set_occupied(slot);
        self.set_readable(slot);
        true
    }

    /// Removes the live entry equal to the (key, value) pair.
    ///
    /// Clears both the readable and occupied bits of the slot, making it
    /// reusable. Returns `false` if no such entry exists.
    pub fn remove(&mut self, key: &K, value: &V) -> bool {
        for slot in 0..HashBucketPage::<K, V>::CAPACITY {
            let read = self.as_read();
            if read.is_readable(slot) && read.key_at(slot) == *key && read.value_at(slot) == *value
            {
                let (byte, mask) = bit_addr(slot);
                self.data[byte] &= !mask;
                self.data[HashBucketPage::<K, V>::READABLE_OFFSET + byte] &= !mask;
                return true;
            }
        }
        false
    }

    /// Tombstones the slot: clears its readable bit, leaving it occupied.
    pub fn remove_at(&mut self, slot: usize) {
        if self.as_read().is_occupied(slot) {
            let (byte, mask) = bit_addr(slot);
            self.data[HashBucketPage::<K, V>::READABLE_OFFSET + byte] &= !mask;
        }
    }

    /// Zeroes both bitmaps, discarding every entry and every tombstone.
    pub fn remove_all_elements(&mut self) {
        self.data[..2 * HashBucketPage::<K, V>::BITMAP_LEN].fill(0);
    }

    #[inline]
    fn set_occupied(&mut self, slot: usize) {
        let (byte, mask) = bit_addr(slot);
        self.data[byte] |= mask;
    }

    #[inline]
    fn set_readable(&mut self, slot: usize) {
        let (byte, mask) = bit_addr(slot);
        self.data[HashBucketPage::<K, V>::READABLE_OFFSET + byte] |= mask;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Bucket<'a> = HashBucketPage<'a, i32, i32>;
    type BucketMut<'a> = HashBucketPageMut<'a, i32, i32>;

    #[test]
    fn test_capacity_fits_in_page() {
        assert_eq!(Bucket::CAPACITY, 496);
        let used = 2 * ((Bucket::CAPACITY + 7) / 8) + Bucket::CAPACITY * Bucket::ENTRY_LEN;
        assert!(used <= PAGE_SIZE);
    }

    #[test]
    fn test_insert_and_get() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut bucket = BucketMut::new(&mut buf);

        assert!(bucket.insert(&1, &10));
        assert!(bucket.insert(&1, &11));
        assert!(bucket.insert(&2, &20));

        let read = bucket.as_read();
        assert_eq!(read.get_value(&1), vec![10, 11]);
        assert_eq!(read.get_value(&2), vec![20]);
        assert!(read.get_value(&3).is_empty());
        assert_eq!(read.num_readable(), 3);
        assert!(read.key_exists(&2));
        assert!(read.key_value_exists(&1, &11));
        assert!(!read.key_value_exists(&1, &20));
    }

    #[test]
    fn test_duplicate_pair_rejected() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut bucket = BucketMut::new(&mut buf);

        assert!(bucket.insert(&7, &70));
        assert!(!bucket.insert(&7, &70));
        assert_eq!(bucket.as_read().num_readable(), 1);
    }

    #[test]
    fn test_remove_clears_slot_for_reuse() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut bucket = BucketMut::new(&mut buf);

        assert!(bucket.insert(&1, &10));
        assert!(bucket.insert(&2, &20));
        assert!(bucket.remove(&1, &10));
        assert!(!bucket.remove(&1, &10));

        // Slot 0 became never-occupied again, so the next insert lands there.
        assert!(bucket.insert(&3, &30));
        let read = bucket.as_read();
        assert!(read.is_readable(0));
        assert_eq!(read.key_at(0), 3);
    }

    #[test]
    fn test_remove_matches_value_too() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut bucket = BucketMut::new(&mut buf);

        assert!(bucket.insert(&1, &10));
        assert!(bucket.insert(&1, &11));
        assert!(bucket.remove(&1, &11));
        assert_eq!(bucket.as_read().get_value(&1), vec![10]);
    }

    #[test]
    fn test_tombstone_not_reused_by_insert() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut bucket = BucketMut::new(&mut buf);

        assert!(bucket.insert(&1, &10));
        bucket.remove_at(0);

        let read = bucket.as_read();
        assert!(read.is_occupied(0));
        assert!(!read.is_readable(0));

        // The next insert skips the tombstoned slot 0.
        assert!(bucket.insert(&2, &20));
        assert!(bucket.as_read().is_readable(1));
        assert_eq!(bucket.as_read().key_at(1), 2);
    }

    #[test]
    fn test_fill_to_capacity() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut bucket = BucketMut::new(&mut buf);

        for i in 0..Bucket::CAPACITY as i32 {
            assert!(bucket.insert(&i, &(i * 2)), "insert {i} failed");
        }
        assert!(bucket.as_read().is_full());
        assert!(!bucket.insert(&-1, &0));
        assert_eq!(bucket.as_read().num_readable(), Bucket::CAPACITY as u32);
    }

    #[test]
    fn test_remove_all_elements() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut bucket = BucketMut::new(&mut buf);

        for i in 0..10 {
            assert!(bucket.insert(&i, &i));
        }
        bucket.remove_at(3);
        bucket.remove_all_elements();

        let read = bucket.as_read();
        assert!(read.is_empty());
        assert_eq!(read.num_readable(), 0);
        assert!(read.get_all_elements().is_empty());
    }

    #[test]
    fn test_get_all_elements_skips_tombstones() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut bucket = BucketMut::new(&mut buf);

        assert!(bucket.insert(&1, &10));
        assert!(bucket.insert(&2, &20));
        assert!(bucket.insert(&3, &30));
        bucket.remove_at(1);

        let elements = bucket.as_read().get_all_elements();
        assert_eq!(elements, vec![(1, 10), (3, 30)]);
    }

    #[test]
    fn test_wide_entries_capacity() {
        use cairn_common::types::{PageId, RecordId};

        type WideMut<'a> = HashBucketPageMut<'a, i64, RecordId>;
        type Wide<'a> = HashBucketPage<'a, i64, RecordId>;

        let mut buf = vec![0u8; PAGE_SIZE];
        let mut bucket = WideMut::new(&mut buf);

        let rid = RecordId::new(PageId::new(4), 2);
        assert!(bucket.insert(&99, &rid));
        assert_eq!(bucket.as_read().get_value(&99), vec![rid]);
        assert!(Wide::CAPACITY > 0);
        let used = 2 * ((Wide::CAPACITY + 7) / 8) + Wide::CAPACITY * Wide::ENTRY_LEN;
        assert!(used <= PAGE_SIZE);
    }
}
