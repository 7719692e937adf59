//! Extendible hash table implementation.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

use cairn_common::types::{FixedCodec, PageId};
use parking_lot::{Mutex, RwLock};
use siphasher::sip::SipHasher13;

use super::error::{HashTableError, HashTableResult};
use crate::buffer::{BufferPool, PageHandle};
use crate::page::{HashBucketPage, HashBucketPageMut, HashDirectoryPage, HashDirectoryPageMut};

/// A disk-backed extendible hash table.
///
/// All persistent state lives in buffer-pool pages; the table itself only
/// remembers the directory page ID, the per-bucket low-order-bit signatures,
/// and its latch. A table-level reader/writer latch orders lookups against
/// structure changes; per-bucket access goes through each page's data lock
/// while the page is pinned.
///
/// Keys hash through a fixed-key SipHash truncated to 32 bits; the low
/// `global_depth` bits of the hash index the directory.
pub struct ExtendibleHashTable<K, V> {
    /// Diagnostic name of the index.
    name: String,
    /// Backing buffer pool.
    pool: Arc<dyn BufferPool>,
    /// Page holding the directory; allocated at construction, never moved.
    directory_page_id: PageId,
    /// Table-level latch: read for lookups, write for inserts, removes and
    /// splits.
    latch: RwLock<()>,
    /// Low-order-bit signature per bucket page.
    ///
    /// Auxiliary process-memory state; rederivable by scanning the
    /// directory, updated on every allocation and split.
    bucket_signatures: Mutex<HashMap<PageId, u32>>,
    _marker: PhantomData<fn(K, V) -> (K, V)>,
}

impl<K, V> ExtendibleHashTable<K, V>
where
    K: FixedCodec + Eq + Hash,
    V: FixedCodec + Eq,
{
    /// Creates a new table, allocating its directory page.
    ///
    /// Fails with the underlying buffer error when the pool cannot allocate
    /// the directory page.
    pub fn new(name: impl Into<String>, pool: Arc<dyn BufferPool>) -> HashTableResult<Self> {
        let directory = pool.new_page()?;
        let directory_page_id = directory.page_id();
        // A zeroed page is already a valid empty directory.
        pool.unpin_page(directory_page_id, true);

        Ok(Self {
            name: name.into(),
            pool,
            directory_page_id,
            latch: RwLock::new(()),
            bucket_signatures: Mutex::new(HashMap::new()),
            _marker: PhantomData,
        })
    }

    /// Returns the diagnostic name of the index.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the page holding the directory.
    pub fn directory_page_id(&self) -> PageId {
        self.directory_page_id
    }

    /// Hashes a key down to the 32 bits used for directory indexing.
    fn hash_key(key: &K) -> u32 {
        let mut hasher = SipHasher13::new();
        key.hash(&mut hasher);
        hasher.finish() as u32
    }

    /// Collects every value stored under the key.
    pub fn get_value(&self, key: &K) -> HashTableResult<Vec<V>> {
        let _guard = self.latch.read();

        let (global_depth, bucket_page_id) = self.route_key(key)?;
        if global_depth == 0 || !Self::is_assigned(bucket_page_id) {
            return Ok(Vec::new());
        }

        let bucket = self.pool.fetch_page(bucket_page_id)?;
        let values = {
            let data = bucket.data();
            HashBucketPage::<K, V>::new(&data).get_value(key)
        };
        self.pool.unpin_page(bucket_page_id, false);
        Ok(values)
    }

    /// Inserts a (key, value) pair, splitting the target bucket if needed.
    ///
    /// Returns `Ok(false)` if the exact pair is already present.
    pub fn insert(&self, key: &K, value: &V) -> HashTableResult<bool> {
        let _guard = self.latch.write();

        let (global_depth, bucket_page_id) = self.route_key(key)?;
        if global_depth == 0 {
            return self.split_insert(key, value);
        }

        let bucket = self.pool.fetch_page(bucket_page_id)?;
        let (duplicate, full) = {
            let data = bucket.data();
            let bucket = HashBucketPage::<K, V>::new(&data);
            (bucket.key_value_exists(key, value), bucket.is_full())
        };
        if duplicate {
            self.pool.unpin_page(bucket_page_id, false);
            tracing::debug!(table = %self.name, "rejecting duplicate insert");
            return Ok(false);
        }
        if full {
            self.pool.unpin_page(bucket_page_id, false);
            return self.split_insert(key, value);
        }

        let inserted = {
            let mut data = bucket.data_mut();
            HashBucketPageMut::<K, V>::new(&mut data).insert(key, value)
        };
        self.pool.unpin_page(bucket_page_id, inserted);
        Ok(inserted)
    }

    /// Removes the exact (key, value) pair.
    ///
    /// Returns `Ok(false)` if no such entry exists.
    pub fn remove(&self, key: &K, value: &V) -> HashTableResult<bool> {
        let _guard = self.latch.write();

        let (global_depth, bucket_page_id) = self.route_key(key)?;
        if global_depth == 0 || !Self::is_assigned(bucket_page_id) {
            return Ok(false);
        }

        let bucket = self.pool.fetch_page(bucket_page_id)?;
        let removed = {
            let mut data = bucket.data_mut();
            HashBucketPageMut::<K, V>::new(&mut data).remove(key, value)
        };
        self.pool.unpin_page(bucket_page_id, removed);
        if !removed {
            tracing::warn!(table = %self.name, "remove of an absent entry");
        }

        self.merge(key, value);
        Ok(removed)
    }

    /// Returns the directory's global depth.
    pub fn global_depth(&self) -> HashTableResult<u32> {
        let _guard = self.latch.read();

        let directory = self.pool.fetch_page(self.directory_page_id)?;
        let depth = {
            let data = directory.data();
            HashDirectoryPage::new(&data).global_depth()
        };
        self.pool.unpin_page(self.directory_page_id, false);
        Ok(depth)
    }

    /// Checks directory invariants, panicking on violation.
    ///
    /// Verifies the structural directory invariants and that every live
    /// slot `i` satisfies
    /// `i & ((1 << local_depth) - 1) == signature(bucket_page_id)`.
    pub fn verify_integrity(&self) -> HashTableResult<()> {
        let _guard = self.latch.read();

        let directory = self.pool.fetch_page(self.directory_page_id)?;
        {
            let data = directory.data();
            let dir = HashDirectoryPage::new(&data);
            if dir.global_depth() > 0 {
                dir.verify_integrity();

                let signatures = self.bucket_signatures.lock();
                for slot in 0..dir.size() {
                    let page_id = dir.bucket_page_id(slot);
                    let signature = signatures.get(&page_id).copied();
                    assert_eq!(
                        signature,
                        Some(slot as u32 & dir.local_depth_mask(slot)),
                        "slot {slot} disagrees with the signature of bucket {page_id}"
                    );
                }
            }
        }
        self.pool.unpin_page(self.directory_page_id, false);
        Ok(())
    }

    /// Logs the directory and per-bucket occupancy at debug level.
    pub fn dump(&self) -> HashTableResult<()> {
        let _guard = self.latch.read();

        let directory = self.pool.fetch_page(self.directory_page_id)?;
        let bucket_page_ids = {
            let data = directory.data();
            let dir = HashDirectoryPage::new(&data);
            dir.dump();
            let mut ids: Vec<PageId> = (0..dir.size())
                .map(|slot| dir.bucket_page_id(slot))
                .filter(|id| Self::is_assigned(*id))
                .collect();
            ids.sort_unstable();
            ids.dedup();
            ids
        };
        self.pool.unpin_page(self.directory_page_id, false);

        for page_id in bucket_page_ids {
            let bucket = self.pool.fetch_page(page_id)?;
            {
                let data = bucket.data();
                HashBucketPage::<K, V>::new(&data).dump();
            }
            self.pool.unpin_page(page_id, false);
        }
        Ok(())
    }

    /// Returns true if a directory entry names a real bucket.
    ///
    /// Page 0 in a directory slot means the slot was never assigned.
    fn is_assigned(page_id: PageId) -> bool {
        page_id.as_i32() != 0
    }

    /// Reads (global depth, bucket page for the key) from the directory.
    fn route_key(&self, key: &K) -> HashTableResult<(u32, PageId)> {
        let directory = self.pool.fetch_page(self.directory_page_id)?;
        let routed = {
            let data = directory.data();
            let dir = HashDirectoryPage::new(&data);
            let depth = dir.global_depth();
            let slot = (Self::hash_key(key) & dir.global_depth_mask()) as usize;
            (depth, dir.bucket_page_id(slot))
        };
        self.pool.unpin_page(self.directory_page_id, false);
        Ok(routed)
    }

    /// Grows the table and inserts the pending (key, value) pair.
    ///
    /// Must be called with the table write latch held. Doubles the
    /// directory, allocates the new bucket(s), repoints every directory
    /// entry by bucket signature, and redistributes the overfull bucket's
    /// entries together with the pending pair.
    fn split_insert(&self, key: &K, value: &V) -> HashTableResult<bool> {
        let old_bucket_page_id = self.grow_directory(key)?;

        // Gather everything that must be re-homed.
        let mut pending: Vec<(K, V)> = Vec::new();
        if let Some(old_page_id) = old_bucket_page_id {
            let bucket = self.pool.fetch_page(old_page_id)?;
            {
                let mut data = bucket.data_mut();
                let mut bucket = HashBucketPageMut::<K, V>::new(&mut data);
                pending = bucket.as_read().get_all_elements();
                bucket.remove_all_elements();
            }
            self.pool.unpin_page(old_page_id, true);
        }
        pending.push((*key, *value));

        // Reinsert through the updated directory. Raising the local depth
        // split the overfull bucket's keys across two pages, so every pair
        // finds room.
        for (pending_key, pending_value) in &pending {
            let (_, target_page_id) = self.route_key(pending_key)?;
            let bucket = self.pool.fetch_page(target_page_id)?;
            let inserted = {
                let mut data = bucket.data_mut();
                HashBucketPageMut::<K, V>::new(&mut data).insert(pending_key, pending_value)
            };
            self.pool.unpin_page(target_page_id, inserted);
            if !inserted {
                tracing::error!(
                    table = %self.name,
                    bucket = %target_page_id,
                    "cannot re-home entry after split"
                );
                return Err(HashTableError::SplitReinsert);
            }
        }
        Ok(true)
    }

    /// Doubles the directory and rewires its entries.
    ///
    /// Returns the page ID of the bucket that overflowed, or `None` on the
    /// very first growth (there is nothing to redistribute yet).
    fn grow_directory(&self, key: &K) -> HashTableResult<Option<PageId>> {
        let directory = self.pool.fetch_page(self.directory_page_id)?;
        let result = self.grow_directory_locked(&directory, key);
        self.pool.unpin_page(self.directory_page_id, true);
        result
    }

    fn grow_directory_locked(
        &self,
        directory: &PageHandle,
        key: &K,
    ) -> HashTableResult<Option<PageId>> {
        let mut data = directory.data_mut();
        let mut dir = HashDirectoryPageMut::new(&mut data);

        // First growth: no buckets exist yet, create the pair for bit 0.
        // Bucket pages are allocated before the directory is touched, so an
        // exhausted pool leaves the table unchanged.
        if dir.global_depth() == 0 {
            let mut page_ids = [PageId::INVALID; 2];
            for (low_bit, slot) in page_ids.iter_mut().enumerate() {
                let bucket = self.pool.new_page()?;
                *slot = bucket.page_id();
                self.pool.unpin_page(*slot, true);
                self.bucket_signatures.lock().insert(*slot, low_bit as u32);
            }
            if !dir.incr_global_depth() {
                return Err(HashTableError::DirectoryFull { global_depth: 0 });
            }
            for (low_bit, page_id) in page_ids.into_iter().enumerate() {
                dir.set_bucket_page_id(low_bit, page_id);
                dir.set_local_depth(low_bit, 1);
            }
            return Ok(None);
        }

        // Subsequent growth: split the bucket the key routes to.
        let old_slot = (Self::hash_key(key) & dir.global_depth_mask()) as usize;
        let old_page_id = dir.bucket_page_id(old_slot);
        let old_local_depth = dir.local_depth(old_slot);

        let new_bucket = self.pool.new_page()?;
        let new_page_id = new_bucket.page_id();
        self.pool.unpin_page(new_page_id, true);

        if !dir.incr_global_depth() {
            return Err(HashTableError::DirectoryFull {
                global_depth: dir.global_depth(),
            });
        }

        // The split halves raise their addressing depth by one bit.
        for slot in 0..dir.size() {
            if dir.bucket_page_id(slot) == old_page_id {
                dir.set_local_depth(slot, (old_local_depth + 1) as u8);
            }
        }

        let mut signatures = self.bucket_signatures.lock();
        let old_signature = signatures.get(&old_page_id).copied().unwrap_or_else(|| {
            tracing::error!(bucket = %old_page_id, "missing signature for split bucket");
            0
        });
        signatures.insert(new_page_id, (1 << old_local_depth) | old_signature);

        // Per-bucket local depths for the repoint pass: live entries carry
        // the raised depths, the new bucket is not in any entry yet.
        let mut depth_of: HashMap<PageId, u32> = HashMap::new();
        for slot in 0..dir.size() {
            let page_id = dir.bucket_page_id(slot);
            if Self::is_assigned(page_id) {
                depth_of.insert(page_id, dir.local_depth(slot));
            }
        }
        depth_of.insert(new_page_id, old_local_depth + 1);

        // Point every entry at the unique bucket whose signature matches
        // its low local-depth bits.
        for slot in 0..dir.size() {
            let mut matches = 0;
            for (&page_id, &local_depth) in &depth_of {
                let signature = signatures[&page_id];
                if (slot as u32) & ((1 << local_depth) - 1) == signature {
                    dir.set_bucket_page_id(slot, page_id);
                    dir.set_local_depth(slot, local_depth as u8);
                    matches += 1;
                }
            }
            if matches != 1 {
                tracing::error!(
                    table = %self.name,
                    slot,
                    matches,
                    "directory slot matched an unexpected number of bucket signatures"
                );
            }
        }

        Ok(Some(old_page_id))
    }

    /// Coalesces an emptied bucket with its split image.
    ///
    /// Bucket merging and directory shrinkage are not implemented; removals
    /// leave the directory at its high-water depth.
    fn merge(&self, _key: &K, _value: &V) {}
}

impl<K, V> std::fmt::Debug for ExtendibleHashTable<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtendibleHashTable")
            .field("name", &self.name)
            .field("directory_page_id", &self.directory_page_id)
            .finish()
    }
}
