//! Parallel buffer pool manager.
//!
//! Scales the buffer pool across `N` independent instances to reduce lock
//! contention. Page-addressed operations route to instance `page_id mod N`;
//! because each instance mints only page IDs in its own residue class, a
//! page is handled by the same instance for its whole life and no operation
//! ever touches two instances.

use std::sync::Arc;

use cairn_common::types::PageId;
use parking_lot::Mutex;

use super::config::BufferPoolConfig;
use super::error::{BufferError, BufferResult};
use super::handle::PageHandle;
use super::instance::BufferPoolInstance;
use super::{BufferPool, BufferPoolStats};
use crate::disk::DiskManager;

/// A buffer pool sharded over independent instances.
///
/// Each instance carries its own coarse mutex, so operations on pages in
/// different shards proceed in parallel. Allocation walks the instances
/// round-robin from a shared cursor guarded by a dedicated mutex; the
/// cursor is never held across an instance call chain longer than one
/// allocation attempt sequence.
pub struct ParallelBufferPool {
    /// The shard instances, indexed by residue class.
    instances: Vec<BufferPoolInstance>,
    /// Next shard to try first for allocation.
    allocation_cursor: Mutex<usize>,
}

impl ParallelBufferPool {
    /// Creates a parallel pool from a validated configuration.
    pub fn new(config: BufferPoolConfig, disk: Arc<dyn DiskManager>) -> BufferResult<Self> {
        config.validate().map_err(BufferError::config)?;

        let instances = (0..config.num_instances)
            .map(|i| {
                BufferPoolInstance::new_sharded(
                    config.pool_size,
                    config.num_instances,
                    i,
                    Arc::clone(&disk),
                )
            })
            .collect();

        Ok(Self {
            instances,
            allocation_cursor: Mutex::new(0),
        })
    }

    /// Returns the number of instances.
    pub fn num_instances(&self) -> usize {
        self.instances.len()
    }

    /// Returns the instance responsible for the given page.
    fn instance_for(&self, page_id: PageId) -> &BufferPoolInstance {
        let index = page_id.as_i32().rem_euclid(self.instances.len() as i32) as usize;
        &self.instances[index]
    }

    /// Returns aggregated statistics across all instances.
    pub fn stats(&self) -> BufferPoolStats {
        let mut stats = BufferPoolStats::default();
        for instance in &self.instances {
            stats.merge(&instance.stats());
        }
        stats
    }
}

impl BufferPool for ParallelBufferPool {
    fn new_page(&self) -> BufferResult<PageHandle> {
        // The cursor mutex serializes allocation dispatch; instance mutexes
        // are taken one at a time inside the calls below.
        let mut cursor = self.allocation_cursor.lock();
        let num_instances = self.instances.len();

        for offset in 0..num_instances {
            let candidate = (*cursor + offset) % num_instances;
            match self.instances[candidate].new_page() {
                Ok(handle) => {
                    // Start the next allocation at the following shard so
                    // successive allocations spread load.
                    *cursor = (candidate + 1) % num_instances;
                    return Ok(handle);
                }
                Err(BufferError::PoolExhausted) => {
                    tracing::debug!(
                        instance = candidate,
                        "allocation refused, trying next instance"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(BufferError::PoolExhausted)
    }

    fn fetch_page(&self, page_id: PageId) -> BufferResult<PageHandle> {
        self.instance_for(page_id).fetch_page(page_id)
    }

    fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        self.instance_for(page_id).unpin_page(page_id, is_dirty)
    }

    fn flush_page(&self, page_id: PageId) -> BufferResult<bool> {
        self.instance_for(page_id).flush_page(page_id)
    }

    fn flush_all_pages(&self) -> BufferResult<()> {
        for instance in &self.instances {
            instance.flush_all_pages()?;
        }
        Ok(())
    }

    fn delete_page(&self, page_id: PageId) -> BufferResult<bool> {
        self.instance_for(page_id).delete_page(page_id)
    }

    fn pool_size(&self) -> usize {
        self.instances
            .iter()
            .map(BufferPool::pool_size)
            .sum()
    }
}

impl std::fmt::Debug for ParallelBufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelBufferPool")
            .field("num_instances", &self.instances.len())
            .field("pool_size", &self.pool_size())
            .finish()
    }
}
