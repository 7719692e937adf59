//! End-to-end buffer pool scenarios.

use std::sync::Arc;
use std::thread;

use cairn_common::constants::PAGE_SIZE;
use cairn_common::types::PageId;
use cairn_storage::buffer::{
    BufferError, BufferPool, BufferPoolConfig, BufferPoolInstance, ParallelBufferPool,
};
use cairn_storage::disk::{DiskManager, FileDiskManager};
use tempfile::tempdir;

fn open_disk(dir: &tempfile::TempDir) -> Arc<dyn DiskManager> {
    Arc::new(FileDiskManager::open(dir.path().join("test.db")).unwrap())
}

#[test]
fn pool_sizing() {
    let dir = tempdir().unwrap();
    let pool = BufferPoolInstance::new(10, open_disk(&dir));

    // Ten allocations fill the pool with distinct, pinned pages.
    let mut page_ids = Vec::new();
    for _ in 0..10 {
        let page = pool.new_page().unwrap();
        page_ids.push(page.page_id());
    }
    let mut unique = page_ids.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), 10);

    // The eleventh allocation finds every frame pinned.
    assert!(matches!(pool.new_page(), Err(BufferError::PoolExhausted)));

    // One unpin is enough for the next allocation to succeed.
    assert!(pool.unpin_page(page_ids[4], false));
    assert!(pool.new_page().is_ok());
}

#[test]
fn victim_policy_follows_unpin_order() {
    let dir = tempdir().unwrap();
    let pool = BufferPoolInstance::new(3, open_disk(&dir));

    let a = pool.new_page().unwrap().page_id();
    let b = pool.new_page().unwrap().page_id();
    let c = pool.new_page().unwrap().page_id();

    pool.unpin_page(a, false);
    pool.unpin_page(b, false);

    // The next allocation evicts `a`, the frame unpinned first.
    let d = pool.new_page().unwrap();
    assert_ne!(d.page_id(), a);

    // `b` and `c` stay resident: fetching them is a hit and pins them.
    let fetched_b = pool.fetch_page(b).unwrap();
    assert_eq!(fetched_b.page_id(), b);
    pool.unpin_page(b, false);
    let fetched_c = pool.fetch_page(c).unwrap();
    assert_eq!(fetched_c.page_id(), c);
    pool.unpin_page(c, false);
    pool.unpin_page(c, false);
    pool.unpin_page(d.page_id(), false);

    // `a` is gone from the pool; fetching it needs a disk read.
    let stats_before = pool.stats();
    let fetched_a = pool.fetch_page(a).unwrap();
    assert_eq!(fetched_a.page_id(), a);
    let stats_after = pool.stats();
    assert_eq!(stats_after.misses - stats_before.misses, 1);
}

#[test]
fn eviction_writes_dirty_page_back() {
    let dir = tempdir().unwrap();
    let disk = open_disk(&dir);
    let pool = BufferPoolInstance::new(1, Arc::clone(&disk));

    let page = pool.new_page().unwrap();
    let page_id = page.page_id();
    page.data_mut()[0..8].copy_from_slice(b"evict me");
    pool.unpin_page(page_id, true);

    // A second allocation reuses the single frame and writes `page` back.
    let other = pool.new_page().unwrap();
    assert_ne!(other.page_id(), page_id);

    // The bytes reached the disk manager.
    let mut on_disk = vec![0u8; PAGE_SIZE];
    disk.read_page(page_id, &mut on_disk).unwrap();
    assert_eq!(&on_disk[0..8], b"evict me");

    // And a refetch observes them through the pool.
    pool.unpin_page(other.page_id(), false);
    let refetched = pool.fetch_page(page_id).unwrap();
    assert_eq!(&refetched.data()[0..8], b"evict me");
}

#[test]
fn parallel_page_ids_form_residue_progressions() {
    let dir = tempdir().unwrap();
    let config = BufferPoolConfig::new(5).with_instances(4);
    let pool = ParallelBufferPool::new(config, open_disk(&dir)).unwrap();

    let mut ids_by_residue: Vec<Vec<i32>> = vec![Vec::new(); 4];
    for _ in 0..20 {
        let page = pool.new_page().unwrap();
        let id = page.page_id().as_i32();
        ids_by_residue[(id % 4) as usize].push(id);
        pool.unpin_page(page.page_id(), false);
    }

    for (residue, ids) in ids_by_residue.iter().enumerate() {
        assert_eq!(ids.len(), 5, "residue {residue} owns five pages");
        for window in ids.windows(2) {
            assert_eq!(window[1] - window[0], 4);
        }
        assert_eq!(ids[0] % 4, residue as i32);
    }
}

#[test]
fn delete_page_respects_pins() {
    let dir = tempdir().unwrap();
    let pool = BufferPoolInstance::new(4, open_disk(&dir));

    let page = pool.new_page().unwrap();
    let page_id = page.page_id();

    // Pinned pages cannot be deleted and stay resident.
    assert!(!pool.delete_page(page_id).unwrap());
    let same = pool.fetch_page(page_id).unwrap();
    assert_eq!(same.frame_id(), page.frame_id());
    pool.unpin_page(page_id, false);
    pool.unpin_page(page_id, false);

    assert!(pool.delete_page(page_id).unwrap());
    // Deleting an absent page reports success.
    assert!(pool.delete_page(page_id).unwrap());
}

#[test]
fn refetch_without_pressure_keeps_the_frame() {
    let dir = tempdir().unwrap();
    let pool = BufferPoolInstance::new(4, open_disk(&dir));

    let page = pool.new_page().unwrap();
    let page_id = page.page_id();
    let frame_id = page.frame_id();
    pool.unpin_page(page_id, false);

    let again = pool.fetch_page(page_id).unwrap();
    assert_eq!(again.frame_id(), frame_id);
    pool.unpin_page(page_id, false);
}

#[test]
fn random_page_contents_round_trip() {
    use rand::Rng;

    let dir = tempdir().unwrap();
    let disk = open_disk(&dir);
    let pool = BufferPoolInstance::new(2, Arc::clone(&disk));
    let mut rng = rand::thread_rng();

    // Three pages of random bytes cycle through a two-frame pool.
    let mut expected = Vec::new();
    for _ in 0..3 {
        let page = pool.new_page().unwrap();
        let mut bytes = vec![0u8; PAGE_SIZE];
        rng.fill(&mut bytes[..]);
        page.data_mut().copy_from_slice(&bytes);
        expected.push((page.page_id(), bytes));
        pool.unpin_page(page.page_id(), true);
    }

    for (page_id, bytes) in &expected {
        let page = pool.fetch_page(*page_id).unwrap();
        assert_eq!(&page.data()[..], &bytes[..]);
        pool.unpin_page(*page_id, false);
    }
}

#[test]
fn flushed_pages_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("reopen.db");
    let mut expected = Vec::new();

    {
        let disk = Arc::new(FileDiskManager::open(&path).unwrap());
        let pool = BufferPoolInstance::new(8, disk);
        for i in 0..6u8 {
            let page = pool.new_page().unwrap();
            page.data_mut()[..4].copy_from_slice(&[i, i, i, i]);
            expected.push(page.page_id());
            pool.unpin_page(page.page_id(), true);
        }
        pool.flush_all_pages().unwrap();
    }

    let disk = Arc::new(FileDiskManager::open(&path).unwrap());
    let pool = BufferPoolInstance::new(8, disk);
    for (i, page_id) in expected.iter().enumerate() {
        let page = pool.fetch_page(*page_id).unwrap();
        assert_eq!(&page.data()[..4], &[i as u8; 4]);
        pool.unpin_page(*page_id, false);
    }
}

#[test]
fn concurrent_fetches_across_shards() {
    let dir = tempdir().unwrap();
    let config = BufferPoolConfig::new(8).with_instances(4);
    let pool = Arc::new(ParallelBufferPool::new(config, open_disk(&dir)).unwrap());

    // Seed one page per shard with a recognizable payload.
    let mut page_ids = Vec::new();
    for _ in 0..4 {
        let page = pool.new_page().unwrap();
        let id = page.page_id();
        page.data_mut()[..4].copy_from_slice(&id.as_i32().to_le_bytes());
        pool.unpin_page(id, true);
        page_ids.push(id);
    }

    let mut handles = Vec::new();
    for &page_id in &page_ids {
        let pool = Arc::clone(&pool);
        handles.push(thread::spawn(move || {
            for _ in 0..200 {
                let page = pool.fetch_page(page_id).unwrap();
                assert_eq!(&page.data()[..4], &page_id.as_i32().to_le_bytes());
                assert!(pool.unpin_page(page_id, false));
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn concurrent_allocation_yields_distinct_ids() {
    let dir = tempdir().unwrap();
    let config = BufferPoolConfig::new(64).with_instances(4);
    let pool = Arc::new(ParallelBufferPool::new(config, open_disk(&dir)).unwrap());

    let mut handles = Vec::new();
    for _ in 0..4 {
        let pool = Arc::clone(&pool);
        handles.push(thread::spawn(move || {
            let mut ids = Vec::new();
            for _ in 0..32 {
                let page = pool.new_page().unwrap();
                ids.push(page.page_id());
                pool.unpin_page(page.page_id(), false);
            }
            ids
        }));
    }

    let mut all: Vec<PageId> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    let total = all.len();
    all.sort_unstable();
    all.dedup();
    assert_eq!(all.len(), total, "every allocated page ID is unique");
}
