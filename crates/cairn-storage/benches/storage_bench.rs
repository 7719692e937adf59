//! Storage benchmarks.

use std::sync::Arc;

use cairn_storage::buffer::{BufferPool, BufferPoolConfig, BufferPoolInstance, ParallelBufferPool};
use cairn_storage::disk::FileDiskManager;
use cairn_storage::hash::ExtendibleHashTable;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tempfile::tempdir;

fn fetch_hit_benchmark(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let disk = Arc::new(FileDiskManager::open(dir.path().join("bench.db")).unwrap());
    let pool = BufferPoolInstance::new(64, disk);

    let page_id = {
        let page = pool.new_page().unwrap();
        let id = page.page_id();
        pool.unpin_page(id, false);
        id
    };

    c.bench_function("fetch_hit_unpin", |b| {
        b.iter(|| {
            let page = pool.fetch_page(page_id).unwrap();
            black_box(page.frame_id());
            pool.unpin_page(page_id, false);
        })
    });
}

fn eviction_cycle_benchmark(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let disk = Arc::new(FileDiskManager::open(dir.path().join("bench.db")).unwrap());
    let pool = BufferPoolInstance::new(8, disk);

    // More pages than frames, so fetches in sequence keep evicting.
    let mut page_ids = Vec::new();
    for _ in 0..32 {
        let page = pool.new_page().unwrap();
        page_ids.push(page.page_id());
        pool.unpin_page(page.page_id(), false);
    }

    c.bench_function("fetch_with_eviction_32_over_8", |b| {
        b.iter(|| {
            for &page_id in &page_ids {
                let page = pool.fetch_page(page_id).unwrap();
                black_box(page.frame_id());
                pool.unpin_page(page_id, false);
            }
        })
    });
}

fn hash_insert_benchmark(c: &mut Criterion) {
    c.bench_function("hash_insert_1000", |b| {
        b.iter(|| {
            let dir = tempdir().unwrap();
            let disk = Arc::new(FileDiskManager::open(dir.path().join("bench.db")).unwrap());
            let config = BufferPoolConfig::new(64);
            let pool = Arc::new(ParallelBufferPool::new(config, disk).unwrap());
            let table: ExtendibleHashTable<i32, i32> =
                ExtendibleHashTable::new("bench", pool).unwrap();
            for i in 0..1000 {
                table.insert(&i, &i).unwrap();
            }
            black_box(table.global_depth().unwrap())
        })
    });
}

fn hash_lookup_benchmark(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let disk = Arc::new(FileDiskManager::open(dir.path().join("bench.db")).unwrap());
    let config = BufferPoolConfig::new(64);
    let pool = Arc::new(ParallelBufferPool::new(config, disk).unwrap());
    let table: ExtendibleHashTable<i32, i32> =
        ExtendibleHashTable::new("bench", pool).unwrap();
    for i in 0..1000 {
        table.insert(&i, &i).unwrap();
    }

    c.bench_function("hash_lookup_1000", |b| {
        b.iter(|| {
            for i in 0..1000 {
                black_box(table.get_value(&i).unwrap());
            }
        })
    });
}

criterion_group!(
    benches,
    fetch_hit_benchmark,
    eviction_cycle_benchmark,
    hash_insert_benchmark,
    hash_lookup_benchmark,
);
criterion_main!(benches);
