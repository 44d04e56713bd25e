use criterion::{criterion_group, criterion_main, Criterion, BenchmarkId};
use rand::prelude::*;

use std::sync::Arc;
use manuldb::storage::buffer::BufferPoolManager;

// Create temporary db for benchmarking
fn create_bench_buffer_pool(pool_size: usize) -> Arc<BufferPoolManager> {
    let temp_file = tempfile::NamedTempFile::new().unwrap();
    let path = temp_file.path().to_str().unwrap().to_string();
    let buffer_pool = Arc::new(BufferPoolManager::new(pool_size, 2, path).unwrap());

    // Keep the temp file alive
    std::mem::forget(temp_file);

    buffer_pool
}

// Generate test data of specified size
fn generate_test_data(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

fn populate_pages(buffer_pool: &BufferPoolManager, count: usize) -> Vec<u32> {
    let payload = generate_test_data(100);
    let mut page_ids = Vec::with_capacity(count);
    for _ in 0..count {
        let (page, page_id) = buffer_pool.new_page().unwrap();
        {
            let mut page_guard = page.write();
            page_guard.data[..payload.len()].copy_from_slice(&payload);
        }
        buffer_pool.unpin_page(page_id, true).unwrap();
        page_ids.push(page_id);
    }
    page_ids
}

fn buffer_pool_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("BufferPool");

    // Test with different buffer pool sizes
    for size in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("sequential_access", size), size, |b, &size| {
            let buffer_pool = create_bench_buffer_pool(size as usize);
            let page_ids = populate_pages(&buffer_pool, size as usize);

            // Benchmark sequential access pattern
            b.iter(|| {
                for &page_id in &page_ids {
                    let page = buffer_pool.fetch_page(page_id).unwrap();

                    // Read something from the page
                    {
                        let _page_guard = page.read();
                    }

                    buffer_pool.unpin_page(page_id, false).unwrap();
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("random_access", size), size, |b, &size| {
            let buffer_pool = create_bench_buffer_pool(size as usize);
            let page_ids = populate_pages(&buffer_pool, size as usize);

            // Create random access pattern
            let mut rng = rand::thread_rng();
            let random_indices: Vec<usize> = (0..size as usize)
                .map(|_| rng.gen_range(0..size as usize))
                .collect();

            // Benchmark random access pattern
            b.iter(|| {
                for &idx in &random_indices {
                    let page_id = page_ids[idx];
                    let page = buffer_pool.fetch_page(page_id).unwrap();

                    {
                        let _page_guard = page.read();
                    }

                    buffer_pool.unpin_page(page_id, false).unwrap();
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("working_set_eviction", size), size, |b, &size| {
            // Pool half the size of the page set, so fetches contend with
            // the replacer and half the accesses miss
            let buffer_pool = create_bench_buffer_pool((size as usize / 2).max(1));
            let page_ids = populate_pages(&buffer_pool, size as usize);

            b.iter(|| {
                for &page_id in &page_ids {
                    let page = buffer_pool.fetch_page(page_id).unwrap();

                    {
                        let _page_guard = page.read();
                    }

                    buffer_pool.unpin_page(page_id, false).unwrap();
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, buffer_pool_benchmark);
criterion_main!(benches);
