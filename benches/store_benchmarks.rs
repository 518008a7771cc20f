use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tiercache::config::{Lru2Config, LruConfig};
use tiercache::{Lru2Store, LruStore};

// Helper functions to create pre-warmed stores
fn make_lru(max_bytes: u64) -> LruStore<Vec<u8>> {
    LruStore::new(LruConfig::default().max_bytes(max_bytes))
}

fn make_lru2(buckets: u32, cap: u32, tier2: u32) -> Lru2Store<i32> {
    Lru2Store::new(
        Lru2Config::default()
            .buckets(buckets)
            .cap_per_bucket(cap)
            .tier2_cap(tier2),
    )
}

pub fn criterion_benchmark(c: &mut Criterion) {
    const STORE_SIZE: usize = 1000;
    let keys: Vec<String> = (0..STORE_SIZE).map(|i| format!("key{i}")).collect();
    let misses: Vec<String> = (0..STORE_SIZE).map(|i| format!("absent{i}")).collect();
    let mut group = c.benchmark_group("Store Operations");

    // Byte-budgeted LRU benchmarks
    {
        // Budget comfortably above the working set: hits never evict.
        let store = make_lru(1024 * 1024);
        for key in &keys {
            store.set(key, vec![0u8; 64]).unwrap();
        }

        group.bench_function("LRU get hit", |b| {
            b.iter(|| {
                for i in 0..100 {
                    black_box(store.get(&keys[i % STORE_SIZE]));
                }
            });
        });

        group.bench_function("LRU get miss", |b| {
            b.iter(|| {
                for i in 0..100 {
                    black_box(store.get(&misses[i % STORE_SIZE]));
                }
            });
        });

        group.bench_function("LRU set existing", |b| {
            b.iter(|| {
                for i in 0..100 {
                    black_box(store.set(&keys[i % STORE_SIZE], vec![0u8; 64])).unwrap();
                }
            });
        });
    }

    // Byte-budgeted LRU under eviction pressure
    {
        // Budget holds roughly half the working set, so inserts keep
        // dropping the cold end.
        let store = make_lru(500 * 70);
        for key in &keys {
            store.set(key, vec![0u8; 64]).unwrap();
        }

        group.bench_function("LRU set evicting", |b| {
            b.iter(|| {
                for i in 0..100 {
                    black_box(store.set(&keys[i % STORE_SIZE], vec![0u8; 64])).unwrap();
                }
            });
        });
    }

    // Sharded two-tier benchmarks
    {
        let store = make_lru2(16, 512, 256);
        for (i, key) in keys.iter().enumerate() {
            store.set(key, i as i32).unwrap();
        }

        group.bench_function("LRU-2 get hit", |b| {
            b.iter(|| {
                for i in 0..100 {
                    black_box(store.get(&keys[i % STORE_SIZE]));
                }
            });
        });

        group.bench_function("LRU-2 get miss", |b| {
            b.iter(|| {
                for i in 0..100 {
                    black_box(store.get(&misses[i % STORE_SIZE]));
                }
            });
        });

        group.bench_function("LRU-2 set existing", |b| {
            b.iter(|| {
                for i in 0..100 {
                    black_box(store.set(&keys[i % STORE_SIZE], i as i32)).unwrap();
                }
            });
        });
    }

    // Sharded two-tier under recycle pressure
    {
        // Tiers hold a fraction of the working set, so inserts constantly
        // recycle probation slots.
        let store = make_lru2(4, 64, 64);
        for (i, key) in keys.iter().enumerate() {
            store.set(key, i as i32).unwrap();
        }

        group.bench_function("LRU-2 set recycling", |b| {
            b.iter(|| {
                for i in 0..100 {
                    black_box(store.set(&keys[i % STORE_SIZE], i as i32)).unwrap();
                }
            });
        });
    }

    // Mixed workload: the common cache profile of mostly reads
    {
        let lru = make_lru(1024 * 1024);
        let lru2 = make_lru2(16, 512, 256);
        for (i, key) in keys.iter().enumerate() {
            lru.set(key, vec![0u8; 64]).unwrap();
            lru2.set(key, i as i32).unwrap();
        }

        group.bench_function("LRU mixed 90/10", |b| {
            b.iter(|| {
                for i in 0..100 {
                    if i % 10 == 9 {
                        black_box(lru.set(&keys[i % STORE_SIZE], vec![0u8; 64])).unwrap();
                    } else {
                        black_box(lru.get(&keys[i % STORE_SIZE]));
                    }
                }
            });
        });

        group.bench_function("LRU-2 mixed 90/10", |b| {
            b.iter(|| {
                for i in 0..100 {
                    if i % 10 == 9 {
                        black_box(lru2.set(&keys[i % STORE_SIZE], i as i32)).unwrap();
                    } else {
                        black_box(lru2.get(&keys[i % STORE_SIZE]));
                    }
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
