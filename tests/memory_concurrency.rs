// ==============================================
// MEMORY CACHE CONCURRENCY TESTS (integration)
// ==============================================
//
// Many threads hammering one MemCache through the ObjectCache contract.
// After the writers stop, the collector must bring the cache back under its
// cap and the byte counter must match the objects that are still present.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use edgecache::cache::MemCache;
use edgecache::traits::{EvictionIndex, ObjectCache};
use edgecache::CacheObject;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn obj(len: usize) -> Arc<CacheObject> {
    Arc::new(CacheObject::from_body(vec![0xAB; len]))
}

fn wait_under_cap(cache: &dyn ObjectCache) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while cache.size() > cache.capacity() {
        assert!(
            Instant::now() < deadline,
            "size {} never dropped under capacity {}",
            cache.size(),
            cache.capacity()
        );
        thread::sleep(Duration::from_millis(2));
    }
}

fn present_bytes(cache: &dyn ObjectCache) -> u64 {
    cache
        .keys()
        .iter()
        .filter_map(|key| cache.peek(key))
        .map(|obj| obj.size)
        .sum()
}

// ==============================================
// Concrete overflow scenario
// ==============================================

mod overflow_scenario {
    use super::*;

    fn run(cache: &dyn ObjectCache) {
        cache.add("a", obj(40));
        cache.add("b", obj(40));
        cache.add("c", obj(40));
        wait_under_cap(cache);

        assert!(cache.size() <= 100);
        assert!(cache.peek("c").is_some(), "newest key must survive");
        let survivors = ["a", "b"]
            .iter()
            .filter(|key| cache.peek(key).is_some())
            .count();
        assert_eq!(survivors, 1, "exactly one of a/b is evicted");
        assert!(cache.peek("a").is_none(), "the coldest key goes first");
    }

    #[test]
    fn lru_evicts_coldest_of_three() {
        run(&MemCache::lru(100));
    }

    #[test]
    fn frecency_evicts_coldest_of_three() {
        run(&MemCache::frecency(100, 1.0));
    }
}

// ==============================================
// Parallel writers and readers
// ==============================================

mod parallel {
    use super::*;

    fn hammer(cache: Arc<dyn ObjectCache>) {
        init_tracing();
        let num_threads = 8;
        let ops_per_thread = 2_000;

        let handles: Vec<_> = (0..num_threads)
            .map(|thread_id| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..ops_per_thread {
                        let key = format!("obj-{}", (thread_id * 31 + i) % 300);
                        match i % 5 {
                            0 | 1 => {
                                cache.add(&key, obj(16 + (i % 64)));
                            },
                            2 | 3 => {
                                if let Some(found) = cache.get(&key) {
                                    assert!(found.hit_count() >= 1);
                                }
                            },
                            _ => {
                                cache.remove(&key);
                            },
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("worker panicked");
        }
    }

    #[test]
    fn lru_converges_and_accounts_exactly() {
        let cache = Arc::new(MemCache::lru(4 * 1024));
        hammer(cache.clone());
        wait_under_cap(&*cache);

        assert_eq!(cache.size(), present_bytes(&*cache));
        assert_eq!(cache.len(), cache.index().len());
        cache.index().debug_validate_invariants();
    }

    #[test]
    fn frecency_converges_and_accounts_exactly() {
        let cache = Arc::new(MemCache::frecency(4 * 1024, 0.5));
        hammer(cache.clone());
        wait_under_cap(&*cache);

        assert_eq!(cache.size(), present_bytes(&*cache));
        assert_eq!(cache.len(), cache.index().len());
        cache.index().debug_validate_invariants();
    }

    #[test]
    fn readers_see_shared_objects_not_copies() {
        let cache = Arc::new(MemCache::lru(1 << 20));
        cache.add("shared", obj(10));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for _ in 0..250 {
                        cache.get("shared");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.peek("shared").unwrap().hit_count(), 1_000);
    }
}
