use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use opgraph::{Digest, ImageResolver, Platform, ResolvedImage, ResolverCache};

struct CountingResolver {
    calls: AtomicUsize,
    fail: bool,
}

impl ImageResolver for CountingResolver {
    fn resolve(&self, reference: &str) -> Result<ResolvedImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // hold the flight open long enough for other lookups to pile up
        thread::sleep(Duration::from_millis(50));
        if self.fail {
            anyhow::bail!("no such image {reference}");
        }
        Ok(ResolvedImage {
            digest: Digest::from_bytes(reference.as_bytes()),
            platform: Platform::linux_amd64(),
        })
    }
}

#[test]
fn concurrent_misses_coalesce_to_one_request() {
    let resolver = Arc::new(CountingResolver {
        calls: AtomicUsize::new(0),
        fail: false,
    });
    let cache = Arc::new(ResolverCache::new());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let resolver = resolver.clone();
        let cache = cache.clone();
        handles.push(thread::spawn(move || {
            cache.resolve(resolver.as_ref(), "alpine").unwrap()
        }));
    }
    let results: Vec<ResolvedImage> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    for r in &results {
        assert_eq!(r.digest, results[0].digest);
    }
}

#[test]
fn hits_are_reused_across_the_run() {
    let resolver = CountingResolver {
        calls: AtomicUsize::new(0),
        fail: false,
    };
    let cache = ResolverCache::new();
    cache.resolve(&resolver, "alpine").unwrap();
    cache.resolve(&resolver, "alpine").unwrap();
    cache.resolve(&resolver, "ubuntu").unwrap();
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn failed_lookups_can_be_retried() {
    let resolver = CountingResolver {
        calls: AtomicUsize::new(0),
        fail: true,
    };
    let cache = ResolverCache::new();
    assert!(cache.resolve(&resolver, "alpine").is_err());
    assert!(cache.resolve(&resolver, "alpine").is_err());
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
}
