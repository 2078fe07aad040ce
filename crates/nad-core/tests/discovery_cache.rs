mod common;

use common::start_simulator;
use nad_core::{
    discover, scan, DiscoveredDevice, DiscoveryCache, ScanOptions, ScanTargets, DEFAULT_CACHE_TTL,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn hosts(list: &[&str], port: u16) -> ScanOptions {
    ScanOptions {
        targets: ScanTargets::Hosts(list.iter().map(|h| h.to_string()).collect()),
        port,
        probe_timeout: Duration::from_millis(500),
        max_concurrent: 8,
        deadline: Duration::from_secs(3),
    }
}

#[tokio::test]
async fn cached_entry_is_served_then_scan_after_delete() {
    let dir = tempfile::tempdir().unwrap();
    let cache = DiscoveryCache::new(dir.path().join(".nadctl_cache.json"));
    let seeded = DiscoveredDevice::new("192.168.1.77", 30001, "NAD C 658");
    cache.save(&[seeded.clone()], DEFAULT_CACHE_TTL).unwrap();

    // Nothing listens on this port, so a scan can only come back empty.
    let unused = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = unused.local_addr().unwrap().port();
    drop(unused);
    let options = hosts(&["127.0.0.1"], port);
    let cancel = CancellationToken::new();

    let outcome = discover(&cache, &options, true, DEFAULT_CACHE_TTL, &cancel)
        .await
        .unwrap();
    assert!(outcome.from_cache);
    assert_eq!(outcome.devices, vec![seeded]);

    std::fs::remove_file(cache.path()).unwrap();
    let outcome = discover(&cache, &options, true, DEFAULT_CACHE_TTL, &cancel)
        .await
        .unwrap();
    assert!(!outcome.from_cache);
    assert!(outcome.devices.is_empty());
    // Empty scans are not persisted.
    assert!(!cache.path().exists());
}

#[tokio::test]
async fn scan_finds_simulator_and_persists_it() {
    let sim = start_simulator().await;
    let dir = tempfile::tempdir().unwrap();
    let cache = DiscoveryCache::new(dir.path().join("cache.json"));
    let options = hosts(&["127.0.0.1", "127.0.0.1"], sim.local_addr().port());

    let outcome = discover(&cache, &options, false, DEFAULT_CACHE_TTL, &CancellationToken::new())
        .await
        .unwrap();
    assert!(!outcome.from_cache);
    assert_eq!(outcome.devices.len(), 1, "duplicates collapse by address");
    assert_eq!(outcome.devices[0].model, "NAD T 758 V3i");

    let (cached, fresh) = cache.load().unwrap();
    assert!(fresh);
    assert_eq!(cached, outcome.devices);
}

#[tokio::test]
async fn refresh_bypasses_a_fresh_cache() {
    let sim = start_simulator().await;
    let dir = tempfile::tempdir().unwrap();
    let cache = DiscoveryCache::new(dir.path().join("cache.json"));
    cache
        .save(
            &[DiscoveredDevice::new("10.9.9.9", 30001, "NAD M10")],
            DEFAULT_CACHE_TTL,
        )
        .unwrap();

    let options = hosts(&["127.0.0.1"], sim.local_addr().port());
    let outcome = discover(&cache, &options, false, DEFAULT_CACHE_TTL, &CancellationToken::new())
        .await
        .unwrap();
    assert!(!outcome.from_cache);
    assert_eq!(outcome.devices[0].address, "127.0.0.1");

    // The record is replaced, never merged.
    let record = cache.read_record().unwrap().unwrap();
    assert_eq!(record.devices.len(), 1);
    assert_eq!(record.devices[0].address, "127.0.0.1");
}

#[tokio::test]
async fn deadline_returns_partial_results() {
    let sim = start_simulator().await;
    // 192.0.2.0/24 is reserved for documentation and never answers.
    let mut options = hosts(&["127.0.0.1", "192.0.2.1", "192.0.2.2"], sim.local_addr().port());
    options.probe_timeout = Duration::from_secs(30);
    options.deadline = Duration::from_millis(800);

    let started = std::time::Instant::now();
    let devices = scan(&options, &CancellationToken::new()).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].address, "127.0.0.1");
}
