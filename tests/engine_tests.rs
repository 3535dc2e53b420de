//! Engine lifecycle tests. Targets live in TEST-NET space so nothing
//! answers; the invariants under test hold regardless of what the local
//! network looks like.

use lanventory::{DeviceStatus, DiscoveryEngine, DiscoveryError, WorkerState};
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::timeout;

const DONE_WAIT: Duration = Duration::from_secs(120);

#[tokio::test]
async fn scan_rejects_invalid_cidr() {
    let engine = DiscoveryEngine::new(false).unwrap();
    let err = engine.scan("not-a-network", 4).unwrap_err();
    assert!(matches!(err, DiscoveryError::InvalidCidr(_)));
    assert!(!engine.is_running());
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_scans_are_rejected() {
    let engine = DiscoveryEngine::new(false).unwrap();
    engine.scan("192.0.2.0/28", 2).unwrap();

    let err = engine.scan("192.0.2.0/28", 2).unwrap_err();
    assert!(matches!(err, DiscoveryError::ScanInProgress));

    let (_device_rx, mut done_rx) = engine.results().unwrap();
    engine.stop();
    timeout(DONE_WAIT, done_rx.wait_for(|done| *done))
        .await
        .expect("done signal in time")
        .unwrap();
    assert!(!engine.is_running());
}

#[tokio::test(flavor = "multi_thread")]
async fn scan_records_one_outcome_per_host() {
    let engine = DiscoveryEngine::new(false).unwrap();
    engine.scan("192.0.2.0/29", 4).unwrap();

    let (mut device_rx, mut done_rx) = engine.results().unwrap();
    timeout(DONE_WAIT, done_rx.wait_for(|done| *done))
        .await
        .expect("done signal in time")
        .unwrap();

    let stats = engine.stats();
    assert_eq!(stats.total, 6);
    assert_eq!(stats.scanned, 6);

    let devices = engine.devices();
    assert_eq!(devices.len(), 6);
    let recorded: HashSet<&str> = devices.iter().map(|d| d.ip.as_str()).collect();
    for host in 1..=6 {
        assert!(recorded.contains(format!("192.0.2.{host}").as_str()));
    }

    for device in &devices {
        assert!(
            device.open_ports.windows(2).all(|pair| pair[0] < pair[1]),
            "open ports of {} are not strictly ascending",
            device.ip
        );
        if !device.mac.is_empty() {
            assert_eq!(device.mac, device.mac.to_uppercase());
            assert_eq!(device.mac.split(':').count(), 6);
        }
        for name in &device.hostnames {
            assert!(
                lanventory::detect::is_valid_hostname(name),
                "{name:?} failed hostname validation"
            );
        }
        if device.status == DeviceStatus::Down {
            assert!(device.open_ports.is_empty());
        }
    }

    // Whatever reached the stream must be an Up entry of the device map.
    let up: HashSet<String> = devices
        .iter()
        .filter(|d| d.status == DeviceStatus::Up)
        .map(|d| d.ip.clone())
        .collect();
    while let Ok(device) = device_rx.try_recv() {
        assert!(up.contains(&device.ip));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn cancellation_drains_to_the_full_total() {
    let engine = DiscoveryEngine::new(false).unwrap();
    engine.scan("198.51.100.0/24", 50).unwrap();
    let (_device_rx, mut done_rx) = engine.results().unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    engine.stop();

    timeout(DONE_WAIT, done_rx.wait_for(|done| *done))
        .await
        .expect("done signal in time")
        .unwrap();

    let stats = engine.stats();
    assert_eq!(stats.total, 254);
    assert_eq!(stats.scanned, 254);
    assert_eq!(engine.devices().len(), 254);

    // No live worker remains; at most the synthesised completed entry.
    assert!(stats
        .workers
        .values()
        .all(|worker| worker.state == WorkerState::Completed));

    // A second stop is a no-op.
    engine.stop();
    assert!(!engine.is_running());
}

#[tokio::test(flavor = "multi_thread")]
async fn scan_can_restart_after_completion() {
    let engine = DiscoveryEngine::new(false).unwrap();
    engine.scan("192.0.2.0/31", 2).unwrap();
    let (_device_rx, mut done_rx) = engine.results().unwrap();
    timeout(DONE_WAIT, done_rx.wait_for(|done| *done))
        .await
        .expect("first scan done")
        .unwrap();
    assert_eq!(engine.stats().total, 2);

    engine.scan("192.0.2.4/31", 2).unwrap();
    // Preparing resets the done signal synchronously.
    assert!(!*done_rx.borrow());
    timeout(DONE_WAIT, done_rx.wait_for(|done| *done))
        .await
        .expect("second scan done")
        .unwrap();

    let recorded: HashSet<String> = engine.devices().iter().map(|d| d.ip.clone()).collect();
    assert_eq!(recorded.len(), 2);
    assert!(recorded.contains("192.0.2.4"));
    assert!(recorded.contains("192.0.2.5"));
}
