//! Per-IP scan worker.
//!
//! Each worker pulls addresses off the shared work queue until the queue
//! closes or the scan is cancelled, runs the probe stages in order, and
//! records exactly one terminal outcome per address.

use crate::detect::DeviceProbe;
use crate::engine::Shared;
use crate::model::{Device, DeviceStatus, WorkerState};
use std::net::Ipv4Addr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub(crate) async fn run(
    id: usize,
    shared: Arc<Shared>,
    cancel: CancellationToken,
    work_rx: Arc<Mutex<mpsc::Receiver<Ipv4Addr>>>,
    probes: Arc<Vec<Arc<dyn DeviceProbe>>>,
) {
    loop {
        // Cancellation is observed at the dequeue; an address already in
        // flight runs to its own timeouts.
        let next = {
            let mut rx = work_rx.lock().await;
            tokio::select! {
                _ = cancel.cancelled() => None,
                ip = rx.recv() => ip,
            }
        };
        let Some(ip) = next else {
            break;
        };
        let ip_str = ip.to_string();

        shared.update_worker(id, |stat| {
            stat.state = WorkerState::Scanning;
            stat.current_ip = ip_str.clone();
            stat.last_seen = Instant::now();
        });

        let mut device = Device::new(ip_str.clone());
        for stage in probes.iter() {
            if let Err(err) = stage.probe(ip, &mut device).await {
                debug!("worker {id}: {} failed for {ip_str}: {err}", stage.name());
            }
            if device.status == DeviceStatus::Down {
                break;
            }
        }

        if device.status == DeviceStatus::Up {
            debug!(
                "worker {id}: found {ip_str} mac={} vendor={} ports={:?}",
                device.mac, device.vendor, device.open_ports
            );
            shared.update_worker(id, |stat| stat.ips_found += 1);
            shared.insert_device(device.clone());
            if let Some(report) = shared.report() {
                report.append(&device);
            }
            // The stream is a low-latency notification channel; the device
            // map stays authoritative when the consumer lags.
            if shared.try_publish(device).is_err() {
                warn!("worker {id}: results channel full, {ip_str} dropped from stream");
            }
        } else {
            shared.insert_device(device);
        }

        let scanned = shared.scanned.fetch_add(1, Ordering::AcqRel) + 1;
        let total = shared.total.load(Ordering::Acquire);
        debug!("worker {id}: completed {ip_str} ({scanned}/{total})");

        shared.update_worker(id, |stat| {
            stat.state = WorkerState::Idle;
            stat.current_ip = "waiting".to_string();
            stat.last_seen = Instant::now();
            stat.ips_scanned = scanned;
            stat.total_ips = total;
            stat.sent_count = shared.sent.load(Ordering::Acquire);
        });
    }

    shared.remove_worker(id);
}
