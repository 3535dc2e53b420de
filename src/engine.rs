//! Scan coordinator: lifecycle, worker pool, backpressure, cancellation,
//! completion barrier, and the stats surface the UIs poll.

use crate::config::ScanConfig;
use crate::db::oui::MacVendorDb;
use crate::detect::hostname::HostnameResolver;
use crate::detect::mac::MacResolver;
use crate::detect::reach::ReachabilityProber;
use crate::detect::DeviceProbe;
use crate::errors::DiscoveryError;
use crate::model::{Device, DeviceStatus, StatsSnapshot, WorkerState, WorkerStatus};
use crate::net;
use crate::report::ScanReport;
use crate::worker;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex as StdMutex, RwLock};
use std::time::Instant;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// The network discovery engine.
///
/// `scan` is non-blocking: it spawns a producer, a bounded worker pool and a
/// completion task, then returns. Progress is observable through [`stats`],
/// devices through the results stream and, authoritatively, [`devices`].
///
/// [`stats`]: DiscoveryEngine::stats
/// [`devices`]: DiscoveryEngine::devices
pub struct DiscoveryEngine {
    config: Arc<ScanConfig>,
    shared: Arc<Shared>,
    probes: Arc<Vec<Arc<dyn DeviceProbe>>>,
    results_rx: StdMutex<Option<mpsc::Receiver<Device>>>,
    done_rx: watch::Receiver<bool>,
}

/// State shared between the engine handle, the producer, the workers and
/// the completion task.
pub(crate) struct Shared {
    devices: RwLock<HashMap<String, Device>>,
    worker_stats: RwLock<HashMap<usize, WorkerStatus>>,
    pub(crate) total: AtomicU32,
    pub(crate) sent: AtomicU32,
    pub(crate) scanned: AtomicU32,
    running: AtomicBool,
    cancel: StdMutex<CancellationToken>,
    results_tx: mpsc::Sender<Device>,
    done_tx: watch::Sender<bool>,
    report: Option<ScanReport>,
}

impl Shared {
    pub(crate) fn update_worker(&self, id: usize, update: impl FnOnce(&mut WorkerStatus)) {
        let mut stats = write_lock(&self.worker_stats);
        if let Some(stat) = stats.get_mut(&id) {
            update(stat);
        }
    }

    pub(crate) fn remove_worker(&self, id: usize) {
        write_lock(&self.worker_stats).remove(&id);
    }

    pub(crate) fn insert_device(&self, device: Device) {
        write_lock(&self.devices).insert(device.ip.clone(), device);
    }

    pub(crate) fn try_publish(&self, device: Device) -> Result<(), TrySendError<Device>> {
        self.results_tx.try_send(device)
    }

    pub(crate) fn report(&self) -> Option<&ScanReport> {
        self.report.as_ref()
    }

    fn current_cancel(&self) -> CancellationToken {
        match self.cancel.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl DiscoveryEngine {
    /// Build an engine. In debug mode a `report.log` is created up front;
    /// failure to create it aborts startup.
    pub fn new(debug: bool) -> Result<Self, DiscoveryError> {
        Self::with_config(ScanConfig::default(), debug)
    }

    pub fn with_config(config: ScanConfig, debug: bool) -> Result<Self, DiscoveryError> {
        let config = Arc::new(config);
        let report = if debug {
            Some(ScanReport::create(Path::new("report.log"))?)
        } else {
            None
        };

        let (results_tx, results_rx) = mpsc::channel(config.results_capacity);
        let (done_tx, done_rx) = watch::channel(false);

        let vendor_db = Arc::new(Mutex::new(MacVendorDb::new()?));
        let mac = Arc::new(MacResolver::new(config.clone(), vendor_db));
        let reach: Arc<dyn DeviceProbe> =
            Arc::new(ReachabilityProber::new(config.clone(), mac.clone()));
        let hostnames: Arc<dyn DeviceProbe> = Arc::new(HostnameResolver::new(config.clone()));
        let probes = Arc::new(vec![reach, mac as Arc<dyn DeviceProbe>, hostnames]);

        let shared = Arc::new(Shared {
            devices: RwLock::new(HashMap::new()),
            worker_stats: RwLock::new(HashMap::new()),
            total: AtomicU32::new(0),
            sent: AtomicU32::new(0),
            scanned: AtomicU32::new(0),
            running: AtomicBool::new(false),
            cancel: StdMutex::new(CancellationToken::new()),
            results_tx,
            done_tx,
            report,
        });

        Ok(Self {
            config,
            shared,
            probes,
            results_rx: StdMutex::new(Some(results_rx)),
            done_rx,
        })
    }

    /// Start scanning a CIDR range with `workers` concurrent workers
    /// (`0` means the configured default). Non-blocking. Rejected while a
    /// scan is already running.
    pub fn scan(&self, cidr: &str, workers: usize) -> Result<(), DiscoveryError> {
        if self.shared.running.swap(true, Ordering::AcqRel) {
            return Err(DiscoveryError::ScanInProgress);
        }

        let ips = match net::expand_hosts(cidr) {
            Ok(ips) => ips,
            Err(err) => {
                self.shared.running.store(false, Ordering::Release);
                return Err(err);
            }
        };
        let workers = if workers == 0 {
            self.config.default_workers
        } else {
            workers
        };
        let total = ips.len() as u32;
        info!("preparing scan of {cidr}: {total} hosts, {workers} workers");

        // Preparing: fresh maps, counters, cancellation signal.
        write_lock(&self.shared.devices).clear();
        self.shared.total.store(total, Ordering::Release);
        self.shared.sent.store(0, Ordering::Release);
        self.shared.scanned.store(0, Ordering::Release);
        let _ = self.shared.done_tx.send(false);
        let cancel = CancellationToken::new();
        match self.shared.cancel.lock() {
            Ok(mut guard) => *guard = cancel.clone(),
            Err(poisoned) => *poisoned.into_inner() = cancel.clone(),
        }

        if let Some(report) = self.shared.report() {
            report.scan_header(cidr, workers);
        }

        // The work queue holds the whole host list so the producer never
        // blocks behind slow workers.
        let (work_tx, work_rx) = mpsc::channel::<Ipv4Addr>(ips.len().max(1));
        let work_rx = Arc::new(Mutex::new(work_rx));

        let mut pool = JoinSet::new();
        {
            let mut stats = write_lock(&self.shared.worker_stats);
            stats.clear();
            for id in 0..workers {
                stats.insert(id, WorkerStatus::starting(total));
            }
        }
        for id in 0..workers {
            pool.spawn(worker::run(
                id,
                self.shared.clone(),
                cancel.clone(),
                work_rx.clone(),
                self.probes.clone(),
            ));
        }
        info!("scan running");

        // Producer: feed addresses until done or cancelled, then close the
        // queue by dropping the sender.
        let producer_shared = self.shared.clone();
        let producer_cancel = cancel.clone();
        let queue = ips.clone();
        tokio::spawn(async move {
            for ip in queue {
                tokio::select! {
                    _ = producer_cancel.cancelled() => {
                        info!("producer cancelled, closing work queue");
                        break;
                    }
                    sent = work_tx.send(ip) => {
                        if sent.is_err() {
                            break;
                        }
                        producer_shared.sent.fetch_add(1, Ordering::AcqRel);
                    }
                }
            }
        });

        // Completion barrier: join the pool, drain the ledger, signal done.
        let done_shared = self.shared.clone();
        let done_cancel = cancel;
        tokio::spawn(async move {
            while pool.join_next().await.is_some() {}
            let cancelled = done_cancel.is_cancelled();
            info!("draining: all workers returned (cancelled: {cancelled})");

            // Credit queued-but-unprocessed addresses, and on cancellation
            // the addresses the producer never queued, so the scanned
            // counter always lands on the total.
            let sent = done_shared.sent.load(Ordering::Acquire);
            let scanned = done_shared.scanned.load(Ordering::Acquire);
            let backlog = sent.saturating_sub(scanned);
            if backlog > 0 {
                info!("crediting {backlog} unprocessed addresses");
                done_shared.scanned.fetch_add(backlog, Ordering::AcqRel);
            }
            let total = done_shared.total.load(Ordering::Acquire);
            let shortfall = total.saturating_sub(done_shared.scanned.load(Ordering::Acquire));
            if shortfall > 0 {
                done_shared.scanned.fetch_add(shortfall, Ordering::AcqRel);
            }

            // Every enumerated address keeps a terminal record, probed or
            // not.
            {
                let mut devices = write_lock(&done_shared.devices);
                for ip in &ips {
                    let key = ip.to_string();
                    devices
                        .entry(key.clone())
                        .or_insert_with(|| Device::new(key));
                }
            }

            if let Some(report) = done_shared.report() {
                report.finish();
            }
            if cancelled {
                info!("scan cancelled after {total} addresses");
            } else {
                info!("scan completed: {total} addresses");
            }
            // Clear the running flag before signalling, so a consumer that
            // reacts to `done` can start the next scan immediately.
            done_shared.running.store(false, Ordering::Release);
            let _ = done_shared.done_tx.send(true);
        });

        Ok(())
    }

    /// Cancel the scan in progress. Cooperative and idempotent: workers
    /// stop at their next dequeue, and repeated calls are no-ops.
    pub fn stop(&self) {
        info!("stop requested");
        self.shared.current_cancel().cancel();
    }

    /// Hand the single consumer the device stream and the done signal. The
    /// stream may drop updates under backpressure; completion is signalled
    /// through the watch, never through stream emptiness.
    pub fn results(&self) -> Option<(mpsc::Receiver<Device>, watch::Receiver<bool>)> {
        let receiver = match self.results_rx.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }?;
        Some((receiver, self.done_rx.clone()))
    }

    /// Snapshot of counters and per-worker state. With no live workers but
    /// recorded devices, a single synthesised `completed` entry carries the
    /// totals.
    pub fn stats(&self) -> StatsSnapshot {
        let scanned = self.shared.scanned.load(Ordering::Acquire);
        let sent = self.shared.sent.load(Ordering::Acquire);
        let total = self.shared.total.load(Ordering::Acquire);

        let devices = read_lock(&self.shared.devices);
        let discovered = devices
            .values()
            .filter(|device| device.status == DeviceStatus::Up)
            .count() as u32;
        let device_count = devices.len();
        drop(devices);

        let stats_map = read_lock(&self.shared.worker_stats);
        let mut workers = HashMap::new();
        if stats_map.is_empty() {
            if device_count > 0 {
                let now = Instant::now();
                workers.insert(
                    0,
                    WorkerStatus {
                        start_time: now,
                        last_seen: now,
                        current_ip: String::new(),
                        state: WorkerState::Completed,
                        ips_found: discovered,
                        ips_scanned: total,
                        total_ips: total,
                        sent_count: total,
                    },
                );
            }
        } else {
            for (id, stat) in stats_map.iter() {
                let mut stat = stat.clone();
                stat.ips_scanned = scanned;
                stat.total_ips = total;
                stat.sent_count = sent;
                workers.insert(*id, stat);
            }
        }

        StatsSnapshot {
            workers,
            scanned,
            sent,
            total,
            discovered,
        }
    }

    /// Authoritative device map for the last (or running) scan, in address
    /// order.
    pub fn devices(&self) -> Vec<Device> {
        let devices = read_lock(&self.shared.devices);
        let mut list: Vec<Device> = devices.values().cloned().collect();
        drop(devices);
        list.sort_by_key(|device| {
            device
                .ip
                .parse::<Ipv4Addr>()
                .map(u32::from)
                .unwrap_or(u32::MAX)
        });
        list
    }

    /// Whether a scan is currently in flight.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }
}

fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
