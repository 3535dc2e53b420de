use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

/// One probed address. Every enumerated address ends up with exactly one
/// record per scan; only reachable hosts travel the results stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    /// Dotted-quad IPv4 address.
    pub ip: String,
    pub status: DeviceStatus,
    /// Open TCP ports (plus 5353 when the host answered the mDNS probe),
    /// ascending and de-duplicated. Empty for `Down` hosts.
    pub open_ports: Vec<u16>,
    /// Canonical `XX:XX:XX:XX:XX:XX` form, or empty when ARP found nothing.
    pub mac: String,
    /// OUI vendor, `"Unknown Vendor"` for an unrecognised prefix, empty when
    /// there is no MAC.
    pub vendor: String,
    /// Reverse-DNS or protocol-derived names, best match first.
    pub hostnames: Vec<String>,
    /// Name taken from mDNS records, independent of `hostnames`.
    pub mdns_name: String,
    /// Service type (e.g. `_airplay._tcp`) to a short info string.
    pub mdns_services: HashMap<String, String>,
    pub device_type: DeviceType,
}

impl Device {
    /// Fresh record for an address that has not answered anything yet.
    pub fn new(ip: String) -> Self {
        Self {
            ip,
            status: DeviceStatus::Down,
            open_ports: Vec::new(),
            mac: String::new(),
            vendor: String::new(),
            hostnames: Vec::new(),
            mdns_name: String::new(),
            mdns_services: HashMap::new(),
            device_type: DeviceType::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    Up,
    Down,
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceStatus::Up => write!(f, "Up"),
            DeviceStatus::Down => write!(f, "Down"),
        }
    }
}

/// Coarse Apple heuristic derived from vendor, AFP, mDNS services and
/// signal ports. Distinct from the OUI vendor string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceType {
    #[default]
    Unknown,
    PossibleApple,
    Apple,
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceType::Unknown => Ok(()),
            DeviceType::PossibleApple => write!(f, "Possible Apple"),
            DeviceType::Apple => write!(f, "Apple"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Starting,
    Scanning,
    Idle,
    Completed,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerState::Starting => write!(f, "starting"),
            WorkerState::Scanning => write!(f, "scanning"),
            WorkerState::Idle => write!(f, "idle"),
            WorkerState::Completed => write!(f, "completed"),
        }
    }
}

/// Live state of one pool worker. Entries are created when the pool spawns
/// and removed when the worker returns.
#[derive(Debug, Clone)]
pub struct WorkerStatus {
    pub start_time: Instant,
    pub last_seen: Instant,
    /// Address currently under probe, or `"waiting"`.
    pub current_ip: String,
    pub state: WorkerState,
    pub ips_found: u32,
    pub ips_scanned: u32,
    pub total_ips: u32,
    pub sent_count: u32,
}

impl WorkerStatus {
    pub fn starting(total_ips: u32) -> Self {
        let now = Instant::now();
        Self {
            start_time: now,
            last_seen: now,
            current_ip: "waiting".to_string(),
            state: WorkerState::Starting,
            ips_found: 0,
            ips_scanned: 0,
            total_ips,
            sent_count: 0,
        }
    }
}

/// Read-only progress view for UI layers polling on a timer.
#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    pub workers: HashMap<usize, WorkerStatus>,
    pub scanned: u32,
    pub sent: u32,
    pub total: u32,
    pub discovered: u32,
}
