use std::time::Duration;

/// Tunables for one discovery engine. The defaults carry the probe matrix
/// the scanner ships with; UI layers normally only override `default_workers`.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// TCP ports probed for reachability, each with `connect_timeout`.
    pub common_ports: Vec<u16>,

    /// Timeout for one reachability connect attempt.
    pub connect_timeout: Duration,

    /// Apple-signal TCP ports with their individual, longer timeouts
    /// (AFP in particular answers slowly).
    pub apple_ports: Vec<(u16, Duration)>,

    /// Read timeout for the UDP 5353 liveness probe.
    pub mdns_probe_timeout: Duration,

    /// TCP ports touched (and immediately dropped) purely to coax the kernel
    /// into ARP-resolving a host.
    pub arp_stimulus_ports: Vec<u16>,

    /// Timeout per stimulus connect.
    pub arp_stimulus_timeout: Duration,

    /// Pause between the stimulus and the ARP table read, so the kernel
    /// cache can settle.
    pub arp_settle_delay: Duration,

    /// MAC resolution attempts per host, and the pause between them.
    pub mac_retries: u32,
    pub mac_retry_delay: Duration,

    /// Per-protocol timeouts for hostname resolution.
    pub afp_timeout: Duration,
    pub nbns_timeout: Duration,
    pub smb_timeout: Duration,
    pub rdp_timeout: Duration,

    /// Per-query and per-service-type budgets for Bonjour lookups.
    pub mdns_query_timeout: Duration,
    pub mdns_service_timeout: Duration,

    /// Worker pool size when the caller does not specify one.
    pub default_workers: usize,

    /// Bound of the results channel; overflow is dropped from the stream
    /// (never from the device map).
    pub results_capacity: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            common_ports: vec![22, 80, 135, 139, 443, 445, 3389, 5900, 8006, 8080],
            connect_timeout: Duration::from_millis(750),
            apple_ports: vec![
                (548, Duration::from_secs(3)),
                (5000, Duration::from_secs(1)),
                (7000, Duration::from_secs(1)),
                (3689, Duration::from_secs(1)),
            ],
            mdns_probe_timeout: Duration::from_secs(2),
            arp_stimulus_ports: vec![80, 443, 22, 445, 139, 135, 8080, 3389, 5900],
            arp_stimulus_timeout: Duration::from_millis(100),
            arp_settle_delay: Duration::from_millis(100),
            mac_retries: 3,
            mac_retry_delay: Duration::from_millis(100),
            afp_timeout: Duration::from_secs(2),
            nbns_timeout: Duration::from_millis(500),
            smb_timeout: Duration::from_secs(2),
            rdp_timeout: Duration::from_secs(2),
            mdns_query_timeout: Duration::from_millis(250),
            mdns_service_timeout: Duration::from_millis(300),
            default_workers: 50,
            results_capacity: 100,
        }
    }
}
