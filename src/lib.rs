//! lanventory: LAN inventory engine.
//!
//! Expands a CIDR range, probes every host with a bounded worker pool, and
//! streams back device records carrying reachability, open-port, MAC/vendor
//! and hostname information. Hostnames come from an ordered set of
//! protocol-level resolvers: reverse DNS, AFP banners, NetBIOS status
//! queries, SMB sessions, RDP/TLS certificates and mDNS/Bonjour.

pub mod config;
pub mod constants;
pub mod db;
pub mod detect;
pub mod engine;
pub mod errors;
pub mod model;
pub mod net;
pub mod report;

mod worker;

// Re-export the types UI layers actually touch.
pub use config::ScanConfig;
pub use engine::DiscoveryEngine;
pub use errors::DiscoveryError;
pub use model::{Device, DeviceStatus, DeviceType, StatsSnapshot, WorkerState, WorkerStatus};
