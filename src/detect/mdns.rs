//! mDNS/Bonjour lookups.
//!
//! Queries a fixed set of service types (mostly Apple's) and keeps only the
//! answers whose IPv4 record matches the host under probe. The host record
//! is the preferred name; the instance name is the fallback.

use crate::config::ScanConfig;
use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use tokio::time::{timeout, Instant};
use tracing::debug;

/// Service types that routinely expose a usable hostname.
pub const SERVICE_TYPES: &[&str] = &[
    "_device-info._tcp.local.",
    "_airplay._tcp.local.",
    "_raop._tcp.local.",
    "_companion-link._tcp.local.",
    "_apple-mobdev._tcp.local.",
    "_apple-mobdev2._tcp.local.",
    "_apple-pairable._tcp.local.",
    "_homekit._tcp.local.",
    "_touch-able._tcp.local.",
    "_http._tcp.local.",
];

/// Outcome of one Bonjour sweep over [`SERVICE_TYPES`].
pub struct BonjourLookup {
    /// Preferred mDNS name, empty when nothing matched.
    pub hostname: String,
    /// Service type (without the `.local.` suffix) to a short info string.
    pub services: HashMap<String, String>,
}

/// Query every service type, filtering answers to the given address.
pub async fn lookup(ip: Ipv4Addr, config: &ScanConfig) -> BonjourLookup {
    let mut result = BonjourLookup {
        hostname: String::new(),
        services: HashMap::new(),
    };
    let Ok(daemon) = ServiceDaemon::new() else {
        return result;
    };
    let target = IpAddr::V4(ip);

    for &service in SERVICE_TYPES {
        let Ok(receiver) = daemon.browse(service) else {
            continue;
        };
        let deadline = Instant::now() + config.mdns_service_timeout;

        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let wait = (deadline - now).min(config.mdns_query_timeout);
            match timeout(wait, receiver.recv_async()).await {
                Ok(Ok(ServiceEvent::ServiceResolved(info))) => {
                    if !info
                        .get_addresses()
                        .iter()
                        .any(|addr| *addr == target)
                    {
                        continue;
                    }
                    let service_name = service.trim_end_matches(".local.").to_string();
                    result.services.insert(service_name, describe(&info));
                    if result.hostname.is_empty() {
                        if let Some(name) = preferred_name(&info, service) {
                            debug!("mdns {ip}: {name} via {service}");
                            result.hostname = name;
                        }
                    }
                }
                Ok(Ok(_)) => continue,
                Ok(Err(_)) => break,
                // Per-query timeout; keep polling until the service deadline.
                Err(_) => continue,
            }
        }

        let _ = daemon.stop_browse(service);
    }
    let _ = daemon.shutdown();

    result
}

/// Host record first (trailing dot stripped); instance name second.
fn preferred_name(info: &ServiceInfo, service: &str) -> Option<String> {
    let host = info.get_hostname().trim_end_matches('.');
    if !host.is_empty() {
        return Some(host.to_string());
    }
    instance_name(info.get_fullname(), service)
}

/// Derive a name from the service instance: strip any `instance@` prefix and
/// the `._service._proto` tail, then anchor it in `.local`.
fn instance_name(fullname: &str, service: &str) -> Option<String> {
    let mut name = fullname.trim_end_matches(service).trim_end_matches('.');
    if let Some(idx) = name.find('@') {
        name = &name[idx + 1..];
    }
    if let Some(idx) = name.find("._") {
        name = &name[..idx];
    }
    if name.is_empty() {
        return None;
    }
    let mut name = name.to_string();
    if !name.ends_with(".local") {
        name.push_str(".local");
    }
    Some(name)
}

fn describe(info: &ServiceInfo) -> String {
    let txt: Vec<String> = info
        .get_properties()
        .iter()
        .map(|prop| format!("{}={}", prop.key(), prop.val_str()))
        .collect();
    format!(
        "port={} host={} txt=[{}]",
        info.get_port(),
        info.get_hostname().trim_end_matches('.'),
        txt.join(" ")
    )
}
