//! Ordered hostname resolution.
//!
//! Methods run in a fixed priority and the first validated name wins:
//! reverse DNS, AFP banner, NetBIOS status query, SMB session, RDP/TLS
//! certificate, then mDNS. The Apple classifier runs regardless of which
//! method produced a name.

use crate::config::ScanConfig;
use crate::detect::{clean_hostname, is_valid_hostname, mdns, nbns, rdp, smb, DeviceProbe};
use crate::errors::DiscoveryError;
use crate::model::{Device, DeviceType};
use async_trait::async_trait;
use dns_lookup::lookup_addr;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Ports that hint at Apple hardware without proving it.
const APPLE_SIGNAL_PORTS: [u16; 5] = [548, 5353, 5000, 7000, 3689];

pub struct HostnameResolver {
    config: Arc<ScanConfig>,
}

impl HostnameResolver {
    pub fn new(config: Arc<ScanConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DeviceProbe for HostnameResolver {
    fn name(&self) -> &'static str {
        "ordered hostname resolution"
    }

    async fn probe(&self, ip: Ipv4Addr, device: &mut Device) -> Result<(), DiscoveryError> {
        let ports = device.open_ports.clone();
        let open = move |port: u16| ports.contains(&port);

        // Reverse DNS wins outright when it answers.
        let ptr_names = reverse_dns(ip).await;
        if !ptr_names.is_empty() {
            debug!("{ip}: PTR names {ptr_names:?}");
            device.hostnames = ptr_names;
        }

        if device.hostnames.is_empty() && open(548) {
            if let Some(banner) = afp_banner(ip, self.config.afp_timeout).await {
                if banner.contains("AFP") {
                    // Answering AFP at all is an Apple tell.
                    device.device_type = DeviceType::Apple;
                    if let Some(raw) = name_in_parens(&banner) {
                        let cleaned = clean_hostname(&raw);
                        if is_valid_hostname(&cleaned) {
                            debug!("{ip}: AFP banner names {cleaned}");
                            device.hostnames = vec![cleaned];
                        }
                    }
                }
            }
        }

        // 139 also triggers NBNS: hosts can register NetBIOS names without
        // exposing SMB on 445.
        if device.hostnames.is_empty() && (open(139) || open(445)) {
            if let Some(raw) = nbns::query(ip, self.config.nbns_timeout).await {
                let cleaned = clean_hostname(&raw);
                if is_valid_hostname(&cleaned) {
                    debug!("{ip}: NetBIOS name {cleaned}");
                    device.hostnames = vec![cleaned];
                }
            }
        }

        if device.hostnames.is_empty() && open(445) {
            if let Some(raw) = smb::hostname(ip, &self.config).await {
                let cleaned = clean_hostname(&raw);
                if is_valid_hostname(&cleaned) {
                    debug!("{ip}: SMB names {cleaned}");
                    device.hostnames = vec![cleaned];
                }
            }
        }

        if device.hostnames.is_empty() && open(3389) {
            if let Some(name) = rdp::hostname(ip, &self.config).await {
                device.hostnames = vec![name];
            }
        }

        // The mDNS sweep always runs for triggered hosts: the service map
        // and the Apple classification are wanted even when an earlier
        // method already produced a hostname. Only the hostname slot itself
        // honours the first-hit-wins rule.
        let apple_tagged = matches!(
            device.device_type,
            DeviceType::Apple | DeviceType::PossibleApple
        );
        if open(5353) || open(5000) || open(7000) || apple_tagged {
            let found = mdns::lookup(ip, &self.config).await;
            if !found.hostname.is_empty() {
                device.mdns_name = found.hostname.clone();
                if device.hostnames.is_empty() {
                    let cleaned = clean_hostname(&found.hostname);
                    if is_valid_hostname(&cleaned) {
                        device.hostnames = vec![cleaned];
                    }
                }
                if device.device_type == DeviceType::Unknown {
                    device.device_type = DeviceType::PossibleApple;
                }
            }
            if !found.services.is_empty() {
                if found.services.keys().any(|service| {
                    ["apple", "airport", "airplay", "homekit"]
                        .iter()
                        .any(|tag| service.contains(tag))
                }) {
                    debug!("{ip}: tagged Apple from mDNS services");
                    device.device_type = DeviceType::Apple;
                }
                device.mdns_services = found.services;
            }
        }

        // Port-pattern fallback when nothing stronger fired.
        if device.device_type == DeviceType::Unknown
            && APPLE_SIGNAL_PORTS.iter().any(|port| open(*port))
        {
            device.device_type = DeviceType::PossibleApple;
        }

        Ok(())
    }
}

/// PTR lookup, filtered down to names that survive validation.
async fn reverse_dns(ip: Ipv4Addr) -> Vec<String> {
    let addr = IpAddr::V4(ip);
    let name = tokio::task::spawn_blocking(move || lookup_addr(&addr).ok())
        .await
        .unwrap_or(None);
    name.into_iter()
        .filter(|n| !n.is_empty() && *n != addr.to_string() && is_valid_hostname(n))
        .collect()
}

/// Read one banner line from an AFP server.
async fn afp_banner(ip: Ipv4Addr, per_op: Duration) -> Option<String> {
    let stream = match timeout(per_op, TcpStream::connect((ip, 548))).await {
        Ok(Ok(stream)) => stream,
        _ => return None,
    };
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    match timeout(per_op, reader.read_line(&mut line)).await {
        Ok(Ok(n)) if n > 0 => Some(line),
        _ => None,
    }
}

/// AFP banners look like `AFP/TCP AFPServer (name)`.
fn name_in_parens(banner: &str) -> Option<String> {
    let (_, rest) = banner.split_once('(')?;
    let name = rest.trim_end_matches([')', '\r', '\n']);
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
