//! ARP-based MAC resolution and OUI vendor tagging.
//!
//! The engine never opens raw sockets: it nudges the kernel into resolving
//! the neighbour (a burst of short TCP connects plus one byte to UDP 137),
//! waits for the cache to settle, and then reads the OS ARP table through
//! the `arp` tool.

use crate::config::ScanConfig;
use crate::db::oui::MacVendorDb;
use crate::detect::DeviceProbe;
use crate::errors::DiscoveryError;
use crate::model::{Device, DeviceType};
use async_trait::async_trait;
use futures::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout};
use tracing::debug;

static MAC_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9A-Fa-f]{1,2}[:-]){5}[0-9A-Fa-f]{1,2}").expect("valid regex"));

pub struct MacResolver {
    config: Arc<ScanConfig>,
    vendor_db: Arc<Mutex<MacVendorDb>>,
}

impl MacResolver {
    pub fn new(config: Arc<ScanConfig>, vendor_db: Arc<Mutex<MacVendorDb>>) -> Self {
        Self { config, vendor_db }
    }

    /// One stimulus + ARP-table round. Returns the canonical MAC, or an
    /// empty string when the table has no entry for the address.
    pub async fn resolve(&self, ip: Ipv4Addr) -> String {
        self.stimulate(ip).await;
        sleep(self.config.arp_settle_delay).await;
        read_arp_table(ip).await
    }

    /// Touch a handful of TCP ports and the NetBIOS name service so the
    /// kernel performs an ARP exchange. Failures are irrelevant here.
    async fn stimulate(&self, ip: Ipv4Addr) {
        let connect_timeout = self.config.arp_stimulus_timeout;
        let connects = self.config.arp_stimulus_ports.iter().map(|&port| async move {
            if let Ok(Ok(stream)) = timeout(connect_timeout, TcpStream::connect((ip, port))).await {
                drop(stream);
            }
        });
        join_all(connects).await;

        if let Ok(sock) = UdpSocket::bind("0.0.0.0:0").await {
            if sock.connect((ip, 137)).await.is_ok() {
                let _ = sock.send(&[0u8]).await;
            }
        }
    }
}

#[async_trait]
impl DeviceProbe for MacResolver {
    fn name(&self) -> &'static str {
        "arp mac + oui vendor"
    }

    async fn probe(&self, ip: Ipv4Addr, device: &mut Device) -> Result<(), DiscoveryError> {
        for attempt in 0..self.config.mac_retries {
            if attempt > 0 {
                sleep(self.config.mac_retry_delay).await;
            }
            let mac = self.resolve(ip).await;
            if mac.is_empty() {
                continue;
            }
            device.vendor = self.vendor_db.lock().await.vendor_of(&mac);
            if device.vendor.to_lowercase().contains("apple") {
                debug!("{ip}: tagged Apple from MAC vendor {}", device.vendor);
                device.device_type = DeviceType::Apple;
            }
            device.mac = mac;
            break;
        }
        Ok(())
    }
}

/// Query the OS ARP table for one address and pull out the first MAC-shaped
/// token. Empty string when the tool is missing, fails, or has no entry.
async fn read_arp_table(ip: Ipv4Addr) -> String {
    let mut cmd = tokio::process::Command::new("arp");
    if cfg!(windows) {
        cmd.arg("-a");
    } else {
        cmd.arg("-n");
    }
    let output = match cmd.arg(ip.to_string()).output().await {
        Ok(output) if output.status.success() => output,
        _ => return String::new(),
    };
    let text = String::from_utf8_lossy(&output.stdout);
    match MAC_TOKEN.find(&text) {
        Some(token) => {
            let mac = normalize_mac(token.as_str());
            debug!("{ip}: arp table has {mac}");
            mac
        }
        None => String::new(),
    }
}

/// Canonicalise a MAC: uppercase, separators removed, a colon every two hex
/// digits. Idempotent.
pub fn normalize_mac(raw: &str) -> String {
    let stripped: String = raw
        .to_uppercase()
        .chars()
        .filter(|c| !matches!(c, ':' | '-' | '.'))
        .collect();

    let mut out = String::with_capacity(stripped.len() + stripped.len() / 2);
    for (i, c) in stripped.chars().enumerate() {
        if i > 0 && i % 2 == 0 {
            out.push(':');
        }
        out.push(c);
    }
    out
}
