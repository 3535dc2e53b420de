//! Reachability probing.
//!
//! Unprivileged connect-scan over a fixed port matrix, an mDNS UDP probe,
//! and the ARP cache as a side channel: a host with a resolvable MAC counts
//! as up even when every port stays shut.

use crate::config::ScanConfig;
use crate::detect::mac::MacResolver;
use crate::detect::DeviceProbe;
use crate::errors::DiscoveryError;
use crate::model::{Device, DeviceStatus};
use async_trait::async_trait;
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;
use tracing::debug;

/// Minimal mDNS query: an empty DNS header with QDCOUNT set to one. Any
/// reply at all marks the responder as present.
pub const MDNS_PROBE: [u8; 12] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

const MDNS_PORT: u16 = 5353;

pub struct ReachabilityProber {
    config: Arc<ScanConfig>,
    mac: Arc<MacResolver>,
}

impl ReachabilityProber {
    pub fn new(config: Arc<ScanConfig>, mac: Arc<MacResolver>) -> Self {
        Self { config, mac }
    }

    /// Probe one host. Returns its reachability and the sorted,
    /// de-duplicated set of answering ports.
    pub async fn probe_host(&self, ip: Ipv4Addr) -> (bool, Vec<u16>) {
        // ARP first: a host silent on TCP but present in the neighbour
        // table is still up. Port probing continues either way.
        let mut reachable = !self.mac.resolve(ip).await.is_empty();
        if reachable {
            debug!("{ip}: present in ARP table");
        }

        let mut probes: Vec<BoxFuture<'static, Option<u16>>> = Vec::new();
        for &port in &self.config.common_ports {
            probes.push(try_connect(ip, port, self.config.connect_timeout).boxed());
        }
        for &(port, port_timeout) in &self.config.apple_ports {
            probes.push(try_connect(ip, port, port_timeout).boxed());
        }
        probes.push(mdns_probe(ip, self.config.mdns_probe_timeout).boxed());

        let mut open: Vec<u16> = join_all(probes).await.into_iter().flatten().collect();
        if !open.is_empty() {
            reachable = true;
        }
        open.sort_unstable();
        open.dedup();
        (reachable, open)
    }
}

#[async_trait]
impl DeviceProbe for ReachabilityProber {
    fn name(&self) -> &'static str {
        "tcp/mdns/arp reachability"
    }

    async fn probe(&self, ip: Ipv4Addr, device: &mut Device) -> Result<(), DiscoveryError> {
        let (reachable, open_ports) = self.probe_host(ip).await;
        if reachable {
            device.status = DeviceStatus::Up;
            device.open_ports = open_ports;
        }
        Ok(())
    }
}

async fn try_connect(ip: Ipv4Addr, port: u16, connect_timeout: Duration) -> Option<u16> {
    match timeout(connect_timeout, TcpStream::connect((ip, port))).await {
        Ok(Ok(stream)) => {
            // The connect itself is the probe; the socket closes right away.
            drop(stream);
            debug!("{ip}: tcp {port} open");
            Some(port)
        }
        _ => None,
    }
}

async fn mdns_probe(ip: Ipv4Addr, read_timeout: Duration) -> Option<u16> {
    let sock = UdpSocket::bind("0.0.0.0:0").await.ok()?;
    sock.connect((ip, MDNS_PORT)).await.ok()?;
    sock.send(&MDNS_PROBE).await.ok()?;
    let mut buf = [0u8; 32];
    match timeout(read_timeout, sock.recv(&mut buf)).await {
        Ok(Ok(_)) => {
            debug!("{ip}: answered mdns probe on {MDNS_PORT}");
            Some(MDNS_PORT)
        }
        _ => None,
    }
}
