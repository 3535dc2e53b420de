use crate::errors::DiscoveryError;
use crate::model::Device;
use async_trait::async_trait;
use std::net::Ipv4Addr;

pub mod hostname;
pub mod mac;
pub mod mdns;
pub mod nbns;
pub mod rdp;
pub mod reach;
pub mod smb;

/// One stage of the per-host probe pipeline.
///
/// The worker runs stages in a fixed order (reachability, then MAC/vendor,
/// then hostnames) and each stage enriches the device record in place.
/// Network failures inside a stage are negative results, not errors; a stage
/// only returns `Err` for conditions worth logging.
#[async_trait]
pub trait DeviceProbe: Send + Sync {
    async fn probe(&self, ip: Ipv4Addr, device: &mut Device) -> Result<(), DiscoveryError>;

    /// Human-readable stage name for logs.
    fn name(&self) -> &'static str;
}

/// Strip a `:port` suffix, keep the first DNS label, and drop every
/// character outside `[A-Za-z0-9-]`. Idempotent.
pub fn clean_hostname(name: &str) -> String {
    let without_port = name.split(':').next().unwrap_or_default();
    let label = without_port.split('.').next().unwrap_or_default();
    label
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect()
}

/// 2-63 characters, leading letter, trailing alphanumeric, and none of
/// `\/:*?"<>|@`.
pub fn is_valid_hostname(name: &str) -> bool {
    let bytes = name.as_bytes();
    if bytes.len() < 2 || bytes.len() > 63 {
        return false;
    }
    if !bytes[0].is_ascii_alphabetic() {
        return false;
    }
    if !bytes[bytes.len() - 1].is_ascii_alphanumeric() {
        return false;
    }
    !name
        .chars()
        .any(|c| matches!(c, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '@'))
}
