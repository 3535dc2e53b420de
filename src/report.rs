//! Optional append-only scan report.
//!
//! Only created in debug mode. One tab-separated row per reachable device,
//! framed by RFC3339 start/end banners. After creation every write failure
//! is logged and swallowed; the scan never stops over the report.

use crate::model::Device;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::warn;

pub const REPORT_COLUMNS: &str =
    "IP Address\tHostname\tmDNS Name\tMAC Address\tVendor\tStatus\tPorts";

pub struct ScanReport {
    file: Mutex<File>,
}

impl ScanReport {
    /// Create (truncating) the report file and write the opening banner.
    /// Failure here is fatal to engine startup.
    pub fn create(path: &Path) -> std::io::Result<Self> {
        let mut file = File::create(path)?;
        writeln!(file, "=== Scan started at {} ===", now_rfc3339())?;
        writeln!(file, "{REPORT_COLUMNS}")?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Note the parameters of a starting scan.
    pub fn scan_header(&self, cidr: &str, workers: usize) {
        self.write_line(&format!(
            "\nScanning network: {cidr} with {workers} workers\n"
        ));
    }

    /// One row per reachable device, in completion order.
    pub fn append(&self, device: &Device) {
        let hostnames = if device.hostnames.is_empty() {
            "N/A".to_string()
        } else {
            device.hostnames.join(",")
        };
        self.write_line(&format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{:?}",
            device.ip,
            hostnames,
            device.mdns_name,
            device.mac,
            device.vendor,
            device.status,
            device.open_ports
        ));
    }

    /// Closing banner at scan end.
    pub fn finish(&self) {
        self.write_line(&format!("\n=== Scan completed at {} ===", now_rfc3339()));
    }

    fn write_line(&self, line: &str) {
        let mut file = match self.file.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(err) = writeln!(file, "{line}") {
            warn!("report write failed: {err}");
        }
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}
