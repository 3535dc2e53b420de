//! RDP hostname discovery.
//!
//! Windows hosts with Remote Desktop enabled hand out their machine name in
//! the TLS certificate protecting the session. The probe runs the X.224
//! negotiation to learn whether the server speaks TLS or CredSSP, then
//! reconnects, repeats the negotiation and completes a handshake with
//! certificate verification disabled purely to read the certificate.

use crate::config::ScanConfig;
use crate::detect::{clean_hostname, is_valid_hostname};
use crate::errors::DiscoveryError;
use std::net::Ipv4Addr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_native_tls::native_tls;
use tokio_native_tls::TlsConnector;
use tracing::debug;
use x509_parser::prelude::*;

/// X.224 connection request carrying an RDP negotiation request for
/// standard RDP, TLS and CredSSP.
pub const NEGOTIATION_REQUEST: [u8; 19] = [
    0x03, 0x00, // TPKT version
    0x00, 0x13, // TPKT length: 19
    0x0e, // COTP length: 14
    0xe0, // COTP connection request
    0x00, 0x00, // dst reference
    0x00, 0x00, // src reference
    0x00, // class 0
    0x01, // RDP negotiation request
    0x00, // flags
    0x08, 0x00, // length
    0x07, 0x00, 0x00, 0x00, // requested protocols: RDP | TLS | CredSSP
];

pub const PROTOCOL_TLS: u32 = 0x02;
pub const PROTOCOL_CREDSSP: u32 = 0x04;

const MIN_RESPONSE_LEN: usize = 19;

/// Selected-protocol field out of a negotiation response.
///
/// Total on arbitrary input: short buffers and bad TPKT/COTP magics are
/// rejected, never indexed.
pub fn parse_negotiation_response(buf: &[u8]) -> Result<u32, DiscoveryError> {
    if buf.len() < MIN_RESPONSE_LEN {
        return Err(DiscoveryError::Protocol(
            "negotiation response too short".to_string(),
        ));
    }
    if buf[0] != 0x03 || buf[1] != 0x00 {
        return Err(DiscoveryError::Protocol("invalid TPKT header".to_string()));
    }
    if buf[5] != 0xd0 {
        return Err(DiscoveryError::Protocol("invalid COTP header".to_string()));
    }
    Ok(u32::from_le_bytes([buf[15], buf[16], buf[17], buf[18]]))
}

/// As [`parse_negotiation_response`], but additionally requires the server
/// to have picked TLS or CredSSP.
pub fn select_secure_protocol(buf: &[u8]) -> Result<u32, DiscoveryError> {
    let selected = parse_negotiation_response(buf)?;
    if selected & (PROTOCOL_TLS | PROTOCOL_CREDSSP) == 0 {
        return Err(DiscoveryError::Protocol(
            "secure protocols not supported".to_string(),
        ));
    }
    Ok(selected)
}

/// Candidate hostnames from a DER certificate, in preference order: SAN DNS
/// names, subject common names, then subject organisation values. Wildcard
/// and empty entries are dropped.
pub fn candidate_names_from_cert(der: &[u8]) -> Vec<String> {
    let Ok((_, cert)) = parse_x509_certificate(der) else {
        return Vec::new();
    };

    let mut names = Vec::new();
    if let Ok(Some(san)) = cert.subject_alternative_name() {
        for general in &san.value.general_names {
            if let GeneralName::DNSName(dns) = general {
                names.push((*dns).to_string());
            }
        }
    }
    for cn in cert.subject().iter_common_name() {
        if let Ok(value) = cn.as_str() {
            names.push(value.to_string());
        }
    }
    for org in cert.subject().iter_organization() {
        if let Ok(value) = org.as_str() {
            names.push(value.to_string());
        }
    }

    names.retain(|name| !name.is_empty() && !name.contains('*'));
    names
}

/// Full hostname probe against port 3389.
pub async fn hostname(ip: Ipv4Addr, config: &ScanConfig) -> Option<String> {
    let per_op = config.rdp_timeout;

    let mut stream = match timeout(per_op, TcpStream::connect((ip, 3389))).await {
        Ok(Ok(stream)) => stream,
        _ => return None,
    };
    timeout(per_op, stream.write_all(&NEGOTIATION_REQUEST))
        .await
        .ok()?
        .ok()?;
    let mut buf = [0u8; 512];
    let n = match timeout(per_op, stream.read(&mut buf)).await {
        Ok(Ok(n)) => n,
        _ => return None,
    };

    let selected = match select_secure_protocol(&buf[..n]) {
        Ok(selected) => selected,
        Err(err) => {
            debug!("rdp {ip}: {err}");
            return None;
        }
    };
    debug!("rdp {ip}: server selected protocol 0x{selected:02x}, starting TLS");

    // The server expects the negotiation to precede the handshake, so the
    // TLS exchange needs a fresh connection.
    let mut tls_tcp = match timeout(per_op, TcpStream::connect((ip, 3389))).await {
        Ok(Ok(stream)) => stream,
        _ => return None,
    };
    timeout(per_op, tls_tcp.write_all(&NEGOTIATION_REQUEST))
        .await
        .ok()?
        .ok()?;
    let mut reply = [0u8; MIN_RESPONSE_LEN];
    timeout(per_op, tls_tcp.read_exact(&mut reply))
        .await
        .ok()?
        .ok()?;

    let builder = native_tls::TlsConnector::builder()
        .danger_accept_invalid_certs(true)
        .danger_accept_invalid_hostnames(true)
        .min_protocol_version(Some(native_tls::Protocol::Tlsv10))
        .max_protocol_version(None)
        .build()
        .ok()?;
    let connector = TlsConnector::from(builder);
    let tls = match timeout(per_op, connector.connect(&ip.to_string(), tls_tcp)).await {
        Ok(Ok(tls)) => tls,
        Ok(Err(err)) => {
            // native-tls only exposes peer certificates once the handshake
            // completed, so a partial handshake ends the probe here.
            debug!("rdp {ip}: TLS handshake failed: {err}");
            return None;
        }
        Err(_) => return None,
    };

    let der = match tls.get_ref().peer_certificate() {
        Ok(Some(cert)) => cert.to_der().ok()?,
        _ => return None,
    };

    for candidate in candidate_names_from_cert(&der) {
        let cleaned = clean_hostname(&candidate);
        if is_valid_hostname(&cleaned) {
            debug!("rdp {ip}: hostname {cleaned} from certificate");
            return Some(cleaned);
        }
    }
    None
}
