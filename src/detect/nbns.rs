//! NetBIOS name service (NBNS) status queries over UDP 137.
//!
//! An NBSTAT query for the wildcard name returns every name the host has
//! registered; machine names are picked out by record type and flags.

use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::debug;

/// NBSTAT status query for the wildcard name `*`, which encodes to
/// `CK` followed by thirty `A`s.
pub const NBSTAT_QUERY: [u8; 50] = [
    0x80, 0x94, // transaction id
    0x00, 0x00, // flags
    0x00, 0x01, // question count
    0x00, 0x00, // answer count
    0x00, 0x00, // authority count
    0x00, 0x00, // additional count
    0x20, // encoded name length
    0x43, 0x4b, // "CK"
    0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41,
    0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41,
    0x00, // name terminator
    0x00, 0x21, // type: NBSTAT
    0x00, 0x01, // class: IN
];

/// Byte offset of the name count in an NBSTAT response.
const NAME_COUNT_OFFSET: usize = 56;
/// The name table starts right after the count; each record is 15 name
/// bytes, one type byte and a big-endian flags word.
const NAME_TABLE_OFFSET: usize = 57;
const NAME_RECORD_LEN: usize = 18;

const WORKSTATION_SERVICE: u8 = 0x00;
const SERVER_SERVICE: u8 = 0x20;
const FLAGS_UNIQUE_REGISTERED: u16 = 0x0400;
const FLAG_GROUP: u16 = 0x8000;

/// Send an NBSTAT query and pick a machine name out of the reply.
pub async fn query(ip: Ipv4Addr, read_timeout: Duration) -> Option<String> {
    let sock = UdpSocket::bind("0.0.0.0:0").await.ok()?;
    sock.connect((ip, 137)).await.ok()?;
    sock.send(&NBSTAT_QUERY).await.ok()?;

    let mut buf = [0u8; 1024];
    let n = match timeout(read_timeout, sock.recv(&mut buf)).await {
        Ok(Ok(n)) => n,
        _ => return None,
    };
    debug!("nbns: {n} bytes from {ip}");
    parse_nbstat_response(&buf[..n])
}

/// Pick a machine name out of an NBSTAT response.
///
/// Total on arbitrary input: responses shorter than the name count, or
/// truncated mid-table, yield `None`. Two passes over the table: unique
/// registered machine names first, then any non-group workstation or server
/// name.
pub fn parse_nbstat_response(buf: &[u8]) -> Option<String> {
    if buf.len() < NAME_TABLE_OFFSET {
        return None;
    }
    let num_names = buf[NAME_COUNT_OFFSET] as usize;
    if buf.len() < NAME_TABLE_OFFSET + num_names * NAME_RECORD_LEN {
        return None;
    }

    for i in 0..num_names {
        let (name, kind, flags) = record(buf, i);
        if matches!(kind, WORKSTATION_SERVICE | SERVER_SERVICE) && flags == FLAGS_UNIQUE_REGISTERED
        {
            let name = trim_name(name);
            if !name.is_empty() {
                return Some(name);
            }
        }
    }

    for i in 0..num_names {
        let (name, kind, flags) = record(buf, i);
        if flags & FLAG_GROUP != 0 {
            continue;
        }
        if matches!(kind, WORKSTATION_SERVICE | SERVER_SERVICE) {
            let name = trim_name(name);
            if !name.is_empty() {
                return Some(name);
            }
        }
    }

    None
}

fn record(buf: &[u8], i: usize) -> (&[u8], u8, u16) {
    let off = NAME_TABLE_OFFSET + i * NAME_RECORD_LEN;
    let name = &buf[off..off + 15];
    let kind = buf[off + 15];
    let flags = u16::from_be_bytes([buf[off + 16], buf[off + 17]]);
    (name, kind, flags)
}

fn trim_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches([' ', '\0'])
        .to_string()
}
