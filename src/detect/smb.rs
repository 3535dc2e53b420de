//! SMB hostname discovery.
//!
//! The probe drives an SMB2 session just far enough to make the server
//! identify itself: NEGOTIATE, then an anonymous SESSION_SETUP whose NTLMSSP
//! CHALLENGE reply carries the machine's NetBIOS and DNS names in its
//! target-info block. No authentication ever completes.

use crate::config::ScanConfig;
use std::net::Ipv4Addr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// SMB2 NEGOTIATE for dialects 2.0.2 and 2.1, direct-TCP framed.
pub const NEGOTIATE_REQUEST: [u8; 108] = [
    // NetBIOS session header: 104 byte message
    0x00, 0x00, 0x00, 0x68,
    // SMB2 header
    0xfe, 0x53, 0x4d, 0x42, // protocol id
    0x40, 0x00, // header size: 64
    0x00, 0x00, // credit charge
    0x00, 0x00, 0x00, 0x00, // status
    0x00, 0x00, // command: NEGOTIATE
    0x01, 0x00, // credits requested
    0x00, 0x00, 0x00, 0x00, // flags
    0x00, 0x00, 0x00, 0x00, // next command
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // message id: 0
    0x00, 0x00, 0x00, 0x00, // reserved
    0x00, 0x00, 0x00, 0x00, // tree id
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // session id
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // signature
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    // NEGOTIATE body
    0x24, 0x00, // structure size: 36
    0x02, 0x00, // dialect count: 2
    0x01, 0x00, // security mode: signing enabled
    0x00, 0x00, // reserved
    0x00, 0x00, 0x00, 0x00, // capabilities
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // client guid
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // client start time
    0x02, 0x02, // dialect 2.0.2
    0x10, 0x02, // dialect 2.1
];

/// SMB2 SESSION_SETUP carrying a bare NTLMSSP NEGOTIATE token with empty
/// domain and workstation fields.
pub const SESSION_SETUP_REQUEST: [u8; 124] = [
    // NetBIOS session header: 120 byte message
    0x00, 0x00, 0x00, 0x78,
    // SMB2 header
    0xfe, 0x53, 0x4d, 0x42, // protocol id
    0x40, 0x00, // header size: 64
    0x00, 0x00, // credit charge
    0x00, 0x00, 0x00, 0x00, // status
    0x01, 0x00, // command: SESSION_SETUP
    0x01, 0x00, // credits requested
    0x00, 0x00, 0x00, 0x00, // flags
    0x00, 0x00, 0x00, 0x00, // next command
    0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // message id: 1
    0x00, 0x00, 0x00, 0x00, // reserved
    0x00, 0x00, 0x00, 0x00, // tree id
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // session id
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // signature
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    // SESSION_SETUP body
    0x19, 0x00, // structure size: 25
    0x00, // flags
    0x01, // security mode: signing enabled
    0x00, 0x00, 0x00, 0x00, // capabilities
    0x00, 0x00, 0x00, 0x00, // channel
    0x58, 0x00, // security buffer offset: 88
    0x20, 0x00, // security buffer length: 32
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // previous session id
    // NTLMSSP NEGOTIATE
    0x4e, 0x54, 0x4c, 0x4d, 0x53, 0x53, 0x50, 0x00, // "NTLMSSP\0"
    0x01, 0x00, 0x00, 0x00, // message type: NEGOTIATE
    0x07, 0x82, 0x08, 0x00, // flags: unicode, oem, request target, ntlm, always sign, ntlm2
    0x00, 0x00, 0x00, 0x00, 0x20, 0x00, 0x00, 0x00, // empty domain
    0x00, 0x00, 0x00, 0x00, 0x20, 0x00, 0x00, 0x00, // empty workstation
];

const NTLMSSP_MAGIC: &[u8] = b"NTLMSSP\x00";
const CHALLENGE_MESSAGE: u32 = 2;
const TARGET_INFO_FIELDS_OFFSET: usize = 40;
const MIN_CHALLENGE_LEN: usize = 48;

const AV_EOL: u16 = 0x0000;
const AV_NB_COMPUTER_NAME: u16 = 0x0001;
const AV_DNS_COMPUTER_NAME: u16 = 0x0003;

/// Machine name out of an NTLMSSP CHALLENGE embedded anywhere in `buf`.
///
/// Prefers the NetBIOS computer name; falls back to the first label of the
/// DNS computer name. Total on arbitrary input.
pub fn extract_challenge_target(buf: &[u8]) -> Option<String> {
    let base = buf
        .windows(NTLMSSP_MAGIC.len())
        .position(|w| w == NTLMSSP_MAGIC)?;
    let msg = &buf[base..];
    if msg.len() < MIN_CHALLENGE_LEN {
        return None;
    }
    if u32::from_le_bytes([msg[8], msg[9], msg[10], msg[11]]) != CHALLENGE_MESSAGE {
        return None;
    }

    let info_len =
        u16::from_le_bytes([msg[TARGET_INFO_FIELDS_OFFSET], msg[TARGET_INFO_FIELDS_OFFSET + 1]])
            as usize;
    let info_off = u32::from_le_bytes([
        msg[TARGET_INFO_FIELDS_OFFSET + 4],
        msg[TARGET_INFO_FIELDS_OFFSET + 5],
        msg[TARGET_INFO_FIELDS_OFFSET + 6],
        msg[TARGET_INFO_FIELDS_OFFSET + 7],
    ]) as usize;
    let info = msg.get(info_off..info_off.checked_add(info_len)?)?;

    let mut netbios_name = None;
    let mut dns_name = None;
    let mut cursor = 0usize;
    while cursor + 4 <= info.len() {
        let id = u16::from_le_bytes([info[cursor], info[cursor + 1]]);
        let len = u16::from_le_bytes([info[cursor + 2], info[cursor + 3]]) as usize;
        cursor += 4;
        let value = info.get(cursor..cursor.checked_add(len)?)?;
        cursor += len;
        match id {
            AV_EOL => break,
            AV_NB_COMPUTER_NAME => netbios_name = decode_utf16le(value),
            AV_DNS_COMPUTER_NAME => dns_name = decode_utf16le(value),
            _ => {}
        }
    }

    netbios_name
        .or_else(|| {
            dns_name.map(|name| {
                name.split('.')
                    .next()
                    .unwrap_or_default()
                    .to_string()
            })
        })
        .filter(|name| !name.is_empty())
}

fn decode_utf16le(raw: &[u8]) -> Option<String> {
    if raw.is_empty() || raw.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = raw
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let decoded = String::from_utf16_lossy(&units);
    let decoded = decoded.trim_matches('\0').to_string();
    if decoded.is_empty() {
        None
    } else {
        Some(decoded)
    }
}

/// Full hostname probe against port 445.
pub async fn hostname(ip: Ipv4Addr, config: &ScanConfig) -> Option<String> {
    let per_op = config.smb_timeout;

    let mut stream = match timeout(per_op, TcpStream::connect((ip, 445))).await {
        Ok(Ok(stream)) => stream,
        _ => return None,
    };

    timeout(per_op, stream.write_all(&NEGOTIATE_REQUEST))
        .await
        .ok()?
        .ok()?;
    let mut buf = vec![0u8; 4096];
    let n = match timeout(per_op, stream.read(&mut buf)).await {
        Ok(Ok(n)) => n,
        _ => return None,
    };
    if n < 8 || &buf[4..8] != b"\xfeSMB" {
        debug!("smb {ip}: negotiate reply is not SMB2");
        return None;
    }

    timeout(per_op, stream.write_all(&SESSION_SETUP_REQUEST))
        .await
        .ok()?
        .ok()?;
    let n = match timeout(per_op, stream.read(&mut buf)).await {
        Ok(Ok(n)) => n,
        _ => return None,
    };

    let name = extract_challenge_target(&buf[..n]);
    if let Some(name) = &name {
        debug!("smb {ip}: challenge names server {name}");
    }
    name
}
