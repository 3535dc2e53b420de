//! Builders for synthetic protocol payloads.

/// Build an NBSTAT response holding the given `(name, type, flags)` records.
/// Names are space-padded to the 15-byte field the wire format uses.
#[allow(dead_code)]
pub fn nbstat_response(names: &[(&str, u8, u16)]) -> Vec<u8> {
    let mut buf = vec![0u8; 57];
    buf[56] = names.len() as u8;
    for &(name, kind, flags) in names {
        let mut record = [0u8; 18];
        let padded = format!("{name: <15}");
        record[..15].copy_from_slice(&padded.as_bytes()[..15]);
        record[15] = kind;
        record[16..18].copy_from_slice(&flags.to_be_bytes());
        buf.extend_from_slice(&record);
    }
    buf
}

/// Build an NTLMSSP CHALLENGE message whose target-info block carries the
/// given `(av_id, value)` pairs, UTF-16LE encoded.
#[allow(dead_code)]
pub fn ntlm_challenge(pairs: &[(u16, &str)]) -> Vec<u8> {
    let mut info = Vec::new();
    for &(id, value) in pairs {
        let utf16: Vec<u8> = value
            .encode_utf16()
            .flat_map(|unit| unit.to_le_bytes())
            .collect();
        info.extend_from_slice(&id.to_le_bytes());
        info.extend_from_slice(&(utf16.len() as u16).to_le_bytes());
        info.extend_from_slice(&utf16);
    }
    // terminating EOL pair
    info.extend_from_slice(&[0u8; 4]);

    let mut msg = Vec::new();
    msg.extend_from_slice(b"NTLMSSP\x00");
    msg.extend_from_slice(&2u32.to_le_bytes()); // message type: CHALLENGE
    msg.extend_from_slice(&[0u8; 8]); // target name fields
    msg.extend_from_slice(&[0u8; 4]); // negotiate flags
    msg.extend_from_slice(&[0u8; 8]); // server challenge
    msg.extend_from_slice(&[0u8; 8]); // reserved
    msg.extend_from_slice(&(info.len() as u16).to_le_bytes()); // target info len
    msg.extend_from_slice(&(info.len() as u16).to_le_bytes()); // target info max len
    msg.extend_from_slice(&48u32.to_le_bytes()); // target info offset
    msg.extend_from_slice(&info);
    msg
}
