use lanventory::detect::nbns::{parse_nbstat_response, NBSTAT_QUERY};
use lanventory::detect::rdp::{
    parse_negotiation_response, select_secure_protocol, NEGOTIATION_REQUEST,
};
use lanventory::detect::smb::extract_challenge_target;
use lanventory::detect::{clean_hostname, is_valid_hostname};
use lanventory::errors::DiscoveryError;
use test_utils::{nbstat_response, ntlm_challenge};

mod test_utils;

// --- cleaning and validation ------------------------------------------------

#[test]
fn cleaning_strips_port_and_fqdn() {
    assert_eq!(clean_hostname("MyHost.example.com:445"), "MyHost");
    assert_eq!(clean_hostname("plain"), "plain");
    assert_eq!(clean_hostname("Steve's MacBook (2)"), "StevesMacBook2");
    assert_eq!(clean_hostname(""), "");
}

#[test]
fn cleaning_is_idempotent() {
    for raw in ["MyHost.example.com:445", "a b c", "host-01.lan"] {
        let once = clean_hostname(raw);
        assert_eq!(clean_hostname(&once), once);
    }
}

#[test]
fn validation_truth_table() {
    assert!(is_valid_hostname("MyHost"));
    assert!(is_valid_hostname("my-host"));
    assert!(is_valid_hostname("my-host.lan"));
    assert!(!is_valid_hostname("1host"));
    assert!(!is_valid_hostname("-host"));
    assert!(!is_valid_hostname("host-"));
    assert!(!is_valid_hostname("a"));
    assert!(!is_valid_hostname("host@lan"));
    assert!(!is_valid_hostname(&"x".repeat(64)));
}

// --- NBNS -------------------------------------------------------------------

#[test]
fn nbstat_query_matches_the_wire_format() {
    assert_eq!(NBSTAT_QUERY.len(), 50);
    assert_eq!(&NBSTAT_QUERY[0..2], &[0x80, 0x94]); // transaction id
    assert_eq!(&NBSTAT_QUERY[4..6], &[0x00, 0x01]); // one question
    assert_eq!(NBSTAT_QUERY[12], 0x20); // encoded name length
    assert_eq!(&NBSTAT_QUERY[13..15], b"CK");
    assert!(NBSTAT_QUERY[15..45].iter().all(|&b| b == 0x41));
    assert_eq!(NBSTAT_QUERY[45], 0x00); // terminator
    assert_eq!(&NBSTAT_QUERY[46..48], &[0x00, 0x21]); // NBSTAT
    assert_eq!(&NBSTAT_QUERY[48..50], &[0x00, 0x01]); // IN
}

#[test]
fn nbstat_parse_prefers_unique_registered_machine_names() {
    let mut response = nbstat_response(&[
        ("MACHINE", 0x20, 0x0400),
        ("WORKGROUP", 0x00, 0x8400),
    ]);
    response.resize(200, 0);
    assert_eq!(parse_nbstat_response(&response).as_deref(), Some("MACHINE"));
}

#[test]
fn nbstat_parse_falls_back_to_non_group_names() {
    let response = nbstat_response(&[
        ("WORKGROUP", 0x00, 0x8400), // group, skipped
        ("ALTNAME", 0x20, 0x4400),   // not 0x0400, second pass
    ]);
    assert_eq!(parse_nbstat_response(&response).as_deref(), Some("ALTNAME"));
}

#[test]
fn nbstat_parse_ignores_group_only_tables() {
    let response = nbstat_response(&[("WORKGROUP", 0x00, 0x8400)]);
    assert_eq!(parse_nbstat_response(&response), None);
}

#[test]
fn nbstat_parse_rejects_short_and_truncated_input() {
    assert_eq!(parse_nbstat_response(&[]), None);
    assert_eq!(parse_nbstat_response(&[0u8; 56]), None);

    // Claims two records but carries only one.
    let mut truncated = nbstat_response(&[("MACHINE", 0x20, 0x0400)]);
    truncated[56] = 2;
    assert_eq!(parse_nbstat_response(&truncated), None);
}

// --- RDP --------------------------------------------------------------------

fn rdp_response(selected: u32) -> [u8; 19] {
    let mut buf = [0u8; 19];
    buf[0] = 0x03;
    buf[5] = 0xd0;
    buf[15..19].copy_from_slice(&selected.to_le_bytes());
    buf
}

#[test]
fn negotiation_request_matches_the_wire_format() {
    assert_eq!(
        NEGOTIATION_REQUEST,
        [
            0x03, 0x00, 0x00, 0x13, 0x0e, 0xe0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x08,
            0x00, 0x07, 0x00, 0x00, 0x00,
        ]
    );
}

#[test]
fn negotiation_response_yields_selected_protocol() {
    assert_eq!(parse_negotiation_response(&rdp_response(0x02)).unwrap(), 0x02);
    assert_eq!(parse_negotiation_response(&rdp_response(0x04)).unwrap(), 0x04);
}

#[test]
fn tls_and_credssp_count_as_secure() {
    assert!(select_secure_protocol(&rdp_response(0x02)).is_ok());
    assert!(select_secure_protocol(&rdp_response(0x04)).is_ok());
}

#[test]
fn plain_rdp_is_rejected_as_insecure() {
    let err = select_secure_protocol(&rdp_response(0x01)).unwrap_err();
    assert!(matches!(err, DiscoveryError::Protocol(_)));
    assert!(err.to_string().contains("secure protocols not supported"));
}

#[test]
fn negotiation_parser_rejects_malformed_responses() {
    assert!(parse_negotiation_response(&[]).is_err());
    assert!(parse_negotiation_response(&[0x03, 0x00]).is_err());

    let mut bad_tpkt = rdp_response(0x02);
    bad_tpkt[0] = 0x04;
    assert!(parse_negotiation_response(&bad_tpkt).is_err());

    let mut bad_cotp = rdp_response(0x02);
    bad_cotp[5] = 0xe0;
    assert!(parse_negotiation_response(&bad_cotp).is_err());
}

// --- SMB / NTLMSSP ----------------------------------------------------------

#[test]
fn challenge_target_prefers_the_netbios_name() {
    let challenge = ntlm_challenge(&[
        (0x0002, "WORKGROUP"),           // domain, ignored
        (0x0001, "MACHINE"),             // NetBIOS computer name
        (0x0003, "machine.example.com"), // DNS computer name
    ]);
    assert_eq!(extract_challenge_target(&challenge).as_deref(), Some("MACHINE"));
}

#[test]
fn challenge_target_falls_back_to_the_dns_first_label() {
    let challenge = ntlm_challenge(&[(0x0003, "machine.example.com")]);
    assert_eq!(extract_challenge_target(&challenge).as_deref(), Some("machine"));
}

#[test]
fn challenge_is_found_inside_a_larger_buffer() {
    let mut wrapped = vec![0xfe, 0x53, 0x4d, 0x42, 0x00, 0x00];
    wrapped.extend_from_slice(&ntlm_challenge(&[(0x0001, "MACHINE")]));
    assert_eq!(extract_challenge_target(&wrapped).as_deref(), Some("MACHINE"));
}

#[test]
fn non_challenge_messages_are_rejected() {
    // NEGOTIATE (type 1) instead of CHALLENGE.
    let mut negotiate = ntlm_challenge(&[(0x0001, "MACHINE")]);
    negotiate[8] = 0x01;
    assert_eq!(extract_challenge_target(&negotiate), None);

    assert_eq!(extract_challenge_target(&[]), None);
    assert_eq!(extract_challenge_target(b"NTLMSSP\x00"), None);
    assert_eq!(extract_challenge_target(&[0u8; 64]), None);
}
