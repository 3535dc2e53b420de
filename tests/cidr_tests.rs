use lanventory::errors::DiscoveryError;
use lanventory::net::expand_hosts;
use std::net::Ipv4Addr;

#[test]
fn slash_30_strips_network_and_broadcast() {
    let hosts = expand_hosts("192.168.1.0/30").unwrap();
    assert_eq!(
        hosts,
        vec![Ipv4Addr::new(192, 168, 1, 1), Ipv4Addr::new(192, 168, 1, 2)]
    );
}

#[test]
fn slash_31_keeps_both_addresses() {
    let hosts = expand_hosts("10.0.0.4/31").unwrap();
    assert_eq!(
        hosts,
        vec![Ipv4Addr::new(10, 0, 0, 4), Ipv4Addr::new(10, 0, 0, 5)]
    );
}

#[test]
fn slash_32_is_a_single_host() {
    let hosts = expand_hosts("10.0.0.5/32").unwrap();
    assert_eq!(hosts, vec![Ipv4Addr::new(10, 0, 0, 5)]);
}

#[test]
fn slash_24_has_254_hosts_in_order() {
    let hosts = expand_hosts("172.16.5.0/24").unwrap();
    assert_eq!(hosts.len(), 254);
    assert_eq!(hosts.first(), Some(&Ipv4Addr::new(172, 16, 5, 1)));
    assert_eq!(hosts.last(), Some(&Ipv4Addr::new(172, 16, 5, 254)));
}

#[test]
fn host_bits_are_truncated_to_the_network() {
    let hosts = expand_hosts("10.1.2.3/30").unwrap();
    assert_eq!(
        hosts,
        vec![Ipv4Addr::new(10, 1, 2, 1), Ipv4Addr::new(10, 1, 2, 2)]
    );
}

#[test]
fn rejects_malformed_input() {
    for bad in ["", "banana", "10.0.0.0", "10.0.0.0/33", "10.0.0/24", "2001:db8::/64"] {
        let err = expand_hosts(bad).unwrap_err();
        assert!(
            matches!(err, DiscoveryError::InvalidCidr(_)),
            "{bad:?} should be rejected as an invalid CIDR"
        );
    }
}
