//! CIDR range expansion for the scan queue.

use crate::errors::DiscoveryError;
use ipnet::Ipv4Net;
use std::net::Ipv4Addr;

/// Expand a CIDR block into its scannable host addresses, in network order.
///
/// Blocks of four or more addresses lose their network and broadcast
/// addresses; `/31` and `/32` keep everything. Host bits in the input are
/// tolerated and truncated to the network.
pub fn expand_hosts(cidr: &str) -> Result<Vec<Ipv4Addr>, DiscoveryError> {
    let net: Ipv4Net = cidr
        .trim()
        .parse()
        .map_err(|_| DiscoveryError::InvalidCidr(cidr.to_string()))?;
    Ok(net.trunc().hosts().collect())
}
