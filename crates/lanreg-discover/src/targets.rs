//! Probe target generation: CIDR expansion and zone deduplication.

use std::collections::{BTreeMap, HashSet};
use std::net::Ipv4Addr;

use ipnet::Ipv4Net;

use lanreg_core::Target;

use crate::error::{DiscoverError, Result};

/// Every usable host address in `subnet`, without the network and
/// broadcast addresses.
pub fn expand_cidr(subnet: &str) -> Result<Vec<Target>> {
    let net: Ipv4Net = subnet
        .trim()
        .parse()
        .map_err(|e: ipnet::AddrParseError| DiscoverError::InvalidSubnet {
            subnet: subnet.to_string(),
            reason: e.to_string(),
        })?;

    Ok(net.trunc().hosts().map(Target::from_address).collect())
}

/// Collapse a hostname → address map so that each address is probed once.
///
/// Hostnames are visited in lexical order and the first one seen for an
/// address wins, so the survivor is stable across runs.
pub fn dedup_by_address(zone: &BTreeMap<String, Ipv4Addr>) -> Vec<Target> {
    let mut seen = HashSet::new();
    zone.iter()
        .filter(|(_, address)| seen.insert(**address))
        .map(|(hostname, address)| Target::new(hostname.clone(), *address))
        .collect()
}
